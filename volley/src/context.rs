//! Per-run shared state handed to every worker.
use crate::classifier::Classifier;
use crate::counters::StatusCounters;
use metrics_util::AtomicBucket;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{CounterSink, LatencyDigest, ResponseOutcome, TransportFailurePolicy};

/// Everything a request needs to record its outcome. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct RunContext {
    counters: Arc<StatusCounters>,
    classifier: Arc<Classifier>,
    latency: Arc<AtomicBucket<Duration>>,
    consecutive_failures: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    halted: Arc<AtomicBool>,
    policy: TransportFailurePolicy,
}

impl RunContext {
    pub fn new(policy: TransportFailurePolicy) -> Self {
        Self::with_sinks(policy, vec![])
    }

    /// Counts are always kept locally for the report; `sinks` receive a copy of every increment.
    pub fn with_sinks(policy: TransportFailurePolicy, sinks: Vec<Arc<dyn CounterSink>>) -> Self {
        let counters = Arc::new(StatusCounters::new());
        let classifier = sinks
            .into_iter()
            .fold(Classifier::new(counters.clone()), Classifier::with_sink);

        Self {
            counters,
            classifier: Arc::new(classifier),
            latency: Arc::new(AtomicBucket::new()),
            consecutive_failures: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
            halted: Arc::new(AtomicBool::new(false)),
            policy,
        }
    }

    pub fn record(&self, outcome: ResponseOutcome) {
        self.classifier.classify(&outcome);
        self.latency.push(outcome.latency);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!("http_reqs").increment(1);
            metrics::histogram!("http_req_duration").record(outcome.latency.as_secs_f64() * 1000.);
            if !outcome.is_success() {
                metrics::counter!("http_req_failed").increment(1);
            }
        }

        if outcome.is_transport_failure() {
            let streak = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
            if let TransportFailurePolicy::AbortAfter(max) = self.policy {
                if streak >= max.get() && !self.halted.swap(true, Ordering::Relaxed) {
                    error!("{streak} consecutive transport failures; halting the run.");
                }
            }
        } else {
            self.consecutive_failures.store(0, Ordering::Relaxed);
        }
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::counter!("dropped_iterations").increment(1);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Relaxed)
    }

    pub fn counters(&self) -> &StatusCounters {
        &self.counters
    }

    pub fn checks(&self) -> (u64, u64) {
        self.classifier.checks()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drains every latency recorded so far into a digest.
    pub fn collect_latencies(&self) -> LatencyDigest {
        let mut digest = LatencyDigest::new();
        self.latency.clear_with(|block| digest.extend(block));
        digest
    }
}
