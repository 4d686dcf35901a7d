use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use volley_core::{CounterSink, ResponseOutcome, StatusFamily};

/// Buckets outcomes into status families and tallies the soft "2xx/3xx" check.
///
/// A failed check is only recorded; it never stops the run.
pub struct Classifier {
    sinks: Vec<Arc<dyn CounterSink>>,
    checks_passed: AtomicU64,
    checks_failed: AtomicU64,
}

impl Classifier {
    pub fn new(sink: Arc<dyn CounterSink>) -> Self {
        Self {
            sinks: vec![sink],
            checks_passed: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
        }
    }

    /// Additional destination for family counts, e.g. an external reporter.
    pub fn with_sink(mut self, sink: Arc<dyn CounterSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn classify(&self, outcome: &ResponseOutcome) -> StatusFamily {
        if outcome.is_success() {
            self.checks_passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.checks_failed.fetch_add(1, Ordering::Relaxed);
            debug!("Check '2xx/3xx' failed with status {}", outcome.status);
        }

        let family = outcome.family();
        for sink in &self.sinks {
            sink.increment(family);
        }
        family
    }

    /// `(passed, failed)` check counts so far.
    pub fn checks(&self) -> (u64, u64) {
        (
            self.checks_passed.load(Ordering::Relaxed),
            self.checks_failed.load(Ordering::Relaxed),
        )
    }
}
