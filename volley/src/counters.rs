//! Status family counters shared by every worker of a run.
use std::sync::atomic::{AtomicU64, Ordering};
use volley_core::{CounterSink, CountersSnapshot, StatusFamily};

/// Lock-free `code_2xx`..`code_5xx` counters.
///
/// With the `metrics` feature each increment is also forwarded to the global `metrics` recorder
/// under the family's label.
#[derive(Debug, Default)]
pub struct StatusCounters {
    counts: [AtomicU64; 4],
}

impl StatusCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, family: StatusFamily) -> u64 {
        self.counts[family.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot::from(
            StatusFamily::ALL.map(|family| self.counts[family.index()].load(Ordering::Relaxed)),
        )
    }
}

impl CounterSink for StatusCounters {
    fn increment(&self, family: StatusFamily) {
        self.counts[family.index()].fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::counter!(family.label()).increment(1);
    }
}
