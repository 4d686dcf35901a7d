use crate::config::Mode;
use crate::constants::*;
use crate::data::CountersSnapshot;
use pdatastructs::tdigest::{TDigest, K1};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::error;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Pass/fail conditions evaluated once at the end of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub max_failure_rate: f64,
    pub max_p95: Duration,
    pub max_p99: Option<Duration>,
}

impl Thresholds {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::ConstantArrival => Self {
                max_failure_rate: MAX_FAILURE_RATE,
                max_p95: MAX_P95_LATENCY,
                max_p99: Some(MAX_P99_LATENCY),
            },
            Mode::FixedPace => Self {
                max_failure_rate: MAX_FAILURE_RATE,
                max_p95: MAX_P95_LATENCY,
                max_p99: None,
            },
        }
    }

    /// An empty run has a failure rate of zero and zero latencies, so it passes.
    pub fn evaluate(&self, counters: &CountersSnapshot, latency: &LatencyDigest) -> ThresholdResult {
        let total = counters.total();
        let failure_rate = if total == 0 {
            0.
        } else {
            counters.failures() as f64 / total as f64
        };
        let p95 = latency.quantile(0.95);
        let p99 = latency.quantile(0.99);

        let mut violations = vec![];
        if failure_rate >= self.max_failure_rate {
            violations.push(Violation::FailureRate {
                limit: self.max_failure_rate,
                actual: failure_rate,
            });
        }
        if p95 >= self.max_p95 {
            violations.push(Violation::Latency {
                quantile: 0.95,
                limit: self.max_p95,
                actual: p95,
            });
        }
        if let Some(max_p99) = self.max_p99 {
            if p99 >= max_p99 {
                violations.push(Violation::Latency {
                    quantile: 0.99,
                    limit: max_p99,
                    actual: p99,
                });
            }
        }

        ThresholdResult {
            failure_rate,
            p95,
            p99,
            passed: violations.is_empty(),
            violations,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub failure_rate: f64,
    #[serde(rename = "p95_ms", serialize_with = "crate::report::as_millis")]
    pub p95: Duration,
    #[serde(rename = "p99_ms", serialize_with = "crate::report::as_millis")]
    pub p99: Duration,
    pub passed: bool,
    #[serde(serialize_with = "crate::report::as_strings")]
    pub violations: Vec<Violation>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Violation {
    FailureRate {
        limit: f64,
        actual: f64,
    },
    Latency {
        quantile: f64,
        limit: Duration,
        actual: Duration,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::FailureRate { limit, actual } => {
                write!(f, "http_req_failed rate {actual:.4} >= {limit}")
            }
            Violation::Latency {
                quantile,
                limit,
                actual,
            } => write!(
                f,
                "http_req_duration p({}) {:.2}ms >= {}ms",
                quantile * 100.,
                actual.as_secs_f64() * 1000.,
                limit.as_millis()
            ),
        }
    }
}

/// Approximate latency distribution of a whole run.
#[derive(Debug, Clone)]
pub struct LatencyDigest {
    digest: TDigest<K1>,
    count: u64,
    sum: Duration,
}

impl Default for LatencyDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyDigest {
    pub fn new() -> Self {
        Self {
            digest: TDigest::new(K1::new(100.), TDIGEST_BACKLOG_SIZE),
            count: 0,
            sum: Duration::ZERO,
        }
    }

    pub fn insert(&mut self, latency: Duration) {
        self.digest.insert(latency.as_secs_f64());
        self.count += 1;
        self.sum += latency;
    }

    pub fn extend(&mut self, latencies: &[Duration]) {
        for latency in latencies {
            self.insert(*latency);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.sum.div_f64(self.count as f64)
        }
    }

    pub fn quantile(&self, quantile: f64) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }

        let secs = self.digest.quantile(quantile);
        // TDigest occasionally yields NaN on tiny inputs.
        let secs = if secs.is_finite() && secs >= 0. {
            secs
        } else {
            error!("Non-finite latency quantile {quantile}; reporting zero.");
            0.
        };

        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(ok: u64, server_error: u64) -> CountersSnapshot {
        CountersSnapshot {
            success: ok,
            server_error,
            ..Default::default()
        }
    }

    fn uniform_latencies(count: u64, max: Duration) -> LatencyDigest {
        let mut digest = LatencyDigest::new();
        for i in 0..count {
            digest.insert(max.mul_f64(i as f64 / count as f64));
        }
        digest
    }

    #[test]
    fn all_ok_passes() {
        let latency = uniform_latencies(1000, Duration::from_millis(100));
        let result = Thresholds::for_mode(Mode::ConstantArrival).evaluate(&counters(1000, 0), &latency);
        assert_eq!(result.failure_rate, 0.);
        assert!(result.passed);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn two_percent_failures_fails() {
        let latency = uniform_latencies(1000, Duration::from_millis(100));
        let result = Thresholds::for_mode(Mode::ConstantArrival).evaluate(&counters(980, 20), &latency);
        assert!((result.failure_rate - 0.02).abs() < f64::EPSILON);
        assert!(!result.passed);
        assert!(matches!(
            result.violations.as_slice(),
            [Violation::FailureRate { .. }]
        ));
    }

    #[test]
    fn failure_rate_limit_is_exclusive() {
        let latency = uniform_latencies(100, Duration::from_millis(10));
        let result = Thresholds::for_mode(Mode::FixedPace).evaluate(&counters(99, 1), &latency);
        assert!(!result.passed);

        let result = Thresholds::for_mode(Mode::FixedPace).evaluate(&counters(1000, 9), &latency);
        assert!(result.passed);
    }

    #[test]
    fn redirects_and_client_errors() {
        let latency = uniform_latencies(100, Duration::from_millis(10));
        let snapshot = CountersSnapshot {
            success: 50,
            redirection: 50,
            client_error: 0,
            server_error: 0,
        };
        let result = Thresholds::for_mode(Mode::FixedPace).evaluate(&snapshot, &latency);
        assert!(result.passed);

        let snapshot = CountersSnapshot {
            client_error: 5,
            ..snapshot
        };
        let result = Thresholds::for_mode(Mode::FixedPace).evaluate(&snapshot, &latency);
        assert!(!result.passed);
    }

    #[test]
    fn slow_p95_fails() {
        let latency = uniform_latencies(1000, Duration::from_secs(4));
        let result = Thresholds::for_mode(Mode::FixedPace).evaluate(&counters(1000, 0), &latency);
        assert!(result.p95 > Duration::from_millis(3500));
        assert!(!result.passed);
        assert!(matches!(
            result.violations.as_slice(),
            [Violation::Latency { quantile, .. }] if *quantile == 0.95
        ));
    }

    #[test]
    fn p99_only_applies_to_constant_arrival() {
        // 97% fast requests, 3% very slow.
        let mut latency = LatencyDigest::new();
        for _ in 0..970 {
            latency.insert(Duration::from_millis(50));
        }
        for _ in 0..30 {
            latency.insert(Duration::from_secs(8));
        }

        let pace = Thresholds::for_mode(Mode::FixedPace).evaluate(&counters(1000, 0), &latency);
        assert!(pace.p99 > Duration::from_secs(5));
        assert!(pace.passed);

        let rate = Thresholds::for_mode(Mode::ConstantArrival).evaluate(&counters(1000, 0), &latency);
        assert!(!rate.passed);
    }

    #[test]
    fn empty_run_passes() {
        let result = Thresholds::for_mode(Mode::ConstantArrival)
            .evaluate(&CountersSnapshot::default(), &LatencyDigest::new());
        assert_eq!(result.failure_rate, 0.);
        assert_eq!(result.p95, Duration::ZERO);
        assert!(result.passed);
    }

    #[test]
    fn digest_mean() {
        let mut digest = LatencyDigest::new();
        digest.extend(&[Duration::from_millis(10), Duration::from_millis(30)]);
        assert_eq!(digest.count(), 2);
        assert_eq!(digest.mean(), Duration::from_millis(20));
    }

    #[test]
    fn violation_display() {
        let violation = Violation::Latency {
            quantile: 0.95,
            limit: Duration::from_millis(2000),
            actual: Duration::from_millis(2500),
        };
        assert_eq!(
            violation.to_string(),
            "http_req_duration p(95) 2500.00ms >= 2000ms"
        );
    }
}
