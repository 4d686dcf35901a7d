use crate::config::Mode;
use crate::data::CountersSnapshot;
use crate::threshold::ThresholdResult;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const CSV_HEADER: &str =
    "label,total,http_reqs,p95_ms,p99_ms,avg_ms,rps,error_rate_percent,2xx,3xx,4xx,5xx";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unable to serialize run summary: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unable to write run summary to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate view of a finished run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub label: String,
    #[serde(serialize_with = "as_display")]
    pub mode: Mode,
    pub total_requests: u32,
    pub http_reqs: u64,
    pub counters: CountersSnapshot,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub dropped_iterations: u64,
    pub halted: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    #[serde(rename = "avg_ms", serialize_with = "as_millis")]
    pub latency_avg: Duration,
    #[serde(rename = "p50_ms", serialize_with = "as_millis")]
    pub latency_p50: Duration,
    #[serde(rename = "p90_ms", serialize_with = "as_millis")]
    pub latency_p90: Duration,
    pub thresholds: ThresholdResult,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.thresholds.passed
    }

    /// Achieved requests per second over the whole run.
    pub fn rps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0. {
            self.http_reqs as f64 / secs
        } else {
            0.
        }
    }

    pub fn csv_header() -> &'static str {
        CSV_HEADER
    }

    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{:.2},{:.2},{:.2},{:.2},{:.3},{},{},{},{}",
            self.label,
            self.total_requests,
            self.http_reqs,
            millis(self.thresholds.p95),
            millis(self.thresholds.p99),
            millis(self.latency_avg),
            self.rps(),
            self.thresholds.failure_rate * 100.,
            self.counters.success,
            self.counters.redirection,
            self.counters.client_error,
            self.counters.server_error,
        )
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] reqs={} rps={:.2} failed={:.2}% p50={:?} p90={:?} p95={:?} p99={:?} \
             2xx={} 3xx={} 4xx={} 5xx={} dropped={} -> {}",
            self.label,
            self.mode,
            self.http_reqs,
            self.rps(),
            self.thresholds.failure_rate * 100.,
            self.latency_p50,
            self.latency_p90,
            self.thresholds.p95,
            self.thresholds.p99,
            self.counters.success,
            self.counters.redirection,
            self.counters.client_error,
            self.counters.server_error,
            self.dropped_iterations,
            if self.passed() { "PASS" } else { "FAIL" },
        )
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.
}

pub(crate) fn as_millis<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(millis(*duration))
}

pub(crate) fn as_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

#[allow(clippy::ptr_arg)]
pub(crate) fn as_strings<T: fmt::Display, S: Serializer>(
    values: &Vec<T>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_seq(values.iter().map(ToString::to_string))
}
