use crate::constants::TRANSPORT_FAILURE_STATUS;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Result of a single request. Status `0` means no HTTP response was received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseOutcome {
    pub status: u16,
    pub latency: Duration,
}

impl ResponseOutcome {
    pub fn new(status: u16, latency: Duration) -> Self {
        Self { status, latency }
    }

    pub fn transport_failure(latency: Duration) -> Self {
        Self {
            status: TRANSPORT_FAILURE_STATUS,
            latency,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == TRANSPORT_FAILURE_STATUS
    }

    /// The "2xx/3xx" check: anything outside `[200, 400)` counts as a failed request.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn family(&self) -> StatusFamily {
        StatusFamily::classify(self.status)
    }
}

/// Hundreds-digit classification of a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFamily {
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusFamily {
    pub const ALL: [StatusFamily; 4] = [
        StatusFamily::Success,
        StatusFamily::Redirection,
        StatusFamily::ClientError,
        StatusFamily::ServerError,
    ];

    /// Informational codes and the transport failure sentinel land in the server error bucket so
    /// that every outcome is counted exactly once.
    pub fn classify(status: u16) -> Self {
        match status {
            200..=299 => StatusFamily::Success,
            300..=399 => StatusFamily::Redirection,
            400..=499 => StatusFamily::ClientError,
            _ => StatusFamily::ServerError,
        }
    }

    /// Metric name for the family's counter.
    pub fn label(&self) -> &'static str {
        match self {
            StatusFamily::Success => "code_2xx",
            StatusFamily::Redirection => "code_3xx",
            StatusFamily::ClientError => "code_4xx",
            StatusFamily::ServerError => "code_5xx",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            StatusFamily::Success => 0,
            StatusFamily::Redirection => 1,
            StatusFamily::ClientError => 2,
            StatusFamily::ServerError => 3,
        }
    }
}

impl fmt::Display for StatusFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Destination for per-family counts. Implementations must tolerate concurrent callers.
pub trait CounterSink: Send + Sync {
    fn increment(&self, family: StatusFamily);
}

/// Point-in-time copy of the four family counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    #[serde(rename = "code_2xx")]
    pub success: u64,
    #[serde(rename = "code_3xx")]
    pub redirection: u64,
    #[serde(rename = "code_4xx")]
    pub client_error: u64,
    #[serde(rename = "code_5xx")]
    pub server_error: u64,
}

impl CountersSnapshot {
    pub fn get(&self, family: StatusFamily) -> u64 {
        match family {
            StatusFamily::Success => self.success,
            StatusFamily::Redirection => self.redirection,
            StatusFamily::ClientError => self.client_error,
            StatusFamily::ServerError => self.server_error,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.redirection + self.client_error + self.server_error
    }

    /// Outcomes outside `[200, 400)`.
    pub fn failures(&self) -> u64 {
        self.client_error + self.server_error
    }
}

impl From<[u64; 4]> for CountersSnapshot {
    fn from(counts: [u64; 4]) -> Self {
        Self {
            success: counts[0],
            redirection: counts[1],
            client_error: counts[2],
            server_error: counts[3],
        }
    }
}
