use std::time::Duration;

pub const DEFAULT_RATE_TARGET: &str = "http://app.localhost";
pub const DEFAULT_PACE_TARGET: &str = "http://localhost";
pub const DEFAULT_TOTAL_REQUESTS: u32 = 100;
pub const DEFAULT_DURATION_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const MIN_PREALLOCATED_WORKERS: usize = 10;
pub const MAX_PREALLOCATED_WORKERS: usize = 400;
pub const PREALLOCATED_WORKERS_PER_TPS: usize = 3;
pub const MAX_WORKERS: usize = 2000;

/// Ceiling on the constant-arrival rate; above this the limiter interval rounds to zero.
pub const MAX_RATE_PER_SECOND: u32 = 100_000;

/// How long in-flight requests may keep running once the schedule is exhausted.
pub const GRACEFUL_STOP: Duration = Duration::from_secs(30);

pub const MAX_FAILURE_RATE: f64 = 0.01;
pub const MAX_P95_LATENCY: Duration = Duration::from_millis(2000);
pub const MAX_P99_LATENCY: Duration = Duration::from_millis(5000);

/// Query parameter appended to every request when cache busting.
pub const CACHE_BUST_PARAM: &str = "rnd";

/// Status recorded for requests that never produced an HTTP response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

pub const ENV_TARGET: &str = "TARGET";
pub const ENV_TOTAL: &str = "TOTAL";
pub const ENV_DURATION_S: &str = "DURATION_S";
pub const ENV_MODE: &str = "MODE";
pub const ENV_TIMEOUT_S: &str = "TIMEOUT_S";
pub const ENV_MAX_CONSECUTIVE_FAILURES: &str = "MAX_CONSECUTIVE_FAILURES";
pub const ENV_SUMMARY_PATH: &str = "SUMMARY_PATH";
pub const ENV_LABEL: &str = "LABEL";
