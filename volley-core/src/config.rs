use crate::constants::*;
use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, warn};

/// Scheduling policy for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Start requests at a fixed rate regardless of how long earlier ones take.
    #[default]
    ConstantArrival,
    /// Spread the requests evenly over the run, one at a time.
    FixedPace,
}

impl Mode {
    pub fn default_target(&self) -> &'static str {
        match self {
            Mode::ConstantArrival => DEFAULT_RATE_TARGET,
            Mode::FixedPace => DEFAULT_PACE_TARGET,
        }
    }

    /// Constant-arrival runs defeat intermediate caches; fixed-pace runs hit the plain URL.
    pub fn cache_bust(&self) -> bool {
        matches!(self, Mode::ConstantArrival)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::ConstantArrival => "rate",
            Mode::FixedPace => "pace",
        }
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rate" | "constant-arrival" | "constant-arrival-rate" => Ok(Mode::ConstantArrival),
            "pace" | "fixed-pace" => Ok(Mode::FixedPace),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do when the target keeps failing at the transport level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportFailurePolicy {
    /// Count every failure and run to completion.
    #[default]
    Continue,
    /// Halt dispatch after this many transport failures in a row.
    AbortAfter(NonZeroU64),
}

/// Parameters for a single run, resolved once at startup.
///
/// Resolution never fails: missing, empty, or unparsable values fall back to the documented
/// defaults in [`crate::constants`].
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub target: String,
    pub total_requests: NonZeroU32,
    pub duration: Duration,
    pub mode: Mode,
    pub request_timeout: Duration,
    pub transport_failure_policy: TransportFailurePolicy,
    pub summary_path: Option<PathBuf>,
    pub label: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

impl RunConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            target: mode.default_target().to_string(),
            total_requests: default_total(),
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            mode,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            transport_failure_policy: TransportFailurePolicy::Continue,
            summary_path: None,
            label: mode.name().to_string(),
        }
    }

    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup. A lookup that returns `None` for everything yields
    /// the defaults.
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get(ENV_MODE) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Unrecognized {ENV_MODE}={raw:?}; using {}", Mode::default());
                Mode::default()
            }),
            None => Mode::default(),
        };

        let mut config = Self::new(mode);

        if let Some(target) = get(ENV_TARGET) {
            config.target = target;
        }
        config.target = normalize_target(&config.target);

        if let Some(total) = parse_positive::<u32>(get(ENV_TOTAL), ENV_TOTAL) {
            config.total_requests = NonZeroU32::new(total).unwrap_or_else(default_total);
        }

        // Fixed-pace runs always spread TOTAL over the default window.
        match (mode, get(ENV_DURATION_S)) {
            (Mode::FixedPace, Some(raw)) => {
                debug!("Ignoring {ENV_DURATION_S}={raw:?} in {mode} mode");
            }
            (_, raw) => {
                if let Some(secs) = parse_positive::<u64>(raw, ENV_DURATION_S) {
                    config.duration = Duration::from_secs(secs);
                }
            }
        }

        if let Some(secs) = parse_positive::<u64>(get(ENV_TIMEOUT_S), ENV_TIMEOUT_S) {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(max) = parse_positive::<u64>(
            get(ENV_MAX_CONSECUTIVE_FAILURES),
            ENV_MAX_CONSECUTIVE_FAILURES,
        )
        .and_then(NonZeroU64::new)
        {
            config.transport_failure_policy = TransportFailurePolicy::AbortAfter(max);
        }

        config.summary_path = get(ENV_SUMMARY_PATH).map(PathBuf::from);

        if let Some(label) = get(ENV_LABEL) {
            config.label = label;
        }

        debug!("Resolved {config}");
        config
    }

    /// Whole seconds of the run, never below one.
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs().max(1)
    }

    /// The URL every request is sent to: the target with exactly one trailing slash.
    pub fn request_url(&self) -> String {
        format!("{}/", self.target)
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = normalize_target(target);
        self
    }

    pub fn total_requests(mut self, total: NonZeroU32) -> Self {
        self.total_requests = total;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn transport_failure_policy(mut self, policy: TransportFailurePolicy) -> Self {
        self.transport_failure_policy = policy;
        self
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RunConfig(mode={}, target={}, total={}, duration={}, timeout={})",
            self.mode,
            self.target,
            self.total_requests,
            humantime::format_duration(self.duration),
            humantime::format_duration(self.request_timeout),
        )
    }
}

fn default_total() -> NonZeroU32 {
    NonZeroU32::new(DEFAULT_TOTAL_REQUESTS).unwrap_or(NonZeroU32::MIN)
}

fn normalize_target(target: &str) -> String {
    target.trim().trim_end_matches('/').to_string()
}

/// Parses a strictly positive integer, logging and discarding anything else.
fn parse_positive<T>(raw: Option<String>, key: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(v) if v > T::default() => Some(v),
        _ => {
            warn!("Ignoring invalid {key}={raw:?}; using default");
            None
        }
    }
}
