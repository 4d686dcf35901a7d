use crate::config::{Mode, RunConfig};
use crate::constants::*;
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// How requests are spread over a run. Derived deterministically from a [`RunConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Schedule {
    ConstantArrival {
        rate_per_second: NonZeroU32,
        preallocated_workers: usize,
        max_workers: usize,
    },
    FixedPace {
        period: Duration,
        iterations: NonZeroU32,
    },
}

impl Schedule {
    pub fn for_config(config: &RunConfig) -> Self {
        match config.mode {
            Mode::ConstantArrival => Self::constant_arrival(config),
            Mode::FixedPace => Self::fixed_pace(config),
        }
    }

    /// `rate = max(1, ceil(total / duration))` with a worker pool sized at three workers per
    /// request/second, kept within `[10, 400]`, and growable to a fixed ceiling.
    pub fn constant_arrival(config: &RunConfig) -> Self {
        let rate = constant_rate(config.total_requests, config.duration_secs());
        let preallocated_workers = (rate.get() as usize)
            .saturating_mul(PREALLOCATED_WORKERS_PER_TPS)
            .clamp(MIN_PREALLOCATED_WORKERS, MAX_PREALLOCATED_WORKERS);

        Schedule::ConstantArrival {
            rate_per_second: rate,
            preallocated_workers,
            max_workers: MAX_WORKERS,
        }
    }

    /// Evenly spaces `total` sequential requests over the run duration.
    pub fn fixed_pace(config: &RunConfig) -> Self {
        let period_nanos =
            config.duration_secs() as u128 * 1_000_000_000 / config.total_requests.get() as u128;

        Schedule::FixedPace {
            period: Duration::from_nanos(u64::try_from(period_nanos).unwrap_or(u64::MAX)),
            iterations: config.total_requests,
        }
    }

    pub fn expected_requests(&self, duration: Duration) -> u64 {
        match self {
            Schedule::ConstantArrival {
                rate_per_second, ..
            } => rate_per_second.get() as u64 * duration.as_secs().max(1),
            Schedule::FixedPace { iterations, .. } => iterations.get() as u64,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::ConstantArrival {
                rate_per_second,
                preallocated_workers,
                max_workers,
            } => write!(
                f,
                "constant-arrival(rate={rate_per_second}/s, workers={preallocated_workers}..{max_workers})"
            ),
            Schedule::FixedPace { period, iterations } => write!(
                f,
                "fixed-pace(iterations={iterations}, period={})",
                humantime::format_duration(*period)
            ),
        }
    }
}

fn constant_rate(total: NonZeroU32, duration_secs: u64) -> NonZeroU32 {
    let rate = (total.get() as u64)
        .div_ceil(duration_secs.max(1))
        .clamp(1, MAX_RATE_PER_SECOND as u64);
    NonZeroU32::new(rate as u32).unwrap_or(NonZeroU32::MIN)
}
