//! Fixed-pace runner: a single worker issuing requests one after another, each started on a
//! regular tick.
use crate::context::RunContext;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub(crate) struct Pacer {
    interval: Interval,
    period: Duration,
}

impl Pacer {
    pub async fn new(period: Duration) -> Self {
        // A zero period would make the interval panic.
        let period = period.max(Duration::from_nanos(1));
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // NOTE: First tick completes instantly
        interval.tick().await;
        Self { interval, period }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

impl std::fmt::Display for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", humantime::format_duration(self.period))
    }
}

/// Runs `iterations` sequential requests spaced `period` apart. Returns how many completed.
///
/// Stops early when the run is halted or `max_duration` elapses; a request still in flight at that
/// point is abandoned.
pub(crate) async fn run_paced<T, F>(
    scenario: T,
    period: Duration,
    iterations: NonZeroU32,
    max_duration: Duration,
    ctx: &RunContext,
) -> u64
where
    T: Fn() -> F,
    F: Future<Output = ()>,
{
    let deadline = Instant::now() + max_duration;
    let mut pacer = Pacer::new(period).await;
    debug!("Pacing {iterations} iterations every {pacer}");

    let mut completed = 0;
    for i in 0..iterations.get() {
        if ctx.is_halted() {
            warn!("Run halted after {completed} iterations.");
            break;
        }

        if tokio::time::timeout_at(deadline, scenario()).await.is_err() {
            warn!(
                "Maximum duration of {} elapsed after {completed} iterations.",
                humantime::format_duration(max_duration)
            );
            break;
        }
        completed += 1;

        if i + 1 < iterations.get() && tokio::time::timeout_at(deadline, pacer.tick()).await.is_err()
        {
            warn!(
                "Maximum duration of {} elapsed after {completed} iterations.",
                humantime::format_duration(max_duration)
            );
            break;
        }
    }

    completed
}
