//! Run orchestration: resolve the schedule, drive requests, and build the final report.
use crate::context::RunContext;
use crate::error::VolleyError;
use crate::executor::RequestExecutor;
use crate::pace::run_paced;
use crate::pool::WorkerPool;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};
use volley_core::{CounterSink, RunConfig, RunReport, Schedule, Thresholds, GRACEFUL_STOP};

/// A single load-generation run.
///
/// Awaiting a `Scenario` executes it to completion and yields the [`RunReport`]. Individual
/// request failures never abort the run; only setup problems (building the HTTP client, writing
/// the requested summary) surface as errors.
///
/// # Example
/// ```no_run
/// use volley::prelude::*;
/// use std::num::NonZeroU32;
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), VolleyError> {
/// let config = RunConfig::new(Mode::FixedPace)
///     .target("http://localhost:8080")
///     .total_requests(NonZeroU32::new(500).unwrap())
///     .duration(Duration::from_secs(60));
///
/// let report = Scenario::new(config).await?;
/// assert!(report.passed());
/// # Ok(())
/// # }
/// ```
pub struct Scenario {
    config: RunConfig,
    sinks: Vec<Arc<dyn CounterSink>>,
    executor: Option<RequestExecutor>,
}

impl Scenario {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            sinks: vec![],
            executor: None,
        }
    }

    /// Forward every status family increment to `sink` as well.
    pub fn sink(mut self, sink: Arc<dyn CounterSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Use a pre-built executor instead of one derived from the config.
    pub fn executor(mut self, executor: RequestExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::for_config(&self.config)
    }

    pub async fn run(self) -> Result<RunReport, VolleyError> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => RequestExecutor::new(&self.config)?,
        };
        let ctx = RunContext::with_sinks(self.config.transport_failure_policy, self.sinks);

        let report = run_scenario(&self.config, executor, ctx).await;

        if let Some(path) = &self.config.summary_path {
            report.write_json(path)?;
            info!("Summary written to {}", path.display());
        }

        Ok(report)
    }
}

impl IntoFuture for Scenario {
    type Output = Result<RunReport, VolleyError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

#[instrument(name = "scenario", skip_all, fields(label = config.label, mode = %config.mode))]
pub(crate) async fn run_scenario(
    config: &RunConfig,
    executor: RequestExecutor,
    ctx: RunContext,
) -> RunReport {
    let schedule = Schedule::for_config(config);
    info!("Running {config} with {schedule}");

    let transaction = {
        let ctx = ctx.clone();
        move || {
            let executor = executor.clone();
            let ctx = ctx.clone();
            async move {
                let outcome = executor.execute().await;
                trace!("Outcome: {outcome:?}");
                ctx.record(outcome);
            }
        }
    };

    let start = Instant::now();
    match schedule {
        Schedule::ConstantArrival {
            rate_per_second,
            preallocated_workers,
            max_workers,
        } => {
            let mut pool =
                WorkerPool::new(transaction, preallocated_workers, max_workers, ctx.clone());
            let stats = pool.dispatch(rate_per_second, config.duration).await;
            debug!(
                "Dispatched {} requests with up to {} workers",
                stats.dispatched, stats.peak_workers
            );
            pool.shutdown(GRACEFUL_STOP).await;
        }
        Schedule::FixedPace { period, iterations } => {
            let completed = run_paced(
                transaction,
                period,
                iterations,
                config.duration + GRACEFUL_STOP,
                &ctx,
            )
            .await;
            debug!("Completed {completed} of {iterations} paced iterations");
        }
    }
    let elapsed = start.elapsed();

    let counters = ctx.counters().snapshot();
    let latency = ctx.collect_latencies();
    let thresholds = Thresholds::for_mode(config.mode).evaluate(&counters, &latency);
    let (checks_passed, checks_failed) = ctx.checks();

    let report = RunReport {
        label: config.label.clone(),
        mode: config.mode,
        total_requests: config.total_requests.get(),
        http_reqs: counters.total(),
        counters,
        checks_passed,
        checks_failed,
        dropped_iterations: ctx.dropped(),
        halted: ctx.is_halted(),
        elapsed,
        latency_avg: latency.mean(),
        latency_p50: latency.quantile(0.5),
        latency_p90: latency.quantile(0.9),
        thresholds,
    };

    if report.passed() {
        info!("Scenario complete: {report}");
    } else {
        for violation in &report.thresholds.violations {
            warn!("Threshold crossed: {violation}");
        }
        warn!("Scenario complete: {report}");
    }

    report
}
