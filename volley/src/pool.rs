//! Constant-arrival worker pool.
//!
//! A dispatcher releases ticks at a fixed rate and hands each one to an idle worker. When no
//! worker is idle the pool grows, up to `max_workers`; past that the tick is dropped.
use crate::context::RunContext;
use async_channel::{bounded, Receiver, Sender};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::MAX_RATE_PER_SECOND;

pub(crate) struct WorkerPool<T> {
    scenario: T,
    workers: Vec<JoinHandle<()>>,
    tx: Sender<()>,
    rx: Receiver<()>,
    idle: Arc<AtomicUsize>,
    max_workers: usize,
    ctx: RunContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PoolStats {
    pub dispatched: u64,
    pub dropped: u64,
    pub peak_workers: usize,
}

impl<T, F> WorkerPool<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    pub fn new(scenario: T, preallocated: usize, max_workers: usize, ctx: RunContext) -> Self {
        let max_workers = max_workers.max(1);
        let (tx, rx) = bounded(max_workers);
        let mut pool = Self {
            scenario,
            workers: vec![],
            tx,
            rx,
            idle: Arc::new(AtomicUsize::new(0)),
            max_workers,
            ctx,
        };

        for _ in 0..preallocated.min(max_workers) {
            pool.spawn_worker();
            pool.idle.fetch_add(1, Ordering::Relaxed);
        }
        pool
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Releases `rate` ticks per second until `duration` elapses or the run is halted.
    pub async fn dispatch(&mut self, rate: NonZeroU32, duration: Duration) -> PoolStats {
        let limiter = rate_limiter(rate);
        let deadline = Instant::now() + duration;
        let mut stats = PoolStats {
            dispatched: 0,
            dropped: 0,
            peak_workers: self.workers(),
        };

        loop {
            if Instant::now() >= deadline {
                break;
            }

            if tokio::time::timeout_at(deadline, limiter.until_ready())
                .await
                .is_err()
            {
                break;
            }

            if self.ctx.is_halted() {
                warn!("Run halted; stopping dispatch.");
                break;
            }

            if !self.claim_worker() {
                stats.dropped += 1;
                self.ctx.record_dropped();
                trace!("All {} workers busy; dropping tick.", self.max_workers);
                tokio::task::yield_now().await;
                continue;
            }

            if self.tx.try_send(()).is_err() {
                // Only reachable if the channel was closed underneath us.
                error!("Tick channel rejected a tick.");
                stats.dropped += 1;
                self.ctx.record_dropped();
                continue;
            }

            stats.dispatched += 1;
            stats.peak_workers = stats.peak_workers.max(self.workers());
        }

        if stats.dropped > 0 {
            warn!(
                "{} iterations dropped; the pool was saturated at {} workers.",
                stats.dropped, self.max_workers
            );
        }
        debug!("Dispatch finished: {stats:?}");
        stats
    }

    /// Lets in-flight requests finish for up to `grace`, then aborts whatever is left.
    pub async fn shutdown(mut self, grace: Duration) {
        self.tx.close();

        let workers = std::mem::take(&mut self.workers);
        let aborts: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();
        let drain = async {
            for worker in workers {
                if let Err(err) = worker.await {
                    if err.is_panic() {
                        error!("Worker panicked: {err}");
                    }
                }
            }
        };

        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!(
                "Graceful stop of {} elapsed; abandoning in-flight requests.",
                humantime::format_duration(grace)
            );
            for abort in aborts {
                abort.abort();
            }
        }
    }

    /// Reserves an idle worker for the next tick, growing the pool if none is free.
    fn claim_worker(&mut self) -> bool {
        if self
            .idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
        {
            return true;
        }

        if self.workers.len() < self.max_workers {
            self.spawn_worker();
            true
        } else {
            false
        }
    }

    fn spawn_worker(&mut self) {
        let scenario = self.scenario.clone();
        let rx = self.rx.clone();
        let idle = self.idle.clone();

        self.workers.push(tokio::spawn(async move {
            while rx.recv().await.is_ok() {
                scenario().await;
                idle.fetch_add(1, Ordering::AcqRel);
            }
        }));
    }
}

fn rate_limiter(rate: NonZeroU32) -> DefaultDirectRateLimiter {
    let rate = NonZeroU32::new(rate.get().min(MAX_RATE_PER_SECOND)).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN))
}
