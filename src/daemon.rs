//! Poll scheduler for the drainage monitoring service
//!
//! Drives the pipeline on a fixed interval:
//! 1. A timer thread fires a tick immediately, then every `poll_interval`
//! 2. Each tick runs on a worker thread so the timer never waits on the device
//! 3. Ticks that would overlap a pending one are skipped (or allowed to
//!    overlap up to the worker count, with the last result to resolve
//!    winning; ticks beyond that are skipped rather than queued)
//! 4. `SchedulerHandle::stop` ends the timer and deactivates the pipeline;
//!    fetches still in flight finish on their own and are discarded

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use threadpool::ThreadPool;
use tracing::{debug, error, info};

use crate::logging::log_tick_failure;
use crate::monitor::{Pipeline, TickOutcome};

/// Worker threads available when ticks may overlap.
const CONCURRENT_WORKERS: usize = 4;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Skip a tick while the previous one is still pending.
    Skip,
    /// Start a tick whenever a worker is free; overlapping fetches race and
    /// the last to resolve wins. Ticks never queue behind busy workers.
    Concurrent,
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// How often to poll the device (default: 5 seconds)
    pub poll_interval: Duration,

    /// What to do when a tick fires before the previous one resolved
    pub overlap: OverlapPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(crate::config::DEFAULT_POLL_INTERVAL_SECS),
            overlap: OverlapPolicy::Skip,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct PollScheduler {
    config: SchedulerConfig,
    pipeline: Arc<Pipeline>,
}

/// Counters shared between the timer, the workers and the handle.
#[derive(Default)]
struct TickCounters {
    fired: AtomicU64,
    skipped: AtomicU64,
    in_flight: AtomicBool,
}

impl PollScheduler {
    pub fn new(pipeline: Arc<Pipeline>, config: SchedulerConfig) -> Self {
        Self { config, pipeline }
    }

    /// Starts the timer thread and returns the handle that stops it.
    ///
    /// # Errors
    /// Fails only if the timer thread cannot be spawned.
    pub fn start(self) -> std::io::Result<SchedulerHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let counters = Arc::new(TickCounters::default());

        let workers = match self.config.overlap {
            OverlapPolicy::Skip => 1,
            OverlapPolicy::Concurrent => CONCURRENT_WORKERS,
        };
        let pool = ThreadPool::with_name("drainmon-poll".to_string(), workers);

        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            overlap = ?self.config.overlap,
            "starting poll scheduler"
        );

        let pipeline = Arc::clone(&self.pipeline);
        let timer_counters = Arc::clone(&counters);
        let config = self.config;

        let timer = thread::Builder::new()
            .name("drainmon-timer".to_string())
            .spawn(move || {
                let mut next = Instant::now();
                loop {
                    fire_tick(&pool, &pipeline, &timer_counters, config.overlap);

                    next += config.poll_interval;
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("timer stopped");
            })?;

        Ok(SchedulerHandle {
            stop_tx: Some(stop_tx),
            timer: Some(timer),
            pipeline: self.pipeline,
            counters,
        })
    }
}

/// Hands one tick to the pool, unless it would overlap under `Skip` or
/// would have to wait for a free worker under `Concurrent`.
fn fire_tick(pool: &ThreadPool, pipeline: &Arc<Pipeline>, counters: &Arc<TickCounters>, overlap: OverlapPolicy) {
    let busy = match overlap {
        OverlapPolicy::Skip => counters.in_flight.swap(true, Ordering::SeqCst),
        OverlapPolicy::Concurrent => pool.active_count() + pool.queued_count() >= pool.max_count(),
    };
    if busy {
        counters.skipped.fetch_add(1, Ordering::SeqCst);
        debug!(overlap = ?overlap, "no worker free for this tick, skipping");
        return;
    }

    counters.fired.fetch_add(1, Ordering::SeqCst);

    let pipeline = Arc::clone(pipeline);
    let guard = InFlightGuard(Arc::clone(counters));
    pool.execute(move || {
        let _guard = guard;
        let tick = pipeline.begin_tick();
        match pipeline.run_numbered(tick) {
            Ok(TickOutcome::Applied { snapshot, alerts }) => {
                debug!(tick = snapshot.tick, alerts = alerts.len(), "tick applied");
            }
            Ok(TickOutcome::Discarded) => {}
            Err(e) => log_tick_failure(tick, &e),
        }
    });
}

/// Clears the in-flight flag when the tick's job ends, including by panic.
struct InFlightGuard(Arc<TickCounters>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("tick panicked");
        }
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cancellation handle for a running scheduler. Dropping it stops the
/// scheduler as well.
pub struct SchedulerHandle {
    stop_tx: Option<Sender<()>>,
    timer: Option<JoinHandle<()>>,
    pipeline: Arc<Pipeline>,
    counters: Arc<TickCounters>,
}

impl SchedulerHandle {
    /// Ticks handed to a worker so far.
    pub fn ticks_fired(&self) -> u64 {
        self.counters.fired.load(Ordering::SeqCst)
    }

    /// Ticks dropped because no worker was free for them.
    pub fn ticks_skipped(&self) -> u64 {
        self.counters.skipped.load(Ordering::SeqCst)
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Blocks the calling thread until the scheduler is stopped from
    /// elsewhere (the daemon runs until killed).
    pub fn wait(mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.join();
        }
    }

    /// Stops the timer and deactivates the pipeline. In-flight fetches are
    /// left to finish; their results are discarded.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(timer) = self.timer.take() {
            let _ = timer.join();
        }
        self.pipeline.deactivate();
        info!(
            fired = self.ticks_fired(),
            skipped = self.ticks_skipped(),
            "poll scheduler stopped"
        );
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if self.stop_tx.is_some() {
            self.shutdown();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
