//! One tick of the poll → parse → evaluate → notify pipeline.
//!
//! ## Flow
//! 1. Fetch the raw body from the device (no lock held while in flight)
//! 2. Parse it into a `TelemetrySample`
//! 3. Evaluate drainage and blockage states
//! 4. Select the alerts due and raise the in-app alert
//! 5. Publish an immutable `StatusSnapshot` to the display sink
//! 6. Push the selected notifications (lock released)
//!
//! Steps 2-5 run under the apply lock. `deactivate` takes the same lock,
//! so once it returns no tick can start a fetch, and no fetch that was
//! still in flight can change what the sink shows or send a notification.
//! Push delivery runs outside the lock so a slow push service never holds
//! up `deactivate`.
//!
//! A failed fetch or a malformed body returns an error before step 3: the
//! dispatcher's memory and the sink keep the previous tick's states.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use crate::alert::dispatch::{AlertDispatcher, deliver_all};
use crate::alert::thresholds::ThresholdEvaluator;
use crate::endpoint::DisplaySink;
use crate::ingest::device::TelemetrySource;
use crate::ingest::parse::parse_telemetry;
use crate::model::{AlertEvent, MonitorError, StatusSnapshot};
use crate::notify::PushSlot;

/// What happened to a tick whose fetch succeeded or failed cleanly.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The sample was evaluated and published.
    Applied {
        snapshot: StatusSnapshot,
        alerts: Vec<AlertEvent>,
    },
    /// The pipeline was deactivated while the fetch was in flight; the
    /// result was dropped.
    Discarded,
}

struct ApplyState {
    dispatcher: AlertDispatcher,
    last_snapshot: Option<StatusSnapshot>,
}

pub struct Pipeline {
    source: Arc<dyn TelemetrySource>,
    evaluator: ThresholdEvaluator,
    sink: Arc<dyn DisplaySink>,
    push: PushSlot,
    active: AtomicBool,
    ticks: AtomicU64,
    apply: Mutex<ApplyState>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        evaluator: ThresholdEvaluator,
        dispatcher: AlertDispatcher,
        sink: Arc<dyn DisplaySink>,
        push: PushSlot,
    ) -> Self {
        Self {
            source,
            evaluator,
            sink,
            push,
            active: AtomicBool::new(true),
            ticks: AtomicU64::new(0),
            apply: Mutex::new(ApplyState {
                dispatcher,
                last_snapshot: None,
            }),
        }
    }

    /// Runs one tick and returns its typed outcome.
    ///
    /// # Errors
    /// - `MonitorError::TransportFailure` — the fetch failed.
    /// - `MonitorError::MalformedTelemetry` — the body was rejected.
    ///
    /// In both cases nothing is dispatched or published.
    pub fn run_tick(&self) -> Result<TickOutcome, MonitorError> {
        self.run_numbered(self.begin_tick())
    }

    /// Reserves the next tick number.
    pub fn begin_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Runs the tick numbered `tick`, as reserved by `begin_tick`. Errors as
    /// for `run_tick`.
    pub fn run_numbered(&self, tick: u64) -> Result<TickOutcome, MonitorError> {
        if !self.is_active() {
            debug!(tick, "pipeline stopped, tick not started");
            return Ok(TickOutcome::Discarded);
        }

        debug!(tick, "polling device");
        let raw = self.source.fetch();

        let (snapshot, alerts) = {
            let mut state = self.lock_apply();
            if !self.is_active() {
                debug!(tick, "pipeline stopped while fetch was in flight, result discarded");
                return Ok(TickOutcome::Discarded);
            }

            let sample = parse_telemetry(&raw?, Utc::now())?;
            let evaluation = self.evaluator.evaluate(&sample);
            let snapshot = StatusSnapshot::new(tick, &sample, evaluation);

            let alerts = state.dispatcher.select(evaluation, self.sink.as_ref());

            self.sink.publish(&snapshot);
            state.last_snapshot = Some(snapshot.clone());
            (snapshot, alerts)
        };

        let channel = self.push.channel();
        deliver_all(&alerts, channel.as_deref());

        Ok(TickOutcome::Applied { snapshot, alerts })
    }

    /// Stops starting fetches and applying results. Returns once any tick
    /// currently applying has finished; in-flight fetches are not
    /// interrupted, and pushes already selected still go out.
    pub fn deactivate(&self) {
        let _state = self.lock_apply();
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Latest applied snapshot, if any tick has been applied.
    pub fn last_snapshot(&self) -> Option<StatusSnapshot> {
        self.lock_apply().last_snapshot.clone()
    }

    /// Number of ticks started so far.
    pub fn ticks_started(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn lock_apply(&self) -> MutexGuard<'_, ApplyState> {
        // A panicking sink must not wedge the loop.
        self.apply.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
