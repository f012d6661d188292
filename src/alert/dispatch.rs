//! Alert dispatch.
//!
//! Consumes the states evaluated for one tick and produces the side
//! effects: push notifications through the granted channel and the
//! blocking in-app alert on the display sink.
//!
//! Two modes are supported:
//! - `LevelTriggered` re-dispatches on every tick the condition holds. A
//!   blockage that lasts a minute at a 5 s poll interval sends twelve
//!   identical notifications.
//! - `EdgeTriggered` remembers the previous tick's states and dispatches
//!   only when a state enters `Overflow`/`Detected` from something else.

use serde::Deserialize;
use tracing::{info, warn};

use crate::endpoint::DisplaySink;
use crate::model::{AlertEvent, BLOCKAGE_IN_APP_ALERT, BlockageState, DrainageState, Evaluation};
use crate::notify::NotificationChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DispatchMode {
    #[serde(rename = "level")]
    LevelTriggered,
    #[serde(rename = "edge")]
    EdgeTriggered,
}

pub struct AlertDispatcher {
    mode: DispatchMode,
    /// States seen on the last applied tick. Starts benign so the first
    /// abnormal reading always alerts.
    previous: Evaluation,
}

impl AlertDispatcher {
    pub fn new(mode: DispatchMode) -> Self {
        Self {
            mode,
            previous: Evaluation::default(),
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Dispatches the alerts due for `evaluation` and returns them.
    ///
    /// With no channel (push permission denied or still pending) the
    /// notifications are skipped but the in-app alert is still raised and
    /// the events are still returned. Delivery failures are logged and do
    /// not stop the remaining side effects.
    pub fn dispatch(
        &mut self,
        evaluation: Evaluation,
        sink: &dyn DisplaySink,
        channel: Option<&dyn NotificationChannel>,
    ) -> Vec<AlertEvent> {
        let events = self.select(evaluation, sink);
        deliver_all(&events, channel);
        events
    }

    /// Decides which alerts are due for `evaluation`, raises the in-app
    /// alert on `sink` and records the states for the next tick. Push
    /// delivery is left to `deliver_all`.
    pub fn select(&mut self, evaluation: Evaluation, sink: &dyn DisplaySink) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        let overflow_entered = self.previous.drainage != DrainageState::Overflow;
        if evaluation.drainage == DrainageState::Overflow && self.should_fire(overflow_entered) {
            events.push(AlertEvent::overflow());
        }

        let blockage_entered = self.previous.blockage != BlockageState::Detected;
        if evaluation.blockage == BlockageState::Detected && self.should_fire(blockage_entered) {
            sink.raise_alert(BLOCKAGE_IN_APP_ALERT);
            events.push(AlertEvent::blockage());
        }

        self.previous = evaluation;
        events
    }

    fn should_fire(&self, entered: bool) -> bool {
        match self.mode {
            DispatchMode::LevelTriggered => true,
            DispatchMode::EdgeTriggered => entered,
        }
    }
}

/// Pushes each event through `channel`. Blocks for the duration of each
/// delivery; failures are logged and the remaining events still go out.
pub fn deliver_all(events: &[AlertEvent], channel: Option<&dyn NotificationChannel>) {
    for event in events {
        info!(kind = ?event.kind, body = %event.body, "alert dispatched");
        match channel {
            Some(channel) => {
                if let Err(e) = channel.deliver(&event.title, &event.body) {
                    warn!(kind = ?event.kind, error = %e, "push notification not delivered");
                }
            }
            None => info!(kind = ?event.kind, "push unavailable, notification skipped"),
        }
    }
}
