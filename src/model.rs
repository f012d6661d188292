//! TelemetrySample, DrainageState, BlockageState, AlertEvent, MonitorError
//!
//! Core data types for the drainage monitoring service.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no logic and no I/O, only types and the fixed alert texts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Alert texts
// ---------------------------------------------------------------------------

/// Title used for every push notification.
pub const NOTIFICATION_TITLE: &str = "Warning";

/// Push notification body for an overflow.
pub const OVERFLOW_BODY: &str = "Drainage Overflow has been detected!!!";

/// Push notification body for a blockage.
pub const BLOCKAGE_BODY: &str = "Blockage has been detected!!!";

/// Blocking in-app alert raised alongside the blockage notification.
pub const BLOCKAGE_IN_APP_ALERT: &str = "Drainage Blockage Detected";

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// One reading from the sensor device.
///
/// Built only by `ingest::parse::parse_telemetry`. The water level is kept
/// exactly as the device sent it (e.g. `"50.00%"`) because the default
/// overflow rule compares text, not numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySample {
    pub water_level: String,
    pub distance_cm: i64,
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Derived states
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DrainageState {
    #[default]
    Normal,
    Overflow,
}

impl DrainageState {
    /// Label shown by display sinks.
    pub fn label(&self) -> &'static str {
        match self {
            DrainageState::Normal => "Normal",
            DrainageState::Overflow => "Detected Overflow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BlockageState {
    #[default]
    Clear,
    Detected,
}

/// Both states derived from a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Evaluation {
    pub drainage: DrainageState,
    pub blockage: BlockageState,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    Overflow,
    Blockage,
}

/// A notification the dispatcher decided to send on this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
}

impl AlertEvent {
    pub fn overflow() -> Self {
        Self {
            kind: AlertKind::Overflow,
            title: NOTIFICATION_TITLE.to_string(),
            body: OVERFLOW_BODY.to_string(),
        }
    }

    pub fn blockage() -> Self {
        Self {
            kind: AlertKind::Blockage,
            title: NOTIFICATION_TITLE.to_string(),
            body: BLOCKAGE_BODY.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable status produced once per applied tick and handed to the
/// display sink. Sinks render it; they never feed it back into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub tick: u64,
    pub drainage: DrainageState,
    pub blockage: BlockageState,
    pub water_level: String,
    pub distance_cm: i64,
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(tick: u64, sample: &TelemetrySample, evaluation: Evaluation) -> Self {
        Self {
            tick,
            drainage: evaluation.drainage,
            blockage: evaluation.blockage,
            water_level: sample.water_level.clone(),
            distance_cm: sample.distance_cm,
            observed_at: sample.observed_at,
        }
    }

    pub fn evaluation(&self) -> Evaluation {
        Evaluation {
            drainage: self.drainage,
            blockage: self.blockage,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while polling the device or delivering alerts.
///
/// None of these are fatal: the scheduler logs them and waits for the next
/// tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The request failed or the device is unreachable.
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    /// The body did not split into exactly two fields, or the distance
    /// was not an integer.
    #[error("Malformed telemetry: {0}")]
    MalformedTelemetry(String),
    /// Push notifications are unavailable on this device.
    #[error("Notification permission denied: {0}")]
    NotificationPermissionDenied(String),
    /// A push notification could not be handed to the delivery service.
    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(String),
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
