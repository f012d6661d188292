//! Structured logging for the drainage monitoring service
//!
//! Installs the `tracing` subscriber used by the daemon and classifies tick
//! failures so that an offline device (routine on battery-powered sensors)
//! does not log at the same level as a firmware sending garbage.

use std::fmt;

use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use crate::model::MonitorError;

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Installs the global subscriber. `RUST_LOG` overrides `default_level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - device asleep, out of Wi-Fi range, or rebooting
    Expected,
    /// Unexpected failure - indicates a firmware or configuration problem
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a tick failure by error kind
pub fn classify_failure(err: &MonitorError) -> FailureType {
    match err {
        MonitorError::TransportFailure(msg) if msg.contains("returned HTTP") => FailureType::Unexpected,
        MonitorError::TransportFailure(_) => FailureType::Expected,
        MonitorError::MalformedTelemetry(_) => FailureType::Unexpected,
        MonitorError::NotificationPermissionDenied(_) => FailureType::Expected,
        MonitorError::NotificationDelivery(_) => FailureType::Unknown,
        MonitorError::Config(_) => FailureType::Unexpected,
    }
}

/// Log a failed tick at a level chosen by its classification
pub fn log_tick_failure(tick: u64, err: &MonitorError) {
    let failure_type = classify_failure(err);

    match failure_type {
        FailureType::Expected => warn!(tick, failure = %failure_type, error = %err, "tick skipped"),
        FailureType::Unexpected => error!(tick, failure = %failure_type, error = %err, "tick skipped"),
        FailureType::Unknown => debug!(tick, failure = %failure_type, error = %err, "tick skipped"),
    }
}
