//! Notification delivery and permission.
//!
//! Push delivery is only possible once the permission provider has issued a
//! push token. Acquisition happens once, on a background thread at startup,
//! and never gates the poll loop: until (or unless) a channel lands in the
//! `PushSlot`, the dispatcher skips push and keeps raising in-app alerts.

pub mod expo;

use std::fmt;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::model::MonitorError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Immediate-delivery notification channel.
pub trait NotificationChannel: Send + Sync {
    fn deliver(&self, title: &str, body: &str) -> Result<(), MonitorError>;
}

/// Grants (or refuses) push notifications for this device.
pub trait PermissionProvider: Send + Sync {
    fn request(&self) -> Result<PushToken, MonitorError>;
}

/// Opaque identifier addressing push delivery to this device.
#[derive(Clone, PartialEq, Eq)]
pub struct PushToken(String);

impl PushToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens address a real device; keep them out of logs.
impl fmt::Debug for PushToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PushToken(..{} chars)", self.0.len())
    }
}

// ---------------------------------------------------------------------------
// Push slot
// ---------------------------------------------------------------------------

/// Shared holder for the channel granted at startup.
#[derive(Clone, Default)]
pub struct PushSlot {
    inner: Arc<RwLock<Option<Arc<dyn NotificationChannel>>>>,
}

impl PushSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that already holds `channel`.
    pub fn granted(channel: Arc<dyn NotificationChannel>) -> Self {
        let slot = Self::new();
        slot.install(channel);
        slot
    }

    pub fn install(&self, channel: Arc<dyn NotificationChannel>) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(channel),
            Err(poisoned) => *poisoned.into_inner() = Some(channel),
        }
    }

    pub fn channel(&self) -> Option<Arc<dyn NotificationChannel>> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.channel().is_some()
    }
}

/// Requests permission on a background thread and, if granted, installs the
/// channel built by `make_channel` into `slot`.
///
/// The returned handle yields the outcome; callers are free to drop it.
pub fn acquire_push_channel<P, F>(provider: P, slot: PushSlot, make_channel: F) -> JoinHandle<Result<(), MonitorError>>
where
    P: PermissionProvider + 'static,
    F: FnOnce(PushToken) -> Arc<dyn NotificationChannel> + Send + 'static,
{
    thread::spawn(move || match provider.request() {
        Ok(token) => {
            info!(token = ?token, "push notifications granted");
            slot.install(make_channel(token));
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "push notifications unavailable, in-app alerts only");
            Err(e)
        }
    })
}

// ---------------------------------------------------------------------------
// Providers and channels
// ---------------------------------------------------------------------------

/// Grants permission when a push token was configured for this device.
pub struct ConfiguredPermission {
    token: Option<String>,
}

impl ConfiguredPermission {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl PermissionProvider for ConfiguredPermission {
    fn request(&self) -> Result<PushToken, MonitorError> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(PushToken::new(token)),
            _ => Err(MonitorError::NotificationPermissionDenied(
                "no push token configured (set DRAINMON_PUSH_TOKEN)".to_string(),
            )),
        }
    }
}

/// Delivers notifications to the log. Used when running headless without a
/// push service.
pub struct LogChannel;

impl NotificationChannel for LogChannel {
    fn deliver(&self, title: &str, body: &str) -> Result<(), MonitorError> {
        warn!(title, body, "notification");
        Ok(())
    }
}
