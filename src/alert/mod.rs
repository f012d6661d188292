//! Alerting for the drainage monitoring service.
//!
//! Submodules:
//! - `thresholds` — overflow and blockage state evaluation for one sample.
//! - `dispatch`   — turns evaluated states into notifications and in-app alerts.

pub mod dispatch;
pub mod thresholds;
