//! drainmon_service: drainage overflow and blockage monitoring client.
//!
//! Polls a sensor device for its water level and obstruction distance,
//! evaluates both against fixed thresholds and raises in-app alerts and
//! push notifications.
//!
//! # Module structure
//!
//! ```text
//! drainmon_service
//! ├── model       — shared data types (TelemetrySample, StatusSnapshot, MonitorError, …)
//! ├── config      — drainmon.toml + DRAINMON_* environment configuration
//! ├── logging     — tracing subscriber setup and tick failure classification
//! ├── ingest
//! │   ├── device  — HTTP client for the device endpoint
//! │   ├── parse   — "name: value, name: value" payload parsing
//! │   └── fixtures (test only) — representative device payloads
//! ├── alert
//! │   ├── thresholds — overflow and blockage evaluation
//! │   └── dispatch   — level- or edge-triggered notification dispatch
//! ├── notify
//! │   └── expo    — push permission, push slot, Expo push delivery
//! ├── monitor     — one tick of the poll → parse → evaluate → notify pipeline
//! ├── daemon      — poll scheduler (timer thread, overlap policy, stop handle)
//! └── endpoint    — display sinks and the HTTP status endpoint
//! ```

pub mod alert;
pub mod config;
pub mod daemon;
pub mod endpoint;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod notify;
