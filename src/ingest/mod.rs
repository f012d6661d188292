//! Device ingestion for the drainage monitoring service.
//!
//! Submodules:
//! - `device`   — HTTP client for the sensor device's plain-text endpoint.
//! - `parse`    — turns the device's `"name: value, name: value"` body into a sample.
//! - `fixtures` — (test only) representative device payloads.

pub mod device;
pub mod parse;

#[cfg(test)]
pub(crate) mod fixtures;
