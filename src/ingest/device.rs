//! Sensor device HTTP client.
//!
//! The device (an ESP8266 on the local network) serves its latest reading
//! as plain text at a fixed path. Requests carry no headers, no
//! authentication and no body. There is no retry or backoff: a failed
//! request simply means no sample this tick.

use crate::config::DeviceConfig;
use crate::model::MonitorError;

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Anything that can produce a raw telemetry body on demand.
///
/// The pipeline depends on this rather than on `HttpDeviceClient` so ticks
/// can be driven from scripted sources in tests.
pub trait TelemetrySource: Send + Sync {
    fn fetch(&self) -> Result<String, MonitorError>;
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds the device URL, e.g. `http://192.168.43.137:80/root`.
///
/// A missing leading slash on `path` is added; an empty path becomes `/`.
pub fn build_device_url(host: &str, port: u16, path: &str) -> String {
    let path = path.trim_start_matches('/');
    format!("http://{}:{}/{}", host, port, path)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub struct HttpDeviceClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpDeviceClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.into(),
        }
    }

    pub fn from_config(device: &DeviceConfig) -> Self {
        Self::new(build_device_url(&device.host, device.port, &device.path))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TelemetrySource for HttpDeviceClient {
    /// Issues one GET and returns the body text.
    ///
    /// # Errors
    /// `MonitorError::TransportFailure` if the device is unreachable, answers
    /// with a non-2xx status, or the body cannot be read.
    fn fetch(&self) -> Result<String, MonitorError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| MonitorError::TransportFailure(format!("GET {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::TransportFailure(format!(
                "GET {} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }

        response
            .text()
            .map_err(|e| MonitorError::TransportFailure(format!("Failed to read body from {}: {}", self.url, e)))
    }
}
