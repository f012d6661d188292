//! Monitor configuration loader - parses drainmon.toml
//!
//! The device address and thresholds default to the values the sensor
//! firmware ships with, so the service runs with no file at all. A TOML
//! file and environment variables (`.env` is honoured) can override them
//! without recompiling.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::alert::dispatch::DispatchMode;
use crate::alert::thresholds::{OverflowRule, ThresholdEvaluator};
use crate::daemon::{OverlapPolicy, SchedulerConfig};
use crate::model::MonitorError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_CONFIG_PATH: &str = "drainmon.toml";

pub const DEFAULT_DEVICE_HOST: &str = "192.168.43.137";
pub const DEFAULT_DEVICE_PORT: u16 = 80;
pub const DEFAULT_DEVICE_PATH: &str = "/root";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Reading the device reports when the drain is full.
pub const DEFAULT_OVERFLOW_READING: &str = "99.90%";
pub const DEFAULT_OVERFLOW_PERCENT: f64 = 99.90;
/// Half of the device's 0.01% display resolution.
pub const DEFAULT_OVERFLOW_TOLERANCE: f64 = 0.005;
pub const DEFAULT_BLOCKAGE_DISTANCE_CM: i64 = 20;

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub device: DeviceConfig,
    pub polling: PollingConfig,
    pub thresholds: ThresholdConfig,
    pub alerts: AlertConfig,
}

/// Where the sensor device answers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    /// "skip" drops a tick while the previous fetch is pending,
    /// "concurrent" lets ticks overlap.
    pub overlap: OverlapPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// "exact" or "numeric"
    pub overflow_rule: OverflowRuleKind,
    pub overflow_reading: String,
    pub overflow_percent: f64,
    pub overflow_tolerance: f64,
    pub blockage_distance_cm: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowRuleKind {
    Exact,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// "edge" notifies on transitions only, "level" on every qualifying tick.
    pub mode: DispatchMode,
    /// Expo push token for this device. Absent means push permission
    /// has not been granted.
    pub push_token: Option<String>,
    pub push_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            polling: PollingConfig::default(),
            thresholds: ThresholdConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DEVICE_HOST.to_string(),
            port: DEFAULT_DEVICE_PORT,
            path: DEFAULT_DEVICE_PATH.to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            overlap: OverlapPolicy::Skip,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            overflow_rule: OverflowRuleKind::Exact,
            overflow_reading: DEFAULT_OVERFLOW_READING.to_string(),
            overflow_percent: DEFAULT_OVERFLOW_PERCENT,
            overflow_tolerance: DEFAULT_OVERFLOW_TOLERANCE,
            blockage_distance_cm: DEFAULT_BLOCKAGE_DISTANCE_CM,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::EdgeTriggered,
            push_token: None,
            push_url: crate::notify::expo::EXPO_PUSH_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl MonitorConfig {
    /// Parses configuration from TOML text. Missing tables and keys fall
    /// back to defaults.
    pub fn from_toml(contents: &str) -> Result<Self, MonitorError> {
        let config: MonitorConfig = toml::from_str(contents)
            .map_err(|e| MonitorError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`. A missing file yields the defaults;
    /// an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Loads `.env`, the configuration file and environment overrides,
    /// in that order.
    pub fn load_with_env(path: &Path) -> Result<Self, MonitorError> {
        dotenv::dotenv().ok();
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `DRAINMON_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DRAINMON_HOST") {
            self.device.host = host;
        }
        if let Some(port) = lookup("DRAINMON_PORT") {
            self.device.port = port
                .parse()
                .map_err(|_| MonitorError::Config(format!("DRAINMON_PORT is not a port: {}", port)))?;
        }
        if let Some(secs) = lookup("DRAINMON_POLL_SECS") {
            self.polling.interval_secs = secs.parse().map_err(|_| {
                MonitorError::Config(format!("DRAINMON_POLL_SECS is not a number: {}", secs))
            })?;
        }
        if let Some(token) = lookup("DRAINMON_PUSH_TOKEN") {
            self.alerts.push_token = Some(token).filter(|t| !t.is_empty());
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.device.host.trim().is_empty() {
            return Err(MonitorError::Config("device.host must not be empty".to_string()));
        }
        if self.device.port == 0 {
            return Err(MonitorError::Config("device.port must not be 0".to_string()));
        }
        if self.polling.interval_secs == 0 {
            return Err(MonitorError::Config("polling.interval_secs must be positive".to_string()));
        }
        if self.thresholds.overflow_tolerance < 0.0 {
            return Err(MonitorError::Config(
                "thresholds.overflow_tolerance must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn evaluator(&self) -> ThresholdEvaluator {
        let rule = match self.thresholds.overflow_rule {
            OverflowRuleKind::Exact => OverflowRule::ExactMatch(self.thresholds.overflow_reading.clone()),
            OverflowRuleKind::Numeric => OverflowRule::Numeric {
                threshold_percent: self.thresholds.overflow_percent,
                tolerance: self.thresholds.overflow_tolerance,
            },
        };
        ThresholdEvaluator::new(rule, self.thresholds.blockage_distance_cm)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.polling.interval_secs),
            overlap: self.polling.overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_device_constants() {
        let config = MonitorConfig::default();
        assert_eq!(config.device.host, "192.168.43.137");
        assert_eq!(config.device.port, 80);
        assert_eq!(config.device.path, "/root");
        assert_eq!(config.polling.interval_secs, 5);
        assert_eq!(config.polling.overlap, OverlapPolicy::Skip);
        assert_eq!(config.thresholds.overflow_rule, OverflowRuleKind::Exact);
        assert_eq!(config.thresholds.blockage_distance_cm, 20);
        assert_eq!(config.alerts.mode, DispatchMode::EdgeTriggered);
        assert!(config.alerts.push_token.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MonitorConfig::from_toml(
            r#"
            [device]
            host = "10.0.0.7"

            [alerts]
            mode = "level"
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.device.host, "10.0.0.7");
        assert_eq!(config.device.port, 80);
        assert_eq!(config.alerts.mode, DispatchMode::LevelTriggered);
        assert_eq!(config.polling.interval_secs, 5);
    }

    #[test]
    fn test_numeric_rule_from_toml() {
        let config = MonitorConfig::from_toml(
            r#"
            [thresholds]
            overflow_rule = "numeric"
            overflow_percent = 95.0
            "#,
        )
        .expect("numeric config should parse");

        match config.evaluator().overflow_rule() {
            OverflowRule::Numeric { threshold_percent, tolerance } => {
                assert_eq!(*threshold_percent, 95.0);
                assert_eq!(*tolerance, DEFAULT_OVERFLOW_TOLERANCE);
            }
            other => panic!("expected numeric rule, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = MonitorConfig::from_toml("[polling]\ninterval_secs = 0\n");
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = MonitorConfig::from_toml("[device\nhost = ");
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = MonitorConfig::load(&dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[device]\nport = 8080\n\n[polling]\ninterval_secs = 2").expect("write");

        let config = MonitorConfig::load(file.path()).expect("config should load");
        assert_eq!(config.device.port, 8080);
        assert_eq!(config.scheduler_config().poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MonitorConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("DRAINMON_HOST", "drain.local"),
                ("DRAINMON_PORT", "8081"),
                ("DRAINMON_PUSH_TOKEN", "ExponentPushToken[abc]"),
            ]))
            .expect("overrides should apply");

        assert_eq!(config.device.host, "drain.local");
        assert_eq!(config.device.port, 8081);
        assert_eq!(config.alerts.push_token.as_deref(), Some("ExponentPushToken[abc]"));
    }

    #[test]
    fn test_bad_port_override_rejected() {
        let mut config = MonitorConfig::default();
        let result = config.apply_overrides(lookup_from(&[("DRAINMON_PORT", "eighty")]));
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_empty_push_token_means_no_token() {
        let mut config = MonitorConfig::default();
        config
            .apply_overrides(lookup_from(&[("DRAINMON_PUSH_TOKEN", "")]))
            .expect("overrides should apply");
        assert!(config.alerts.push_token.is_none());
    }
}
