//! TOML-based application configuration.
//!
//! Stores tunables for:
//! - The alert threshold
//! - Location update intervals
//! - The geocoding endpoint
//! - Alert vibration
//!
//! Configuration is stored at `~/.config/proximity/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::geocoder::{NominatimGeocoder, DEFAULT_ENDPOINT};
use crate::monitor::{ProximityEvaluator, VibrationPolicy, DEFAULT_THRESHOLD_M};
use crate::tracker::LocationRequest;

/// Proximity alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Distance from home, in meters, beyond which the alert is raised.
    #[serde(default = "default_threshold_m")]
    pub threshold_m: f64,
}

/// Location update configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_fastest_interval_ms")]
    pub fastest_interval_ms: u64,
}

/// Geocoding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Nominatim's usage policy requires an identifying User-Agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Alert side-effect configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_true")]
    pub vibration: bool,
    #[serde(default = "default_vibration_ms")]
    pub vibration_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/proximity/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

// Default functions
fn default_threshold_m() -> f64 {
    DEFAULT_THRESHOLD_M
}
fn default_interval_ms() -> u64 {
    10_000
}
fn default_fastest_interval_ms() -> u64 {
    default_interval_ms() / 2
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_user_agent() -> String {
    concat!("proximity/", env!("CARGO_PKG_VERSION")).into()
}
fn default_true() -> bool {
    true
}
fn default_vibration_ms() -> u64 {
    3000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_m: default_threshold_m(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            fastest_interval_ms: default_fastest_interval_ms(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            vibration: true,
            vibration_ms: default_vibration_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(n) => {
                        if n.is_f64() {
                            value
                                .parse::<f64>()
                                .ok()
                                .and_then(serde_json::Number::from_f64)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            let n = value
                                .parse::<u64>()
                                .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?;
                            serde_json::Value::Number(n.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot set a whole section".to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `<data dir>/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// # Errors
    ///
    /// Same as [`Config::load`], for an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Same as [`Config::save`], for an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if the key is
    /// unknown or the result fails validation; `self` is unchanged then.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or is out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.monitor.threshold_m.is_finite() && self.monitor.threshold_m > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "monitor.threshold_m".into(),
                message: "must be a positive number of meters".into(),
            });
        }
        if self.tracking.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tracking.interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.tracking.fastest_interval_ms > self.tracking.interval_ms {
            return Err(ConfigError::InvalidValue {
                key: "tracking.fastest_interval_ms".into(),
                message: "must not exceed tracking.interval_ms".into(),
            });
        }
        if self.geocoder.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "geocoder.timeout_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        url::Url::parse(&self.geocoder.endpoint).map_err(|e| ConfigError::InvalidValue {
            key: "geocoder.endpoint".into(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    pub fn evaluator(&self) -> ProximityEvaluator {
        ProximityEvaluator::new(self.monitor.threshold_m)
    }

    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            interval: Duration::from_millis(self.tracking.interval_ms),
            fastest_interval: Duration::from_millis(self.tracking.fastest_interval_ms),
        }
    }

    pub fn vibration(&self) -> VibrationPolicy {
        VibrationPolicy {
            enabled: self.alerts.vibration,
            duration_ms: self.alerts.vibration_ms,
        }
    }

    /// Build the configured geocoder.
    ///
    /// # Errors
    /// Returns an error if the endpoint is invalid.
    pub fn geocoder(&self) -> Result<NominatimGeocoder, ConfigError> {
        NominatimGeocoder::new(
            &self.geocoder.endpoint,
            Duration::from_secs(self.geocoder.timeout_secs),
            &self.geocoder.user_agent,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.monitor.threshold_m, 1000.0);
        assert_eq!(parsed.tracking.interval_ms, 10_000);
        assert_eq!(parsed.tracking.fastest_interval_ms, 5_000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[monitor]\nthreshold_m = 250.0\n").unwrap();
        assert_eq!(parsed.monitor.threshold_m, 250.0);
        assert_eq!(parsed.geocoder.endpoint, DEFAULT_ENDPOINT);
        assert!(parsed.alerts.vibration);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("alerts.vibration").as_deref(), Some("true"));
        assert_eq!(cfg.get("tracking.interval_ms").as_deref(), Some("10000"));
        assert_eq!(cfg.get("monitor.threshold_m").as_deref(), Some("1000.0"));
        assert!(cfg.get("monitor.missing_key").is_none());
        assert!(cfg.get("monitor").is_none());
    }

    #[test]
    fn set_updates_float_from_integer_text() {
        let mut cfg = Config::default();
        cfg.set("monitor.threshold_m", "500").unwrap();
        assert_eq!(cfg.monitor.threshold_m, 500.0);
    }

    #[test]
    fn set_updates_nested_bool_and_string() {
        let mut cfg = Config::default();
        cfg.set("alerts.vibration", "false").unwrap();
        cfg.set("geocoder.endpoint", "http://localhost:8080/search").unwrap();
        assert!(!cfg.alerts.vibration);
        assert_eq!(cfg.geocoder.endpoint, "http://localhost:8080/search");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("monitor.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("alerts.vibration", "not_a_bool").is_err());
        assert!(cfg.set("tracking.interval_ms", "-5").is_err());
    }

    #[test]
    fn set_rejects_out_of_range_and_keeps_old_value() {
        let mut cfg = Config::default();
        assert!(cfg.set("monitor.threshold_m", "-1").is_err());
        assert!(cfg.set("tracking.fastest_interval_ms", "20000").is_err());
        assert_eq!(cfg.monitor.threshold_m, 1000.0);
        assert_eq!(cfg.tracking.fastest_interval_ms, 5000);
    }

    #[test]
    fn load_from_missing_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.monitor.threshold_m, 1000.0);
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("tracking.interval_ms", "20000").unwrap();
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.tracking.interval_ms, 20_000);
    }

    #[test]
    fn derived_settings() {
        let cfg = Config::default();
        assert_eq!(cfg.location_request(), LocationRequest::default());
        assert_eq!(cfg.evaluator().threshold_m(), 1000.0);
        assert_eq!(cfg.vibration(), VibrationPolicy::default());
        assert!(cfg.geocoder().is_ok());
    }
}
