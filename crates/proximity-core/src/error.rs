//! Core error types for proximity-core.
//!
//! This module defines the error hierarchy using thiserror. Each component
//! has its own error enum; `CoreError` wraps them for callers that drive
//! the whole monitor.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for proximity-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Geocoding lookup errors
    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    /// Location tracker errors
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Durable state errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Geocoding errors.
///
/// `Network` is transient and worth retrying; `NotFound` is terminal for
/// the query and the user has to resubmit different text.
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// Address text was empty or whitespace
    #[error("Address must not be empty")]
    EmptyAddress,

    /// Provider returned no usable match
    #[error("No match for '{address}': {reason}")]
    NotFound { address: String, reason: String },

    /// Transport failure or timeout
    #[error("Network error while geocoding '{address}': {source}")]
    Network {
        address: String,
        #[source]
        source: reqwest::Error,
    },
}

impl GeocodeError {
    /// Whether the caller may retry the same query.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeocodeError::Network { .. })
    }
}

/// Location tracker errors.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Location permission was refused at subscribe time
    #[error("Location permission denied")]
    PermissionDenied,

    /// A subscription is already active for this tracker
    #[error("A location subscription is already active")]
    AlreadySubscribed,

    /// No subscription is active
    #[error("No active location subscription")]
    NotSubscribed,

    /// The underlying source failed to start
    #[error("Location source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Durable state errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to open the store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store is locked by another writer
    #[error("Store is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt value for '{key}': {value}")]
    Corrupt { key: String, value: String },

    /// Data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Location sample outside the valid coordinate range or not finite
    #[error("Invalid sample: latitude {latitude}, longitude {longitude}")]
    InvalidSample { latitude: f64, longitude: f64 },

    /// Home point outside the valid coordinate range or not finite
    #[error("Invalid home point: latitude {latitude}, longitude {longitude}")]
    InvalidHome { latitude: f64, longitude: f64 },
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    PersistenceError::Locked
                } else {
                    PersistenceError::QueryFailed(err.to_string())
                }
            }
            _ => PersistenceError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_not_retryable() {
        let err = GeocodeError::NotFound {
            address: "nowhere".into(),
            reason: "empty result".into(),
        };
        assert!(!err.is_retryable());
        assert!(!GeocodeError::EmptyAddress.is_retryable());
    }

    #[test]
    fn core_error_wraps_component_errors() {
        let err: CoreError = TrackerError::PermissionDenied.into();
        assert_eq!(err.to_string(), "Tracker error: Location permission denied");

        let err: CoreError = ValidationError::InvalidSample {
            latitude: f64::NAN,
            longitude: 0.0,
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn query_returned_no_rows_maps_to_query_failed() {
        let err: PersistenceError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, PersistenceError::QueryFailed(_)));
    }
}
