use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A geocoded place. Once chosen as home it is the reference point for
/// every distance computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, display_name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            display_name: display_name.into(),
        }
    }

    /// Reject a home point that no distance could be measured from.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_valid_coordinate(self.latitude, self.longitude) {
            Ok(())
        } else {
            Err(ValidationError::InvalidHome {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// One reported device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Sample stamped with the current time.
    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, Utc::now())
    }

    /// Reject non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_valid_coordinate(self.latitude, self.longitude) {
            Ok(())
        } else {
            Err(ValidationError::InvalidSample {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Anything with a latitude and longitude in degrees.
pub trait Coordinate {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

impl Coordinate for GeoPoint {
    fn latitude(&self) -> f64 {
        self.latitude
    }
    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Coordinate for LocationSample {
    fn latitude(&self) -> f64 {
        self.latitude
    }
    fn longitude(&self) -> f64 {
        self.longitude
    }
}

pub(crate) fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// `"(lat, lon)"` as shown next to the current position.
pub fn location_text(point: &impl Coordinate) -> String {
    format!("({}, {})", point.latitude(), point.longitude())
}
