use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, LocationSample};
use crate::monitor::{AlertState, Presentation};

/// Every state change in the monitor produces an Event.
/// The CLI prints them; alert sinks react to the alert variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A new home point was chosen.
    HomeSet {
        home: GeoPoint,
        at: DateTime<Utc>,
    },
    /// Home was cleared; alert state reset.
    HomeCleared {
        at: DateTime<Utc>,
    },
    TrackingStarted {
        interval_ms: u64,
        fastest_interval_ms: u64,
        at: DateTime<Utc>,
    },
    TrackingStopped {
        at: DateTime<Utc>,
    },
    /// A sample was accepted. `distance_m` is absent while no home is set.
    SampleRecorded {
        sample: LocationSample,
        distance_m: Option<f64>,
        state: Option<AlertState>,
    },
    /// A sample was rejected and did not touch the session.
    SampleRejected {
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    },
    /// Crossed from near to far.
    AlertRaised {
        distance_m: f64,
        at: DateTime<Utc>,
    },
    /// Came back within the threshold.
    AlertCleared {
        distance_m: f64,
        at: DateTime<Utc>,
    },
    /// Observer attach/detach changed how alerts are presented.
    PresentationChanged {
        presentation: Presentation,
        at: DateTime<Utc>,
    },
}
