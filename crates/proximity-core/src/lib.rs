//! # Proximity Core Library
//!
//! This library provides the core logic for Proximity: pick a home point
//! by geocoding an address, follow the device's position, and raise an
//! alert when it strays too far from home. The CLI binary is a thin layer
//! over the same library.
//!
//! ## Architecture
//!
//! - **Geocoder**: Address lookup against a Nominatim-compatible HTTP API
//! - **Tracker**: Cancellable stream of location samples over an abstract
//!   location source
//! - **Monitor**: Edge-triggered proximity evaluator, session state and
//!   alert dispatch
//! - **Storage**: SQLite-backed home record and TOML configuration
//!
//! ## Key Components
//!
//! - [`ProximityEvaluator`]: Pure alert state machine
//! - [`MonitorSession`]: Owned session state
//! - [`Monitor`]: Controlling context tying everything together
//! - [`HomeStore`]: Durable home point
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod geo;
pub mod geocoder;
pub mod monitor;
pub mod storage;
pub mod tracker;

pub use error::{
    ConfigError, CoreError, GeocodeError, PersistenceError, TrackerError, ValidationError,
};
pub use events::Event;
pub use geo::{distance_m, GeoPoint, LocationSample};
pub use geocoder::{Geocoder, NominatimGeocoder};
pub use monitor::{
    AlertEffect, AlertSink, AlertState, Dispatcher, Monitor, MonitorSession, ProximityEvaluator,
};
pub use storage::{Config, HomeStore};
pub use tracker::{LocationRequest, LocationSource, LocationTracker, Subscription};
