mod distance;
mod point;

pub use distance::{distance_m, EARTH_RADIUS_M};
pub use point::{location_text, Coordinate, GeoPoint, LocationSample};
pub(crate) use point::is_valid_coordinate;
