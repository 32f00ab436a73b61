//! Great-circle distance on a spherical Earth.

use super::point::Coordinate;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance in meters between two coordinates.
///
/// Symmetric and zero for identical points. The intermediate term is
/// clamped so rounding near antipodes never produces NaN.
pub fn distance_m(a: &impl Coordinate, b: &impl Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude() - a.longitude()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
