//! Address geocoding.
//!
//! Every geocoding backend implements [`Geocoder`]. Lookups are pure
//! queries: they never touch the session, so two racing lookups simply
//! resolve independently and whichever result is applied last wins.

mod nominatim;

pub use nominatim::{NominatimGeocoder, DEFAULT_ENDPOINT};

use std::future::Future;

use crate::error::GeocodeError;
use crate::geo::GeoPoint;

pub trait Geocoder: Send + Sync {
    /// Candidate points for `address`, in provider order.
    ///
    /// Never returns an empty list: no match is `NotFound`.
    fn lookup(&self, address: &str)
        -> impl Future<Output = Result<Vec<GeoPoint>, GeocodeError>> + Send;

    /// The best match, which is the first candidate.
    fn resolve_home(&self, address: &str) -> impl Future<Output = Result<GeoPoint, GeocodeError>> + Send {
        async move {
            let candidates = self.lookup(address).await?;
            candidates
                .into_iter()
                .next()
                .ok_or_else(|| GeocodeError::NotFound {
                    address: address.to_string(),
                    reason: "empty result".to_string(),
                })
        }
    }
}

/// Trim and reject blank input before any network call.
pub(crate) fn normalize_address(address: &str) -> Result<&str, GeocodeError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        Err(GeocodeError::EmptyAddress)
    } else {
        Ok(trimmed)
    }
}
