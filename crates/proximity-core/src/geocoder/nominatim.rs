use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{normalize_address, Geocoder};
use crate::error::{ConfigError, GeocodeError};
use crate::geo::{is_valid_coordinate, GeoPoint};

/// OpenStreetMap Nominatim search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Geocoder backed by a Nominatim-compatible HTTP API.
///
/// Issues `GET <endpoint>/<urlencoded address>?format=json`.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    /// # Errors
    /// Returns an error if `endpoint` is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration, user_agent: &str) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            key: "geocoder.endpoint".into(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "geocoder.endpoint".into(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "geocoder".into(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}/{}?format=json",
            self.endpoint,
            urlencoding::encode(address)
        )
    }
}

impl Geocoder for NominatimGeocoder {
    async fn lookup(&self, address: &str) -> Result<Vec<GeoPoint>, GeocodeError> {
        let address = normalize_address(address)?;
        let not_found = |reason: String| GeocodeError::NotFound {
            address: address.to_string(),
            reason,
        };
        let network = |source: reqwest::Error| GeocodeError::Network {
            address: address.to_string(),
            source,
        };

        tracing::debug!(address, "geocoding");
        let resp = self
            .client
            .get(self.search_url(address))
            .send()
            .await
            .map_err(network)?;

        if !resp.status().is_success() {
            return Err(not_found(format!("HTTP {}", resp.status())));
        }

        let body = resp.text().await.map_err(network)?;
        let places: Vec<NominatimPlace> = serde_json::from_str(&body)
            .map_err(|e| not_found(format!("unexpected response body: {e}")))?;

        let candidates: Vec<GeoPoint> = places
            .into_iter()
            .filter_map(|place| {
                let point = place.to_point();
                if point.is_none() {
                    tracing::warn!(address, "skipping candidate with unusable coordinates");
                }
                point
            })
            .collect();

        if candidates.is_empty() {
            return Err(not_found("empty result".to_string()));
        }
        tracing::debug!(address, count = candidates.len(), "geocoded");
        Ok(candidates)
    }
}

/// Nominatim sends coordinates as strings; other providers use numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    fn value(&self) -> Option<f64> {
        match self {
            Degrees::Number(n) => Some(*n),
            Degrees::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: Degrees,
    lon: Degrees,
    #[serde(default)]
    display_name: String,
}

impl NominatimPlace {
    fn to_point(&self) -> Option<GeoPoint> {
        let lat = self.lat.value()?;
        let lon = self.lon.value()?;
        is_valid_coordinate(lat, lon).then(|| GeoPoint::new(lat, lon, self.display_name.clone()))
    }
}
