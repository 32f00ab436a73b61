//! Scripted location source.
//!
//! Replays a fixed list of positions, one per pacing interval. Records may
//! omit their timestamp, in which case they are stamped when emitted.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::subscription::{Subscription, DEFAULT_BUFFER};
use super::{LocationRequest, LocationSource};
use crate::error::{CoreError, TrackerError};
use crate::geo::LocationSample;

/// One entry of a replay script.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReplayRecord {
    fn to_sample(self) -> LocationSample {
        LocationSample::new(
            self.latitude,
            self.longitude,
            self.timestamp.unwrap_or_else(Utc::now),
        )
    }
}

impl From<LocationSample> for ReplayRecord {
    fn from(s: LocationSample) -> Self {
        Self {
            latitude: s.latitude,
            longitude: s.longitude,
            timestamp: Some(s.timestamp),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplaySource {
    records: Vec<ReplayRecord>,
    /// Overrides the request's fastest interval.
    pace: Option<Duration>,
    permission_granted: bool,
    last_known: Option<LocationSample>,
}

impl ReplaySource {
    pub fn new(samples: Vec<LocationSample>) -> Self {
        Self::from_records(samples.into_iter().map(ReplayRecord::from).collect())
    }

    pub fn from_records(records: Vec<ReplayRecord>) -> Self {
        Self {
            records,
            pace: None,
            permission_granted: true,
            last_known: None,
        }
    }

    /// Load a JSON array of records.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<ReplayRecord> = serde_json::from_str(&content)?;
        Ok(Self::from_records(records))
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn with_permission(mut self, granted: bool) -> Self {
        self.permission_granted = granted;
        self
    }

    pub fn with_last_known(mut self, sample: LocationSample) -> Self {
        self.last_known = Some(sample);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl LocationSource for ReplaySource {
    fn last_known(&self) -> Option<LocationSample> {
        self.last_known
    }

    fn subscribe(&self, request: &LocationRequest) -> Result<Subscription, TrackerError> {
        if !self.permission_granted {
            return Err(TrackerError::PermissionDenied);
        }
        let records = self.records.clone();
        let pace = self.pace.unwrap_or(request.fastest_interval);

        Ok(Subscription::spawn(DEFAULT_BUFFER, move |tx| async move {
            for (i, record) in records.into_iter().enumerate() {
                if i > 0 && !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
                if tx.send(record.to_sample()).await.is_err() {
                    return;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn records_without_timestamp_parse() {
        let json = r#"[{"latitude": 1.5, "longitude": 2.5}]"#;
        let records: Vec<ReplayRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].timestamp, None);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"latitude": 0.0, "longitude": 0.0}}, {{"latitude": 0.01, "longitude": 0.0, "timestamp": "2026-01-01T00:00:00Z"}}]"#
        )
        .unwrap();
        let source = ReplaySource::from_json_file(file.path()).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[tokio::test]
    async fn replays_in_order() {
        let source = ReplaySource::new(vec![
            LocationSample::now(1.0, 0.0),
            LocationSample::now(2.0, 0.0),
        ])
        .with_pace(Duration::ZERO);
        let mut sub = source.subscribe(&LocationRequest::default()).unwrap();
        assert_eq!(sub.next().await.unwrap().latitude, 1.0);
        assert_eq!(sub.next().await.unwrap().latitude, 2.0);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn last_known_is_seeded() {
        let seed = LocationSample::now(3.0, 4.0);
        let source = ReplaySource::new(Vec::new()).with_last_known(seed);
        assert_eq!(source.last_known(), Some(seed));
    }
}
