//! Location tracking.
//!
//! The platform location API is consumed, not reimplemented: it sits
//! behind [`LocationSource`]. [`LocationTracker`] owns at most one live
//! [`Subscription`] and is what the monitor reads samples from.

mod channel;
mod replay;
mod subscription;

pub use channel::{ChannelSource, SampleFeed};
pub use replay::{ReplayRecord, ReplaySource};
pub use subscription::{Subscription, DEFAULT_BUFFER};

use std::time::Duration;

use crate::error::TrackerError;
use crate::geo::LocationSample;

/// Default update interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10_000);
/// Default fastest update interval (half the regular one).
pub const DEFAULT_FASTEST_INTERVAL: Duration = Duration::from_millis(5_000);

/// How often the source should deliver samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub interval: Duration,
    /// Lower bound between two deliveries.
    pub fastest_interval: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            fastest_interval: DEFAULT_FASTEST_INTERVAL,
        }
    }
}

/// A provider of device positions.
pub trait LocationSource: Send + Sync {
    /// Cached position, available without a live subscription.
    fn last_known(&self) -> Option<LocationSample>;

    /// Start delivering samples.
    ///
    /// # Errors
    /// `PermissionDenied` when location access is refused, never an empty
    /// stream.
    fn subscribe(&self, request: &LocationRequest) -> Result<Subscription, TrackerError>;
}

/// Single-subscription wrapper around a [`LocationSource`].
pub struct LocationTracker<S> {
    source: S,
    request: LocationRequest,
    subscription: Option<Subscription>,
}

impl<S: LocationSource> LocationTracker<S> {
    pub fn new(source: S, request: LocationRequest) -> Self {
        Self {
            source,
            request,
            subscription: None,
        }
    }

    pub fn request(&self) -> &LocationRequest {
        &self.request
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn last_known(&self) -> Option<LocationSample> {
        self.source.last_known()
    }

    /// Subscribe to the source.
    ///
    /// # Errors
    /// `AlreadySubscribed` if a subscription is live, or whatever the
    /// source reports.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.subscription.is_some() {
            return Err(TrackerError::AlreadySubscribed);
        }
        let subscription = self.source.subscribe(&self.request)?;
        tracing::info!(
            interval_ms = self.request.interval.as_millis() as u64,
            fastest_interval_ms = self.request.fastest_interval.as_millis() as u64,
            "location updates requested"
        );
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Next sample from the live subscription.
    ///
    /// Returns `None` when not subscribed or when the source is exhausted;
    /// in the latter case the subscription is released.
    pub async fn next(&mut self) -> Option<LocationSample> {
        let subscription = self.subscription.as_mut()?;
        match subscription.next().await {
            Some(sample) => Some(sample),
            None => {
                tracing::info!("location source exhausted");
                self.subscription = None;
                None
            }
        }
    }

    /// Unsubscribe and wait until delivery has stopped.
    ///
    /// # Errors
    /// `NotSubscribed` if nothing was active.
    pub async fn stop(&mut self) -> Result<(), TrackerError> {
        let subscription = self.subscription.take().ok_or(TrackerError::NotSubscribed)?;
        subscription.unsubscribe().await;
        tracing::info!("location updates removed");
        Ok(())
    }
}
