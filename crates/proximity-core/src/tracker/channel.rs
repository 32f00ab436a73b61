//! Push-driven location source.
//!
//! Bridges callback-style platform APIs: the platform glue holds a
//! [`SampleFeed`] and pushes every position it receives; the monitor
//! subscribes to the paired [`ChannelSource`].

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use super::subscription::{Subscription, DEFAULT_BUFFER};
use super::{LocationRequest, LocationSource};
use crate::error::TrackerError;
use crate::geo::LocationSample;

#[derive(Debug)]
struct Inner {
    sender: Option<mpsc::Sender<LocationSample>>,
    last_known: Option<LocationSample>,
    permission_granted: bool,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
pub struct ChannelSource {
    inner: Arc<Mutex<Inner>>,
}

/// Producer handle for a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct SampleFeed {
    inner: Arc<Mutex<Inner>>,
}

impl ChannelSource {
    pub fn new() -> (Self, SampleFeed) {
        let inner = Arc::new(Mutex::new(Inner {
            sender: None,
            last_known: None,
            permission_granted: true,
        }));
        (
            Self {
                inner: inner.clone(),
            },
            SampleFeed { inner },
        )
    }
}

impl SampleFeed {
    /// Record a position and forward it to the live subscription, if any.
    ///
    /// Returns `false` when nothing is subscribed or the subscriber is
    /// lagging and the sample was dropped.
    pub fn push(&self, sample: LocationSample) -> bool {
        let mut inner = lock(&self.inner);
        inner.last_known = Some(sample);
        let result = match &inner.sender {
            Some(tx) => tx.try_send(sample),
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("subscriber lagging, sample dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                inner.sender = None;
                false
            }
        }
    }

    /// Mirror the platform's permission state.
    pub fn set_permission(&self, granted: bool) {
        lock(&self.inner).permission_granted = granted;
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.inner).sender.is_some()
    }
}

impl LocationSource for ChannelSource {
    fn last_known(&self) -> Option<LocationSample> {
        lock(&self.inner).last_known
    }

    fn subscribe(&self, _request: &LocationRequest) -> Result<Subscription, TrackerError> {
        let mut inner = lock(&self.inner);
        if !inner.permission_granted {
            return Err(TrackerError::PermissionDenied);
        }
        if inner.sender.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(TrackerError::AlreadySubscribed);
        }
        let (tx, rx) = mpsc::channel(DEFAULT_BUFFER);
        inner.sender = Some(tx);
        drop(inner);

        let shared = self.inner.clone();
        Ok(Subscription::from_receiver(rx, move || {
            lock(&shared).sender = None;
        }))
    }
}
