//! The controlling context of a monitoring session.
//!
//! [`Monitor`] is the single writer of its [`MonitorSession`]: samples
//! from the tracker are evaluated one at a time, in arrival order, and
//! alert edges are handed to the [`Dispatcher`]. Home changes go to the
//! durable store before they reach the session.

use chrono::Utc;

use super::dispatcher::Dispatcher;
use super::evaluator::ProximityEvaluator;
use super::session::MonitorSession;
use crate::error::{CoreError, GeocodeError, TrackerError};
use crate::events::Event;
use crate::geo::{GeoPoint, LocationSample};
use crate::geocoder::Geocoder;
use crate::storage::HomeStore;
use crate::tracker::{LocationSource, LocationTracker};

pub struct Monitor<G, S> {
    geocoder: G,
    tracker: LocationTracker<S>,
    store: HomeStore,
    session: MonitorSession,
    dispatcher: Dispatcher,
}

impl<G: Geocoder, S: LocationSource> Monitor<G, S> {
    /// Build a monitor, recovering home from `store`.
    ///
    /// A store that cannot be read leaves the session without home.
    pub fn restore(
        geocoder: G,
        tracker: LocationTracker<S>,
        store: HomeStore,
        evaluator: ProximityEvaluator,
        dispatcher: Dispatcher,
    ) -> Self {
        let home = match store.load_home() {
            Ok(home) => home,
            Err(e) => {
                tracing::warn!(error = %e, "could not load home, starting without one");
                None
            }
        };
        if let Some(home) = &home {
            tracing::info!(display_name = %home.display_name, "home restored");
        }

        Self {
            geocoder,
            tracker,
            store,
            session: MonitorSession::with_home(evaluator, home),
            dispatcher,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &MonitorSession {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &HomeStore {
        &self.store
    }

    /// Cached position from the source, for display before the first update.
    pub fn last_known(&self) -> Option<LocationSample> {
        self.tracker.last_known()
    }

    /// Whether tracking was left on by a previous run.
    pub fn tracking_requested(&self) -> bool {
        self.store.tracking_requested().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read tracking flag");
            false
        })
    }

    // ── Home ─────────────────────────────────────────────────────────

    /// All candidates for `address`, without changing anything.
    ///
    /// # Errors
    /// See [`Geocoder::lookup`].
    pub async fn lookup(&self, address: &str) -> Result<Vec<GeoPoint>, GeocodeError> {
        self.geocoder.lookup(address).await
    }

    /// Geocode `address` and make the first candidate home.
    ///
    /// # Errors
    /// Geocoding or persistence failures; the session is unchanged then.
    pub async fn submit_address(&mut self, address: &str) -> Result<Event, CoreError> {
        let home = self.geocoder.resolve_home(address).await?;
        self.apply_home(home)
    }

    /// Persist `home` and make it current.
    ///
    /// # Errors
    /// `InvalidHome` for a non-finite or out-of-range point, or persistence
    /// failures; the session is unchanged then.
    pub fn apply_home(&mut self, home: GeoPoint) -> Result<Event, CoreError> {
        home.validate()?;
        self.store.save_home(&home)?;
        tracing::info!(
            display_name = %home.display_name,
            latitude = home.latitude,
            longitude = home.longitude,
            "home set"
        );
        self.session.set_home(home.clone());
        Ok(Event::HomeSet {
            home,
            at: Utc::now(),
        })
    }

    /// Forget home, both durably and in the session.
    ///
    /// # Errors
    /// Persistence failures; the session is unchanged then.
    pub fn clear_home(&mut self) -> Result<Event, CoreError> {
        self.store.clear_home()?;
        self.session.clear_home();
        tracing::info!("home cleared");
        Ok(Event::HomeCleared { at: Utc::now() })
    }

    // ── Tracking ─────────────────────────────────────────────────────

    /// Subscribe to location updates and remember that tracking is on.
    ///
    /// The flag is written before subscribing, so a failed write leaves
    /// nothing subscribed and the call can be retried.
    ///
    /// # Errors
    /// Tracker or persistence failures. When subscribing fails the
    /// persisted tracking flag is reset.
    pub fn start_tracking(&mut self) -> Result<Vec<Event>, CoreError> {
        if self.tracker.is_active() {
            return Err(TrackerError::AlreadySubscribed.into());
        }
        self.store.set_tracking_requested(true)?;

        if let Err(e) = self.tracker.start() {
            if matches!(e, TrackerError::PermissionDenied) {
                tracing::error!("lost location permission, could not request updates");
            }
            if let Err(pe) = self.store.set_tracking_requested(false) {
                tracing::warn!(error = %pe, "could not reset tracking flag");
            }
            return Err(e.into());
        }
        self.session.set_tracking_active(true);

        let request = self.tracker.request();
        let mut events = vec![Event::TrackingStarted {
            interval_ms: request.interval.as_millis() as u64,
            fastest_interval_ms: request.fastest_interval.as_millis() as u64,
            at: Utc::now(),
        }];
        events.extend(self.dispatcher.sync_presentation(&self.session));
        Ok(events)
    }

    /// Unsubscribe, clear the tracking flag, and dismiss any ongoing
    /// notification. Returns once delivery has stopped.
    ///
    /// # Errors
    /// Persistence failures. Tracking is stopped and the presentation
    /// updated even then; only the persisted flag is stale.
    pub async fn stop_tracking(&mut self) -> Result<Vec<Event>, CoreError> {
        if self.tracker.is_active() {
            self.tracker.stop().await?;
        }
        self.session.set_tracking_active(false);

        let mut events = vec![Event::TrackingStopped { at: Utc::now() }];
        events.extend(self.dispatcher.sync_presentation(&self.session));
        self.store.set_tracking_requested(false)?;
        Ok(events)
    }

    // ── Observer ─────────────────────────────────────────────────────

    /// A foreground observer showed up; stop presenting in the background.
    pub fn attach_observer(&mut self) -> Option<Event> {
        self.session.set_observer_attached(true);
        self.dispatcher.sync_presentation(&self.session)
    }

    /// The observer went away; promote to foreground if still tracking.
    pub fn detach_observer(&mut self) -> Option<Event> {
        self.session.set_observer_attached(false);
        self.dispatcher.sync_presentation(&self.session)
    }

    // ── Samples ──────────────────────────────────────────────────────

    /// Evaluate one sample and dispatch any alert edge.
    ///
    /// An invalid sample yields `SampleRejected` and leaves the session
    /// as it was.
    pub fn process_sample(&mut self, sample: LocationSample) -> Vec<Event> {
        match self.session.observe(sample) {
            Ok(transition) => {
                tracing::debug!(
                    latitude = sample.latitude,
                    longitude = sample.longitude,
                    distance_m = ?transition.distance_m,
                    "new location"
                );
                let mut events = vec![Event::SampleRecorded {
                    sample,
                    distance_m: transition.distance_m,
                    state: transition.state.alert_state(),
                }];
                if let Some(effect) = transition.effect {
                    events.push(self.dispatcher.dispatch(effect, sample.timestamp));
                }
                events
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected location sample");
                vec![Event::SampleRejected {
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                    at: sample.timestamp,
                }]
            }
        }
    }

    /// Wait for the next sample and process it.
    ///
    /// Returns `None` when not tracking. When the source runs dry the
    /// session stops tracking and the final batch is `TrackingStopped`.
    pub async fn next_events(&mut self) -> Option<Vec<Event>> {
        if !self.tracker.is_active() {
            return None;
        }
        match self.tracker.next().await {
            Some(sample) => Some(self.process_sample(sample)),
            None => {
                self.session.set_tracking_active(false);
                let mut events = vec![Event::TrackingStopped { at: Utc::now() }];
                events.extend(self.dispatcher.sync_presentation(&self.session));
                Some(events)
            }
        }
    }

    /// Drive the session until tracking ends, handing every event to
    /// `on_event`.
    pub async fn run(&mut self, mut on_event: impl FnMut(&Event)) {
        while let Some(events) = self.next_events().await {
            for event in &events {
                on_event(event);
            }
        }
    }
}
