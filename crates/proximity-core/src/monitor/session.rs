use serde::{Deserialize, Serialize};

use super::evaluator::{AlertState, EvaluatorState, ProximityEvaluator, Transition};
use crate::error::ValidationError;
use crate::geo::{GeoPoint, LocationSample};

/// State of one monitoring session.
///
/// Owned by a single controlling context. Samples must be fed in arrival
/// order through [`MonitorSession::observe`]; it is the only path that
/// changes the alert state, which keeps `Far` tied to a recorded sample
/// that actually lies beyond the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSession {
    home: Option<GeoPoint>,
    last_sample: Option<LocationSample>,
    state: EvaluatorState,
    last_distance_m: Option<f64>,
    tracking_active: bool,
    observer_attached: bool,
    #[serde(skip)]
    evaluator: ProximityEvaluator,
}

impl MonitorSession {
    pub fn new(evaluator: ProximityEvaluator) -> Self {
        Self {
            home: None,
            last_sample: None,
            state: EvaluatorState::Uninitialized,
            last_distance_m: None,
            tracking_active: false,
            observer_attached: true,
            evaluator,
        }
    }

    pub fn with_home(evaluator: ProximityEvaluator, home: Option<GeoPoint>) -> Self {
        let mut session = Self::new(evaluator);
        session.home = home;
        session
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn home(&self) -> Option<&GeoPoint> {
        self.home.as_ref()
    }

    pub fn last_sample(&self) -> Option<&LocationSample> {
        self.last_sample.as_ref()
    }

    pub fn state(&self) -> EvaluatorState {
        self.state
    }

    /// `Near` until the first far sample; `Uninitialized` reads as `Near`.
    pub fn alert_state(&self) -> AlertState {
        self.state.alert_state().unwrap_or(AlertState::Near)
    }

    pub fn last_distance_m(&self) -> Option<f64> {
        self.last_distance_m
    }

    pub fn tracking_active(&self) -> bool {
        self.tracking_active
    }

    pub fn observer_attached(&self) -> bool {
        self.observer_attached
    }

    pub fn threshold_m(&self) -> f64 {
        self.evaluator.threshold_m()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace home. Alert state starts over against the new point.
    pub fn set_home(&mut self, home: GeoPoint) {
        self.home = Some(home);
        self.reset_alert();
    }

    /// Forget home. Returns the previous value.
    pub fn clear_home(&mut self) -> Option<GeoPoint> {
        self.reset_alert();
        self.home.take()
    }

    pub fn set_tracking_active(&mut self, active: bool) {
        self.tracking_active = active;
    }

    pub fn set_observer_attached(&mut self, attached: bool) {
        self.observer_attached = attached;
    }

    /// Record a sample and advance the alert state.
    ///
    /// # Errors
    /// `InvalidSample` leaves the session untouched.
    pub fn observe(&mut self, sample: LocationSample) -> Result<Transition, ValidationError> {
        let transition = self
            .evaluator
            .evaluate(self.home.as_ref(), self.state, &sample)?;
        self.last_sample = Some(sample);
        self.state = transition.state;
        self.last_distance_m = transition.distance_m;
        Ok(transition)
    }

    fn reset_alert(&mut self) {
        self.state = EvaluatorState::Uninitialized;
        self.last_distance_m = None;
    }
}

impl Default for MonitorSession {
    fn default() -> Self {
        Self::new(ProximityEvaluator::default())
    }
}
