//! Proximity evaluator.
//!
//! A pure transition function from `(home, prior state, sample)` to the
//! next state plus at most one alert effect. It keeps no clock and no
//! hidden state; the session owns the state and feeds it back in.
//!
//! ## State Transitions
//!
//! ```text
//! Uninitialized --(d <= T)--> Tracking(Near)
//! Uninitialized --(d >  T)--> Tracking(Far)    emits Raised
//! Tracking(Near) --(d >  T)--> Tracking(Far)   emits Raised
//! Tracking(Far)  --(d <= T)--> Tracking(Near)  emits Cleared
//! ```
//!
//! Alerts are edge-triggered: staying on the same side of the threshold
//! never emits twice.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::{distance_m, GeoPoint, LocationSample};

/// Default alert threshold in meters.
pub const DEFAULT_THRESHOLD_M: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Near,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", content = "alert", rename_all = "lowercase")]
pub enum EvaluatorState {
    /// No home yet, or no sample evaluated against the current home.
    #[default]
    Uninitialized,
    Tracking(AlertState),
}

impl EvaluatorState {
    pub fn alert_state(&self) -> Option<AlertState> {
        match self {
            EvaluatorState::Uninitialized => None,
            EvaluatorState::Tracking(s) => Some(*s),
        }
    }

    pub fn is_far(&self) -> bool {
        matches!(self, EvaluatorState::Tracking(AlertState::Far))
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum AlertEffect {
    Raised { distance_m: f64 },
    Cleared { distance_m: f64 },
}

/// Result of evaluating one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: EvaluatorState,
    /// Distance to home, `None` when no home is set.
    pub distance_m: Option<f64>,
    pub effect: Option<AlertEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityEvaluator {
    threshold_m: f64,
}

impl Default for ProximityEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_M)
    }
}

impl ProximityEvaluator {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Evaluate `sample` against `home` given the `prior` state.
    ///
    /// # Errors
    /// Returns `InvalidSample` for non-finite or out-of-range coordinates.
    pub fn evaluate(
        &self,
        home: Option<&GeoPoint>,
        prior: EvaluatorState,
        sample: &LocationSample,
    ) -> Result<Transition, ValidationError> {
        sample.validate()?;

        let Some(home) = home else {
            return Ok(Transition {
                state: prior,
                distance_m: None,
                effect: None,
            });
        };

        let d = distance_m(home, sample);
        let (state, effect) = if d > self.threshold_m {
            let effect = (!prior.is_far()).then_some(AlertEffect::Raised { distance_m: d });
            (AlertState::Far, effect)
        } else {
            let effect = prior.is_far().then_some(AlertEffect::Cleared { distance_m: d });
            (AlertState::Near, effect)
        };

        Ok(Transition {
            state: EvaluatorState::Tracking(state),
            distance_m: Some(d),
            effect,
        })
    }
}
