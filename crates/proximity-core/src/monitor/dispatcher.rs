//! Alert side-effect dispatch.
//!
//! The evaluator only decides *that* an alert edge happened. This module
//! turns edges into notifications for every registered [`AlertSink`] and
//! tracks how alerts are presented: inline to an attached observer, or
//! through an ongoing foreground notification once the observer is gone
//! and tracking is still active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evaluator::AlertEffect;
use super::session::MonitorSession;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    /// An observer is attached and shows state itself.
    Attached,
    /// No observer, tracking active: ongoing notification.
    Foreground,
    /// No observer and nothing to track.
    Hidden,
}

impl Presentation {
    pub fn for_session(session: &MonitorSession) -> Self {
        if session.observer_attached() {
            Presentation::Attached
        } else if session.tracking_active() {
            Presentation::Foreground
        } else {
            Presentation::Hidden
        }
    }
}

/// What a sink should show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub text: String,
    /// Stays until dismissed.
    pub ongoing: bool,
    /// Vibrate for this long, if at all.
    pub vibrate_ms: Option<u64>,
}

/// Receiver of alert side effects (vibration, notification, terminal bell).
pub trait AlertSink: Send {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Device crossed from near to far.
    fn alert_raised(&mut self, notification: &Notification) -> Result<(), Box<dyn std::error::Error>>;

    /// Device came back within the threshold.
    fn alert_cleared(
        &mut self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Presentation changed. `notification` is set when entering foreground.
    fn presentation_changed(
        &mut self,
        _presentation: Presentation,
        _notification: Option<&Notification>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(()) // default no-op
    }
}

/// Sink that reports through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn alert_raised(&mut self, n: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        tracing::warn!(title = %n.title, vibrate_ms = ?n.vibrate_ms, "{}", n.text);
        Ok(())
    }

    fn alert_cleared(&mut self, n: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(title = %n.title, "{}", n.text);
        Ok(())
    }

    fn presentation_changed(
        &mut self,
        presentation: Presentation,
        _notification: Option<&Notification>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(?presentation, "presentation changed");
        Ok(())
    }
}

/// Vibration settings applied to raised alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VibrationPolicy {
    pub enabled: bool,
    pub duration_ms: u64,
}

impl Default for VibrationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 3000,
        }
    }
}

pub struct Dispatcher {
    sinks: Vec<Box<dyn AlertSink>>,
    presentation: Presentation,
    vibration: VibrationPolicy,
}

impl Dispatcher {
    pub fn new(vibration: VibrationPolicy) -> Self {
        Self {
            sinks: Vec::new(),
            presentation: Presentation::Attached,
            vibration,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    /// Deliver an alert edge to every sink and return the matching event.
    ///
    /// Sink failures are logged and never abort the session.
    pub fn dispatch(&mut self, effect: AlertEffect, at: DateTime<Utc>) -> Event {
        let ongoing = self.presentation == Presentation::Foreground;
        match effect {
            AlertEffect::Raised { distance_m } => {
                let notification = Notification {
                    title: location_title(at),
                    text: distance_text(Some(distance_m)),
                    ongoing,
                    vibrate_ms: self.vibration.enabled.then_some(self.vibration.duration_ms),
                };
                for sink in &mut self.sinks {
                    if let Err(e) = sink.alert_raised(&notification) {
                        tracing::warn!(sink = sink.name(), error = %e, "alert sink failed");
                    }
                }
                Event::AlertRaised { distance_m, at }
            }
            AlertEffect::Cleared { distance_m } => {
                let notification = Notification {
                    title: location_title(at),
                    text: distance_text(Some(distance_m)),
                    ongoing,
                    vibrate_ms: None,
                };
                for sink in &mut self.sinks {
                    if let Err(e) = sink.alert_cleared(&notification) {
                        tracing::warn!(sink = sink.name(), error = %e, "alert sink failed");
                    }
                }
                Event::AlertCleared { distance_m, at }
            }
        }
    }

    /// Re-derive presentation from the session flags.
    ///
    /// Returns an event only when the presentation actually changed.
    pub fn sync_presentation(&mut self, session: &MonitorSession) -> Option<Event> {
        let next = Presentation::for_session(session);
        if next == self.presentation {
            return None;
        }
        self.presentation = next;

        let at = Utc::now();
        let notification = (next == Presentation::Foreground).then(|| Notification {
            title: location_title(at),
            text: distance_text(session.last_distance_m()),
            ongoing: true,
            vibrate_ms: None,
        });
        for sink in &mut self.sinks {
            if let Err(e) = sink.presentation_changed(next, notification.as_ref()) {
                tracing::warn!(sink = sink.name(), error = %e, "alert sink failed");
            }
        }
        Some(Event::PresentationChanged {
            presentation: next,
            at,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(VibrationPolicy::default())
    }
}

/// Notification body for a distance to home, truncated to whole meters.
pub fn distance_text(distance_m: Option<f64>) -> String {
    match distance_m {
        Some(d) => format!("{} m from home", d as i64),
        None => "Distance to home unknown".to_string(),
    }
}

/// Notification title stamped with the update time.
pub fn location_title(at: DateTime<Utc>) -> String {
    format!("Location updated: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))
}
