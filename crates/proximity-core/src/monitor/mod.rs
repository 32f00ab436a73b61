mod controller;
mod dispatcher;
mod evaluator;
mod session;

pub use controller::Monitor;
pub use dispatcher::{
    distance_text, location_title, AlertSink, Dispatcher, LogSink, Notification, Presentation,
    VibrationPolicy,
};
pub use evaluator::{
    AlertEffect, AlertState, EvaluatorState, ProximityEvaluator, Transition, DEFAULT_THRESHOLD_M,
};
pub use session::MonitorSession;
