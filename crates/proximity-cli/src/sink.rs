//! Terminal presentation of alerts.

use std::io::Write;

use proximity_core::monitor::{Notification, Presentation};
use proximity_core::AlertSink;

/// Writes alerts to stderr; a terminal bell stands in for vibration.
pub struct TerminalSink;

impl TerminalSink {
    fn write(&self, prefix: &str, n: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        let mut err = std::io::stderr().lock();
        if n.vibrate_ms.is_some() {
            write!(err, "\x07")?;
        }
        writeln!(err, "[{prefix}] {} - {}", n.title, n.text)?;
        Ok(())
    }
}

impl AlertSink for TerminalSink {
    fn name(&self) -> &str {
        "terminal"
    }

    fn alert_raised(&mut self, n: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        self.write("TOO FAR", n)
    }

    fn alert_cleared(&mut self, n: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        self.write("BACK", n)
    }

    fn presentation_changed(
        &mut self,
        presentation: Presentation,
        notification: Option<&Notification>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match (presentation, notification) {
            (Presentation::Foreground, Some(n)) => self.write("ONGOING", n),
            _ => Ok(()),
        }
    }
}
