//! Progress observers for the poll loop.
//!
//! Sinks are pure side effects: they must not panic, must not block the
//! loop beyond writing a line, and have no influence on termination.

use std::io::Write;

use crate::models::job::StatusSnapshot;

/// Receives every status snapshot the poll loop obtains, in poll order.
pub trait ProgressSink: Send + Sync {
    fn on_update(&self, snapshot: &StatusSnapshot);
}

/// Sink that ignores every update, for headless or quiet runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_update(&self, _snapshot: &StatusSnapshot) {}
}

/// Renders a single-line progress bar to stderr, overwritten in place on
/// each update and finished with a newline once the job goes terminal.
#[derive(Debug)]
pub struct ConsoleProgress {
    bar_width: usize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self { bar_width: 30 }
    }

    fn render(&self, snapshot: &StatusSnapshot) -> String {
        let percentage = snapshot.percentage.min(100) as usize;
        let filled = percentage * self.bar_width / 100;
        let mut line = format!(
            "\rProcessing |{}{}| {:>3}% | Status: {} | Stage: {}",
            "\u{2588}".repeat(filled),
            "\u{2591}".repeat(self.bar_width - filled),
            percentage,
            snapshot.state,
            snapshot.stage,
        );
        if snapshot.state.is_terminal() {
            line.push('\n');
        }
        line
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_update(&self, snapshot: &StatusSnapshot) {
        let line = self.render(snapshot);
        let mut stderr = std::io::stderr().lock();
        // Display failures must never surface into the poll loop.
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobState;

    #[test]
    fn test_render_pending_is_empty_bar() {
        let line = ConsoleProgress::new().render(&StatusSnapshot::pending());
        assert!(line.starts_with('\r'));
        assert!(line.contains("|\u{2591}"));
        assert!(!line.contains('\u{2588}'));
        assert!(line.contains("  0% | Status: Pending | Stage: Processing"));
    }

    #[test]
    fn test_render_running_fills_proportionally() {
        let line = ConsoleProgress::new().render(&StatusSnapshot::running(50, "Encoding"));
        assert_eq!(line.matches('\u{2588}').count(), 15);
        assert_eq!(line.matches('\u{2591}').count(), 15);
        assert!(line.contains(" 50% | Status: Running | Stage: Encoding"));
        assert!(!line.ends_with('\n'));
    }

    #[test]
    fn test_render_terminal_state_ends_the_line() {
        let line = ConsoleProgress::new().render(&StatusSnapshot::completed());
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_render_unknown_state_uses_wire_name() {
        let mut snapshot = StatusSnapshot::pending();
        snapshot.state = JobState::Other("Queued".to_string());
        let line = ConsoleProgress::new().render(&snapshot);
        assert!(line.contains("Status: Queued"));
    }

    #[test]
    fn test_null_sink_accepts_updates() {
        NullProgress.on_update(&StatusSnapshot::completed());
    }
}
