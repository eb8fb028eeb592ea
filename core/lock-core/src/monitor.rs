//! Activity and visibility monitoring.
//!
//! The monitor is the leaf of the lock pipeline: the host feeds it raw
//! interaction and visibility events, and it emits the signals the state
//! machine acts on. It deliberately does not trust host timers across
//! backgrounding; it records a wall-clock timestamp on the hidden
//! transition and reports the wall-clock delta on resume.

use chrono::{DateTime, Duration, Utc};

/// Interaction classes that count as user activity.
///
/// Every qualifying event refreshes the activity clock unconditionally;
/// there is no debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Pointer,
    Key,
    Touch,
    Scroll,
}

/// Raw events the host forwards from its event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    Interaction(InteractionKind),
    VisibilityChanged { hidden: bool },
}

/// Signals produced for the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorSignal {
    /// The user did something; refresh the activity clock.
    Activity,
    /// The app just went to background.
    WentHidden,
    /// The app just returned to foreground after spending
    /// `background_elapsed` of wall-clock time hidden.
    BecameVisible { background_elapsed: Duration },
}

/// Tracks visibility state and translates host events into signals.
#[derive(Debug)]
pub struct ActivityMonitor {
    hidden: bool,
    hidden_at: Option<DateTime<Utc>>,
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityMonitor {
    /// Creates a monitor that assumes the app starts in the foreground.
    pub fn new() -> Self {
        Self {
            hidden: false,
            hidden_at: None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Processes one host event, returning the signal to feed into the
    /// state machine. Repeated visibility events in the same direction
    /// produce no signal; only transitions do.
    pub fn observe(&mut self, event: MonitorEvent, now: DateTime<Utc>) -> Option<MonitorSignal> {
        match event {
            MonitorEvent::Interaction(_) => Some(MonitorSignal::Activity),
            MonitorEvent::VisibilityChanged { hidden } => {
                if hidden == self.hidden {
                    return None;
                }
                self.hidden = hidden;
                if hidden {
                    self.hidden_at = Some(now);
                    Some(MonitorSignal::WentHidden)
                } else {
                    let background_elapsed = self
                        .hidden_at
                        .take()
                        .map(|at| now.signed_duration_since(at))
                        .filter(|d| *d >= Duration::zero())
                        .unwrap_or_else(Duration::zero);
                    Some(MonitorSignal::BecameVisible { background_elapsed })
                }
            }
        }
    }
}
