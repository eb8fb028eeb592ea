//! # applock-core
//!
//! PIN-gated app lock core: activity/visibility monitoring, the lock
//! state machine, and the lock screen controller with brute-force
//! lockout escalation.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Clients can wrap the
//!   backend boundary with async if needed.
//! - **Not thread-safe**: Single-threaded, event-loop-driven. Clients
//!   provide their own synchronization if they need it.
//! - **Injected backend**: PIN storage/verification and biometric OS
//!   integration live behind [`SecurityBackend`], so tests substitute a
//!   fake and platforms plug in their own security layer.
//! - **Explicit time**: Time-sensitive operations take `now` as a
//!   parameter; no hidden clock reads in policy code.
//! - **Fail locked, not open**: Verification errors read as a wrong
//!   PIN. The single fail-open path is a settings load failure at
//!   startup, which disables the lock rather than stranding the user.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use applock_core::{LockStateMachine, LockScreenController, ActivityMonitor};
//!
//! let mut machine = LockStateMachine::new(backend, now);
//! machine.initialize(now);
//! let mut screen = LockScreenController::new();
//! if machine.is_locked() {
//!     screen.auto_trigger_biometric(&mut machine, now);
//! }
//! ```

pub mod backend;
pub mod error;
pub mod machine;
pub mod monitor;
pub mod screen;
pub mod types;

pub use backend::SecurityBackend;
pub use error::{LockError, Result};
pub use machine::{LockStateMachine, AUTO_LOCK_POLL_INTERVAL};
pub use monitor::{ActivityMonitor, InteractionKind, MonitorEvent, MonitorSignal};
pub use screen::{
    format_lockout_remaining, KeyInput, LockMessage, LockScreenController, PinAttempt,
    SubmitOutcome, COUNTDOWN_TICK_INTERVAL, LOCKOUT_THRESHOLD, MAX_PIN_LEN, MIN_PIN_LEN,
};
pub use types::{BiometricType, LockSettings};
