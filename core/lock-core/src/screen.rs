//! Lock screen controller: PIN entry, brute-force lockout, biometric
//! triggers.
//!
//! The controller owns everything the lock screen needs that is not the
//! lock status itself: the PIN buffer, the failed-attempt counter, the
//! lockout window, and the in-flight guards. It reads the state machine
//! and calls its unlock operations but never mutates lock status
//! directly.
//!
//! Verification is split into begin/complete pairs so async hosts can
//! run the backend call off the UI turn; [`submit`] and the biometric
//! trigger helpers compose the pair for synchronous hosts. A completion
//! whose attempt is no longer current is discarded, never applied.
//!
//! [`submit`]: LockScreenController::submit

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::backend::SecurityBackend;
use crate::machine::LockStateMachine;

/// Maximum PIN length accepted into the buffer.
pub const MAX_PIN_LEN: usize = 6;
/// Minimum PIN length required to submit.
pub const MIN_PIN_LEN: usize = 4;

/// Consecutive failures at which the first lockout engages.
pub const LOCKOUT_THRESHOLD: u32 = 5;
/// Lockout applied by the failure that reaches the threshold exactly.
const SHORT_LOCKOUT_SECS: i64 = 30;
/// Lockout applied by every consecutive failure past the threshold.
const LONG_LOCKOUT_SECS: i64 = 5 * 60;

/// Host cadence for calling [`LockScreenController::tick`] while a
/// lockout countdown is showing.
pub const COUNTDOWN_TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// User-visible message state. Rendering is the host's concern; the
/// `Display` impl provides default English copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMessage {
    WrongPin,
    LockedOut,
    BiometricFailed,
}

impl fmt::Display for LockMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMessage::WrongPin => write!(f, "Wrong PIN"),
            LockMessage::LockedOut => write!(f, "Too many failed attempts"),
            LockMessage::BiometricFailed => {
                write!(f, "Biometric authentication failed. Enter your PIN")
            }
        }
    }
}

/// Keyboard input mirroring the on-screen keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Digit(char),
    Backspace,
    Enter,
}

/// A PIN verification the controller has handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinAttempt {
    pub id: u64,
    pub pin: String,
}

/// Result of completing a submit. `WrongPin` and `LockedOut` are the
/// cue for the host's shake/error-flash effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Unlocked,
    WrongPin { failed_attempts: u32 },
    LockedOut { until: DateTime<Utc> },
    /// The submit guards rejected the request (buffer too short, a
    /// verification already in flight, or an active lockout).
    Rejected,
    /// The completion arrived for an attempt that is no longer current
    /// and was discarded.
    Stale,
}

/// Owns PIN entry state and the brute-force lockout policy.
#[derive(Debug)]
pub struct LockScreenController {
    pin: String,
    message: Option<LockMessage>,
    is_verifying: bool,
    failed_attempts: u32,
    lockout_until: Option<DateTime<Utc>>,
    biometric_busy: bool,
    biometric_silent: bool,
    attempt_id: u64,
}

impl Default for LockScreenController {
    fn default() -> Self {
        Self::new()
    }
}

impl LockScreenController {
    pub fn new() -> Self {
        Self {
            pin: String::new(),
            message: None,
            is_verifying: false,
            failed_attempts: 0,
            lockout_until: None,
            biometric_busy: false,
            biometric_silent: false,
            attempt_id: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // PIN buffer
    // ─────────────────────────────────────────────────────────────────

    /// Appends a digit. Rejected while a verification is in flight,
    /// while locked out, when the buffer is full, or for non-digit
    /// input.
    pub fn press_digit(&mut self, digit: char, now: DateTime<Utc>) -> bool {
        if self.verification_in_flight() || self.is_locked_out(now) {
            return false;
        }
        if !digit.is_ascii_digit() || self.pin.len() >= MAX_PIN_LEN {
            return false;
        }
        self.pin.push(digit);
        self.message = None;
        true
    }

    /// Removes the last digit, under the same guards as entry.
    pub fn press_delete(&mut self, now: DateTime<Utc>) -> bool {
        if self.verification_in_flight() || self.is_locked_out(now) || self.pin.is_empty() {
            return false;
        }
        self.pin.pop();
        self.message = None;
        true
    }

    /// Routes a keyboard event through the same guards as the keypad.
    pub fn handle_key<B: SecurityBackend>(
        &mut self,
        key: KeyInput,
        machine: &mut LockStateMachine<B>,
        now: DateTime<Utc>,
    ) -> Option<SubmitOutcome> {
        match key {
            KeyInput::Digit(c) => {
                self.press_digit(c, now);
                None
            }
            KeyInput::Backspace => {
                self.press_delete(now);
                None
            }
            KeyInput::Enter => Some(self.submit(machine, now)),
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // PIN verification
    // ─────────────────────────────────────────────────────────────────

    /// Starts a verification if the guards allow it: buffer length at
    /// least [`MIN_PIN_LEN`], no verification (PIN or biometric)
    /// already in flight, no active lockout. Returns the attempt to
    /// verify, or `None` if rejected.
    pub fn begin_pin_attempt(&mut self, now: DateTime<Utc>) -> Option<PinAttempt> {
        if self.pin.len() < MIN_PIN_LEN
            || self.verification_in_flight()
            || self.is_locked_out(now)
        {
            return None;
        }
        self.is_verifying = true;
        self.message = None;
        self.attempt_id += 1;
        Some(PinAttempt {
            id: self.attempt_id,
            pin: self.pin.clone(),
        })
    }

    /// Applies a verification result. Results for attempts that are no
    /// longer current are discarded as [`SubmitOutcome::Stale`].
    ///
    /// A failure clears the buffer and escalates: below
    /// [`LOCKOUT_THRESHOLD`] only a message is shown; the failure that
    /// reaches the threshold exactly starts a 30-second lockout; every
    /// consecutive failure past it starts a 5-minute lockout. The
    /// counter resets only on success, never on lockout expiry, so
    /// repeated lockout cycles keep escalating.
    pub fn complete_pin_attempt(
        &mut self,
        id: u64,
        success: bool,
        now: DateTime<Utc>,
    ) -> SubmitOutcome {
        if id != self.attempt_id || !self.is_verifying {
            return SubmitOutcome::Stale;
        }
        self.is_verifying = false;
        self.pin.clear();

        if success {
            self.apply_unlock_success();
            return SubmitOutcome::Unlocked;
        }

        self.failed_attempts += 1;
        if self.failed_attempts < LOCKOUT_THRESHOLD {
            self.message = Some(LockMessage::WrongPin);
            return SubmitOutcome::WrongPin {
                failed_attempts: self.failed_attempts,
            };
        }

        let secs = if self.failed_attempts == LOCKOUT_THRESHOLD {
            SHORT_LOCKOUT_SECS
        } else {
            LONG_LOCKOUT_SECS
        };
        let until = now + Duration::seconds(secs);
        self.lockout_until = Some(until);
        self.message = Some(LockMessage::LockedOut);
        SubmitOutcome::LockedOut { until }
    }

    /// Synchronous submit: begin, verify against the machine, complete.
    pub fn submit<B: SecurityBackend>(
        &mut self,
        machine: &mut LockStateMachine<B>,
        now: DateTime<Utc>,
    ) -> SubmitOutcome {
        let Some(attempt) = self.begin_pin_attempt(now) else {
            return SubmitOutcome::Rejected;
        };
        let success = machine.unlock_with_pin(&attempt.pin, now);
        self.complete_pin_attempt(attempt.id, success, now)
    }

    // ─────────────────────────────────────────────────────────────────
    // Biometric
    // ─────────────────────────────────────────────────────────────────

    /// Claims the biometric busy-guard. Returns `false` (trigger
    /// dropped, not queued) when a PIN verification or another biometric
    /// attempt is already in flight. Lockout does NOT block biometric;
    /// it is not part of the PIN lockout policy.
    pub fn begin_biometric_attempt(&mut self, silent: bool) -> bool {
        if self.verification_in_flight() {
            return false;
        }
        self.biometric_busy = true;
        self.biometric_silent = silent;
        true
    }

    /// Applies a biometric result. Silent failures leave all state
    /// untouched (the user just stays on the PIN screen); manual
    /// failures surface a message directing the user to the PIN.
    /// Neither counts toward the PIN lockout.
    pub fn complete_biometric_attempt(&mut self, success: bool) -> bool {
        if !self.biometric_busy {
            return false;
        }
        self.biometric_busy = false;
        if success {
            self.apply_unlock_success();
        } else if !self.biometric_silent {
            self.message = Some(LockMessage::BiometricFailed);
        }
        success
    }

    /// Silent attempt used on mount and on each foreground regain.
    /// No-op unless the machine offers biometric unlock.
    pub fn auto_trigger_biometric<B: SecurityBackend>(
        &mut self,
        machine: &mut LockStateMachine<B>,
        now: DateTime<Utc>,
    ) -> bool {
        if !machine.biometric_unlock_offered() {
            return false;
        }
        if !self.begin_biometric_attempt(true) {
            return false;
        }
        let success = machine.unlock_with_biometric(now);
        self.complete_biometric_attempt(success)
    }

    /// Manual tap of the biometric button.
    pub fn request_biometric<B: SecurityBackend>(
        &mut self,
        machine: &mut LockStateMachine<B>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.begin_biometric_attempt(false) {
            return false;
        }
        let success = machine.unlock_with_biometric(now);
        self.complete_biometric_attempt(success)
    }

    // ─────────────────────────────────────────────────────────────────
    // Lockout countdown
    // ─────────────────────────────────────────────────────────────────

    /// One-second countdown tick. When the lockout expires this clears
    /// the window and the message but leaves `failed_attempts` alone.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if let Some(until) = self.lockout_until {
            if now >= until {
                self.lockout_until = None;
                self.message = None;
            }
        }
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| now < until)
    }

    /// Remaining lockout time, if a lockout window is active.
    pub fn remaining_lockout(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.lockout_until
            .filter(|until| now < *until)
            .map(|until| until.signed_duration_since(now))
    }

    /// Formatted remaining lockout time for display, if locked out.
    pub fn remaining_display(&self, now: DateTime<Utc>) -> Option<String> {
        self.remaining_lockout(now).map(format_lockout_remaining)
    }

    /// Only one verification request, PIN or biometric, may be in
    /// flight at a time; a second request is dropped, not queued.
    fn verification_in_flight(&self) -> bool {
        self.is_verifying || self.biometric_busy
    }

    fn apply_unlock_success(&mut self) {
        self.pin.clear();
        self.failed_attempts = 0;
        self.lockout_until = None;
        self.message = None;
    }

    // ─────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────

    /// Number of digits entered, for rendering the PIN dots.
    pub fn pin_len(&self) -> usize {
        self.pin.len()
    }

    pub fn can_submit(&self, now: DateTime<Utc>) -> bool {
        self.pin.len() >= MIN_PIN_LEN && !self.verification_in_flight() && !self.is_locked_out(now)
    }

    pub fn message(&self) -> Option<LockMessage> {
        self.message
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn is_verifying(&self) -> bool {
        self.is_verifying
    }

    pub fn lockout_until(&self) -> Option<DateTime<Utc>> {
        self.lockout_until
    }
}

/// Formats remaining lockout time as `M:SS` when at least a minute
/// remains, else `Ns`. Sub-second remainders round up so the display
/// never shows zero while entry is still disabled.
pub fn format_lockout_remaining(remaining: Duration) -> String {
    let ms = remaining.num_milliseconds().max(0);
    let secs = (ms + 999) / 1000;
    if secs >= 60 {
        format!("{}:{:02}", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
