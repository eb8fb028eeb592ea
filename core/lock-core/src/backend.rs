//! The security backend contract consumed by the lock state machine.
//!
//! The backend owns PIN storage/verification and biometric OS
//! integration; the lock core is a pure consumer of this surface. It is
//! injected into [`LockStateMachine::new`](crate::machine::LockStateMachine::new)
//! so tests substitute a fake without touching global state.

use crate::error::Result;
use crate::types::{BiometricType, LockSettings};

/// Operations the lock core needs from the platform security layer.
///
/// All calls are synchronous; async hosts wrap them at the boundary.
/// Failure mapping is the *caller's* job: the state machine maps
/// verification errors to `false` and capability errors to safe
/// defaults, so implementations should return honest errors rather than
/// pre-softening them.
pub trait SecurityBackend {
    /// Whether a lock PIN is enrolled and the lock is switched on.
    fn is_lock_enabled(&self) -> Result<bool>;

    /// The persisted lock settings.
    fn get_lock_settings(&self) -> Result<LockSettings>;

    /// Persists the adjustable lock settings. PIN enrollment and the
    /// enabled flag are owned by the PIN operations and untouched.
    fn update_lock_settings(&self, settings: &LockSettings) -> Result<()>;

    /// Checks a candidate PIN against the enrolled one.
    fn verify_pin(&self, pin: &str) -> Result<bool>;

    /// Enrolls a new PIN (4-6 ASCII digits) and enables the lock.
    fn set_pin(&self, pin: &str) -> Result<()>;

    /// Replaces the enrolled PIN after verifying the current one.
    fn change_pin(&self, old_pin: &str, new_pin: &str) -> Result<()>;

    /// Removes the enrolled PIN and disables the lock.
    fn remove_pin(&self) -> Result<()>;

    /// Prompts the OS biometric check. `Ok(false)` covers both a failed
    /// match and an unsupported platform.
    fn authenticate_biometric(&self) -> Result<bool>;

    /// Whether biometric hardware is present and enrolled.
    fn is_biometric_available(&self) -> Result<bool>;

    /// Which biometric hardware this device offers.
    fn get_biometric_type(&self) -> Result<BiometricType>;
}
