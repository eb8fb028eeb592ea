//! The lock state machine: the authoritative gate over the app.
//!
//! Two states, `UNLOCKED` and `LOCKED`, for the lifetime of the process.
//! Lock transitions come from inactivity, backgrounding, or an explicit
//! force-lock; the only way back is a successful PIN or biometric
//! verification against the injected [`SecurityBackend`].
//!
//! Failure posture (deliberate, do not silently harden):
//! - Verification errors map to `false` — fail locked.
//! - Capability-probe errors degrade to PIN-only.
//! - A failed settings load at startup disables the lock entirely, so a
//!   backend fault cannot strand the user on an unopenable lock screen.
//!   This is the one fail-open path in the system.

use chrono::{DateTime, Duration, Utc};

use crate::backend::SecurityBackend;
use crate::error::Result;
use crate::monitor::MonitorSignal;
use crate::types::{BiometricType, LockSettings};

/// Host cadence for calling [`LockStateMachine::evaluate_auto_lock`].
pub const AUTO_LOCK_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

/// Owns the lock status and all transitions into and out of it.
///
/// Single-threaded by design; the host event loop serializes calls.
/// Callers read state through the accessors and never mutate it directly.
pub struct LockStateMachine<B: SecurityBackend> {
    backend: B,
    enabled: bool,
    settings: LockSettings,
    is_locked: bool,
    is_initializing: bool,
    last_activity: DateTime<Utc>,
    biometric_available: bool,
    biometric_type: BiometricType,
}

impl<B: SecurityBackend> LockStateMachine<B> {
    /// Creates an uninitialized machine. Nothing should render until
    /// [`initialize`](Self::initialize) completes, to avoid flashing
    /// unlocked content before the lock status is known.
    pub fn new(backend: B, now: DateTime<Utc>) -> Self {
        Self {
            backend,
            enabled: false,
            settings: LockSettings::default(),
            is_locked: false,
            is_initializing: true,
            last_activity: now,
            biometric_available: false,
            biometric_type: BiometricType::None,
        }
    }

    /// Loads lock status from the backend, locking immediately when the
    /// lock is enabled. Called exactly once at startup.
    pub fn initialize(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.load_status(true);
    }

    /// Re-reads settings and capability flags after an external settings
    /// change. Never sets the lock as a side effect, so toggling
    /// settings from an unlocked session cannot lock the user out.
    pub fn refresh_settings(&mut self) {
        self.load_status(false);
    }

    fn load_status(&mut self, should_lock: bool) {
        if let Err(err) = self.try_load_status(should_lock) {
            tracing::warn!(error = %err, "Failed to load lock status; disabling lock");
            self.enabled = false;
            self.settings = LockSettings::default();
            self.biometric_available = false;
            self.biometric_type = BiometricType::None;
            self.is_locked = false;
        }
        self.is_initializing = false;
    }

    fn try_load_status(&mut self, should_lock: bool) -> Result<()> {
        let enabled = self.backend.is_lock_enabled()?;

        // Capability probes degrade to PIN-only instead of failing the load.
        self.biometric_available = self.backend.is_biometric_available().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Biometric availability probe failed");
            false
        });
        self.biometric_type = self.backend.get_biometric_type().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Biometric type probe failed");
            BiometricType::None
        });

        self.enabled = enabled;
        if enabled {
            self.settings = self.backend.get_lock_settings()?;
            if should_lock {
                self.is_locked = true;
            }
        } else {
            self.settings = LockSettings::default();
            // Invariant: never locked while the lock is disabled.
            self.is_locked = false;
        }
        Ok(())
    }

    /// Refreshes the activity clock. Fed by the activity monitor.
    pub fn note_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Applies a monitor signal.
    ///
    /// Backgrounding locks immediately when `lock_on_background` is set.
    /// On resume, the wall-clock time spent hidden is compared against
    /// `auto_lock_timeout` (a `0` timeout means any time hidden locks),
    /// so correctness does not depend on host timers firing while
    /// backgrounded.
    pub fn handle_signal(&mut self, signal: MonitorSignal, now: DateTime<Utc>) {
        match signal {
            MonitorSignal::Activity => self.note_activity(now),
            MonitorSignal::WentHidden => {
                if self.enabled && self.settings.lock_on_background {
                    self.is_locked = true;
                }
            }
            MonitorSignal::BecameVisible { background_elapsed } => {
                if !self.enabled || self.is_locked {
                    return;
                }
                let timeout = self.settings.auto_lock_timeout;
                let exceeded = if timeout == 0 {
                    background_elapsed > Duration::zero()
                } else {
                    background_elapsed >= Duration::minutes(i64::from(timeout))
                };
                if exceeded {
                    self.is_locked = true;
                }
            }
        }
    }

    /// Inactivity check, called on the 10-second host poll while the
    /// lock is enabled and currently unlocked.
    pub fn evaluate_auto_lock(&mut self, now: DateTime<Utc>) {
        if !self.enabled || self.is_locked {
            return;
        }
        let timeout = self.settings.auto_lock_timeout;
        if timeout == 0 {
            // Inactivity auto-lock disabled; only background locking applies.
            return;
        }
        let idle = now.signed_duration_since(self.last_activity);
        if idle >= Duration::minutes(i64::from(timeout)) {
            self.is_locked = true;
        }
    }

    /// Verifies a PIN. Success clears the lock and refreshes the
    /// activity clock. Backend errors map to `false`; the caller cannot
    /// distinguish them from a wrong PIN.
    pub fn unlock_with_pin(&mut self, pin: &str, now: DateTime<Utc>) -> bool {
        match self.backend.verify_pin(pin) {
            Ok(true) => {
                self.is_locked = false;
                self.last_activity = now;
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::warn!(error = %err, "PIN verification failed");
                false
            }
        }
    }

    /// Runs the backend biometric check. Same success/failure semantics
    /// as [`unlock_with_pin`](Self::unlock_with_pin). The machine does
    /// not gate on capability here; the backend refuses if unsupported.
    pub fn unlock_with_biometric(&mut self, now: DateTime<Utc>) -> bool {
        match self.backend.authenticate_biometric() {
            Ok(true) => {
                self.is_locked = false;
                self.last_activity = now;
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::warn!(error = %err, "Biometric authentication failed");
                false
            }
        }
    }

    /// Locks unconditionally while the lock is enabled; no-op otherwise.
    /// Idempotent.
    pub fn force_lock(&mut self) {
        if self.enabled {
            self.is_locked = true;
        }
    }

    /// Returns the injected backend. Useful for hosts that also drive
    /// the enrollment operations (set/change/remove PIN) directly.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn is_initializing(&self) -> bool {
        self.is_initializing
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn biometric_available(&self) -> bool {
        self.biometric_available
    }

    pub fn biometric_type(&self) -> BiometricType {
        self.biometric_type
    }

    /// Whether the lock screen should offer the biometric button.
    pub fn biometric_unlock_offered(&self) -> bool {
        self.biometric_available && self.settings.use_biometric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LockError;

    struct FakeBackend {
        enabled: bool,
        settings: LockSettings,
        pin: &'static str,
        biometric_available: bool,
        biometric_type: BiometricType,
        biometric_accepts: bool,
        fail_load: bool,
        fail_capabilities: bool,
        fail_verify: bool,
    }

    impl FakeBackend {
        fn disabled() -> Self {
            Self {
                enabled: false,
                settings: LockSettings::default(),
                pin: "1234",
                biometric_available: false,
                biometric_type: BiometricType::None,
                biometric_accepts: false,
                fail_load: false,
                fail_capabilities: false,
                fail_verify: false,
            }
        }

        fn enabled() -> Self {
            Self {
                enabled: true,
                settings: LockSettings {
                    is_enabled: true,
                    use_biometric: false,
                    auto_lock_timeout: 5,
                    lock_on_background: true,
                },
                ..Self::disabled()
            }
        }

        fn err(operation: &'static str) -> LockError {
            LockError::Backend {
                operation,
                details: "fake failure".to_string(),
            }
        }
    }

    impl SecurityBackend for FakeBackend {
        fn is_lock_enabled(&self) -> crate::Result<bool> {
            if self.fail_load {
                return Err(Self::err("is_lock_enabled"));
            }
            Ok(self.enabled)
        }

        fn get_lock_settings(&self) -> crate::Result<LockSettings> {
            if self.fail_load {
                return Err(Self::err("get_lock_settings"));
            }
            Ok(self.settings.clone())
        }

        fn update_lock_settings(&self, _settings: &LockSettings) -> crate::Result<()> {
            Ok(())
        }

        fn verify_pin(&self, pin: &str) -> crate::Result<bool> {
            if self.fail_verify {
                return Err(Self::err("verify_pin"));
            }
            Ok(pin == self.pin)
        }

        fn set_pin(&self, _pin: &str) -> crate::Result<()> {
            Ok(())
        }

        fn change_pin(&self, _old_pin: &str, _new_pin: &str) -> crate::Result<()> {
            Ok(())
        }

        fn remove_pin(&self) -> crate::Result<()> {
            Ok(())
        }

        fn authenticate_biometric(&self) -> crate::Result<bool> {
            Ok(self.biometric_accepts)
        }

        fn is_biometric_available(&self) -> crate::Result<bool> {
            if self.fail_capabilities {
                return Err(Self::err("is_biometric_available"));
            }
            Ok(self.biometric_available)
        }

        fn get_biometric_type(&self) -> crate::Result<BiometricType> {
            if self.fail_capabilities {
                return Err(Self::err("get_biometric_type"));
            }
            Ok(self.biometric_type)
        }
    }

    fn init_machine(backend: FakeBackend) -> (LockStateMachine<FakeBackend>, DateTime<Utc>) {
        let now = Utc::now();
        let mut machine = LockStateMachine::new(backend, now);
        machine.initialize(now);
        (machine, now)
    }

    #[test]
    fn starts_initializing_until_first_load() {
        let machine = LockStateMachine::new(FakeBackend::enabled(), Utc::now());
        assert!(machine.is_initializing());
        assert!(!machine.is_locked());
    }

    #[test]
    fn initialize_locks_when_enabled() {
        let (machine, _) = init_machine(FakeBackend::enabled());
        assert!(!machine.is_initializing());
        assert!(machine.is_enabled());
        assert!(machine.is_locked());
    }

    #[test]
    fn initialize_stays_unlocked_when_disabled() {
        let (machine, _) = init_machine(FakeBackend::disabled());
        assert!(!machine.is_initializing());
        assert!(!machine.is_locked());
    }

    #[test]
    fn initialize_fails_open_on_backend_error() {
        let mut backend = FakeBackend::enabled();
        backend.fail_load = true;
        let (machine, _) = init_machine(backend);

        assert!(!machine.is_initializing());
        assert!(!machine.is_enabled());
        assert!(!machine.is_locked());
        assert_eq!(*machine.settings(), LockSettings::default());
    }

    #[test]
    fn capability_probe_errors_degrade_to_pin_only() {
        let mut backend = FakeBackend::enabled();
        backend.biometric_available = true;
        backend.biometric_type = BiometricType::FaceId;
        backend.fail_capabilities = true;
        let (machine, _) = init_machine(backend);

        assert!(machine.is_enabled(), "lock itself still loads");
        assert!(machine.is_locked());
        assert!(!machine.biometric_available());
        assert_eq!(machine.biometric_type(), BiometricType::None);
    }

    #[test]
    fn correct_pin_unlocks_and_refreshes_activity() {
        let (mut machine, now) = init_machine(FakeBackend::enabled());
        let later = now + Duration::seconds(30);

        assert!(machine.unlock_with_pin("1234", later));
        assert!(!machine.is_locked());
        assert_eq!(machine.last_activity(), later);
    }

    #[test]
    fn wrong_pin_leaves_machine_locked() {
        let (mut machine, now) = init_machine(FakeBackend::enabled());
        assert!(!machine.unlock_with_pin("0000", now));
        assert!(machine.is_locked());
    }

    #[test]
    fn verify_error_maps_to_false_and_stays_locked() {
        let mut backend = FakeBackend::enabled();
        backend.fail_verify = true;
        let (mut machine, now) = init_machine(backend);

        assert!(!machine.unlock_with_pin("1234", now));
        assert!(machine.is_locked());
    }

    #[test]
    fn biometric_success_unlocks() {
        let mut backend = FakeBackend::enabled();
        backend.biometric_accepts = true;
        let (mut machine, now) = init_machine(backend);

        assert!(machine.unlock_with_biometric(now));
        assert!(!machine.is_locked());
    }

    #[test]
    fn force_lock_is_idempotent() {
        let (mut machine, now) = init_machine(FakeBackend::enabled());
        assert!(machine.unlock_with_pin("1234", now));

        machine.force_lock();
        assert!(machine.is_locked());
        machine.force_lock();
        machine.force_lock();
        assert!(machine.is_locked());
    }

    #[test]
    fn force_lock_is_noop_when_disabled() {
        let (mut machine, _) = init_machine(FakeBackend::disabled());
        machine.force_lock();
        assert!(!machine.is_locked());
    }

    #[test]
    fn auto_lock_boundary_at_exact_timeout() {
        let (mut machine, now) = init_machine(FakeBackend::enabled());
        assert!(machine.unlock_with_pin("1234", now));

        // 299 seconds idle with a 5 minute timeout: still unlocked.
        machine.note_activity(now);
        machine.evaluate_auto_lock(now + Duration::seconds(299));
        assert!(!machine.is_locked());

        // 300 seconds idle: the next tick locks.
        machine.evaluate_auto_lock(now + Duration::seconds(300));
        assert!(machine.is_locked());
    }

    #[test]
    fn zero_timeout_disables_inactivity_auto_lock() {
        let mut backend = FakeBackend::enabled();
        backend.settings.auto_lock_timeout = 0;
        let (mut machine, now) = init_machine(backend);
        assert!(machine.unlock_with_pin("1234", now));

        machine.evaluate_auto_lock(now + Duration::hours(12));
        assert!(!machine.is_locked());
    }

    #[test]
    fn disabled_lock_never_locks_from_signals_or_timers() {
        let (mut machine, now) = init_machine(FakeBackend::disabled());

        machine.handle_signal(MonitorSignal::WentHidden, now);
        machine.handle_signal(
            MonitorSignal::BecameVisible {
                background_elapsed: Duration::hours(5),
            },
            now,
        );
        machine.evaluate_auto_lock(now + Duration::hours(5));
        machine.force_lock();

        assert!(!machine.is_locked());
    }

    #[test]
    fn background_transition_locks_immediately() {
        let (mut machine, now) = init_machine(FakeBackend::enabled());
        assert!(machine.unlock_with_pin("1234", now));

        machine.handle_signal(MonitorSignal::WentHidden, now);
        assert!(machine.is_locked());
    }

    #[test]
    fn background_lock_respects_lock_on_background_flag() {
        let mut backend = FakeBackend::enabled();
        backend.settings.lock_on_background = false;
        let (mut machine, now) = init_machine(backend);
        assert!(machine.unlock_with_pin("1234", now));

        machine.handle_signal(MonitorSignal::WentHidden, now);
        assert!(!machine.is_locked());
    }

    #[test]
    fn resume_after_long_background_locks_by_wall_clock() {
        let mut backend = FakeBackend::enabled();
        backend.settings.lock_on_background = false;
        let (mut machine, now) = init_machine(backend);
        assert!(machine.unlock_with_pin("1234", now));

        machine.handle_signal(
            MonitorSignal::BecameVisible {
                background_elapsed: Duration::minutes(6),
            },
            now,
        );
        assert!(machine.is_locked());
    }

    #[test]
    fn resume_after_short_background_stays_unlocked() {
        let mut backend = FakeBackend::enabled();
        backend.settings.lock_on_background = false;
        let (mut machine, now) = init_machine(backend);
        assert!(machine.unlock_with_pin("1234", now));

        machine.handle_signal(
            MonitorSignal::BecameVisible {
                background_elapsed: Duration::minutes(2),
            },
            now,
        );
        assert!(!machine.is_locked());
    }

    #[test]
    fn zero_timeout_locks_after_any_backgrounding() {
        let mut backend = FakeBackend::enabled();
        backend.settings.auto_lock_timeout = 0;
        backend.settings.lock_on_background = false;
        let (mut machine, now) = init_machine(backend);
        assert!(machine.unlock_with_pin("1234", now));

        machine.handle_signal(
            MonitorSignal::BecameVisible {
                background_elapsed: Duration::seconds(1),
            },
            now,
        );
        assert!(machine.is_locked());
    }

    #[test]
    fn refresh_settings_never_relocks() {
        let (mut machine, now) = init_machine(FakeBackend::enabled());
        assert!(machine.unlock_with_pin("1234", now));

        machine.refresh_settings();
        assert!(!machine.is_locked(), "refresh must not lock as a side effect");
        assert!(machine.is_enabled());
    }

    #[test]
    fn refresh_to_disabled_clears_lock() {
        let (mut machine, _) = init_machine(FakeBackend::enabled());
        assert!(machine.is_locked());

        machine.backend.enabled = false;
        machine.refresh_settings();
        assert!(!machine.is_enabled());
        assert!(!machine.is_locked());
    }

    #[test]
    fn biometric_offered_requires_capability_and_setting() {
        let mut backend = FakeBackend::enabled();
        backend.biometric_available = true;
        backend.settings.use_biometric = true;
        let (machine, _) = init_machine(backend);
        assert!(machine.biometric_unlock_offered());

        let mut backend = FakeBackend::enabled();
        backend.biometric_available = true;
        let (machine, _) = init_machine(backend);
        assert!(!machine.biometric_unlock_offered());
    }
}
