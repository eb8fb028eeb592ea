//! Shared types for the app lock core.
//!
//! `LockSettings` is serialized camelCase to stay compatible with the
//! settings payload the host application already stores and ships to its
//! settings screens.

use serde::{Deserialize, Serialize};

/// Persisted lock configuration, loaded through the security backend.
///
/// The lock core only ever reads these; mutation happens through the
/// backend's `update_lock_settings` (driven by the settings UI, not by
/// the state machine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSettings {
    /// Whether the PIN lock is active at all.
    pub is_enabled: bool,
    /// Whether biometric unlock is offered in addition to the PIN.
    pub use_biometric: bool,
    /// Inactivity minutes before auto-lock. `0` disables the inactivity
    /// timer and means "lock after any time spent backgrounded".
    pub auto_lock_timeout: u32,
    /// Whether going to background locks immediately.
    pub lock_on_background: bool,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            is_enabled: false,
            use_biometric: false,
            auto_lock_timeout: 5,
            lock_on_background: true,
        }
    }
}

/// Biometric hardware reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricType {
    FaceId,
    TouchId,
    #[default]
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_backend_defaults() {
        let settings = LockSettings::default();
        assert!(!settings.is_enabled);
        assert!(!settings.use_biometric);
        assert_eq!(settings.auto_lock_timeout, 5);
        assert!(settings.lock_on_background);
    }

    #[test]
    fn settings_serialize_camel_case() {
        let json = serde_json::to_string(&LockSettings::default()).unwrap();
        assert!(json.contains("\"isEnabled\""));
        assert!(json.contains("\"useBiometric\""));
        assert!(json.contains("\"autoLockTimeout\""));
        assert!(json.contains("\"lockOnBackground\""));
    }

    #[test]
    fn biometric_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&BiometricType::FaceId).unwrap(),
            "\"face_id\""
        );
        assert_eq!(
            serde_json::to_string(&BiometricType::None).unwrap(),
            "\"none\""
        );
    }

    #[test]
    fn settings_round_trip_from_host_payload() {
        let json = r#"{"isEnabled":true,"useBiometric":true,"autoLockTimeout":15,"lockOnBackground":false}"#;
        let settings: LockSettings = serde_json::from_str(json).unwrap();
        assert!(settings.is_enabled);
        assert!(settings.use_biometric);
        assert_eq!(settings.auto_lock_timeout, 15);
        assert!(!settings.lock_on_background);
    }
}
