//! Error types for applock-core operations.
//! Keep variants coarse: the lock core maps most backend failures to safe
//! defaults instead of surfacing them (see the machine module).

/// All errors that can cross the security backend boundary.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// A backend operation failed (storage, keychain, biometric prompt).
    ///
    /// The machine never propagates this to callers of the unlock
    /// operations; it is mapped to a `false` verification result.
    #[error("Security backend call failed: {operation}: {details}")]
    Backend {
        operation: &'static str,
        details: String,
    },

    /// A PIN failed format validation (length or non-digit characters).
    #[error("Invalid PIN: {reason}")]
    InvalidPin { reason: String },
}

impl LockError {
    /// Shorthand for backend failures wrapping an arbitrary error.
    pub fn backend(operation: &'static str, err: impl std::fmt::Display) -> Self {
        LockError::Backend {
            operation,
            details: err.to_string(),
        }
    }
}

/// Convenience type alias for Results using LockError.
pub type Result<T> = std::result::Result<T, LockError>;
