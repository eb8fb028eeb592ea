//! Error types for applock-store operations.

/// All errors that can occur in the security store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {context}: {source}")]
    Sqlite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Settings payload malformed: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("PIN hashing failed: {source}")]
    Hash {
        #[source]
        source: bcrypt::BcryptError,
    },

    #[error("Invalid PIN: {reason}")]
    InvalidPin { reason: String },

    #[error("Current PIN is incorrect")]
    PinMismatch,

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine a data directory for the security store")]
    NoDataDir,
}

impl StoreError {
    pub fn sqlite(context: impl Into<String>, source: rusqlite::Error) -> Self {
        StoreError::Sqlite {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using StoreError.
pub type Result<T> = std::result::Result<T, StoreError>;
