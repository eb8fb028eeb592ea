//! SQLite-backed security store implementing the lock core's backend
//! contract.
//!
//! PIN enrollment is a bcrypt hash in the `app_settings` table, stored
//! alongside the lock settings as one JSON payload under the
//! `lock_settings` key. A missing row reads as defaults (lock disabled),
//! so a fresh database needs no seeding.
//!
//! Biometric availability is a compile-time platform gate (only the
//! mobile targets have the hardware); actual prompting and the concrete
//! sensor type are platform shell plumbing, and mobile shells layer
//! their own `SecurityBackend` over this store for those.

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use applock_core::{BiometricType, LockError, LockSettings, SecurityBackend};

use crate::error::{Result, StoreError};
use crate::paths::default_db_path;

const SETTINGS_KEY: &str = "lock_settings";

/// On-disk settings payload: the host-visible settings plus the private
/// PIN hash, which never leaves this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(flatten)]
    settings: LockSettings,
    #[serde(default)]
    pin_hash: Option<String>,
}

/// The portable security backend: settings + PIN hash in SQLite.
pub struct SecurityStore {
    conn: Connection,
}

impl SecurityStore {
    /// Opens (or creates) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).map_err(|err| StoreError::Io {
                context: format!("Failed to create store directory {}", parent.display()),
                source: err,
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|err| StoreError::sqlite(format!("Failed to open {}", path.display()), err))?;
        tracing::debug!(path = %path.display(), "Opened security store");
        Self::with_connection(conn)
    }

    /// Opens the store at the default location (~/.applock/security.db).
    pub fn open_default() -> Result<Self> {
        let path = default_db_path().ok_or(StoreError::NoDataDir)?;
        Self::open(&path)
    }

    /// In-memory store, used by tests and ephemeral sessions.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| StoreError::sqlite("Failed to open in-memory store", err))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS app_settings (\
                 key TEXT PRIMARY KEY,\
                 value TEXT NOT NULL,\
                 updated_at TEXT NOT NULL\
             )",
            [],
        )
        .map_err(|err| StoreError::sqlite("Failed to create app_settings table", err))?;
        Ok(Self { conn })
    }

    fn load(&self) -> Result<StoredSettings> {
        let row: std::result::Result<String, rusqlite::Error> = self.conn.query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            [SETTINGS_KEY],
            |row| row.get(0),
        );
        match row {
            Ok(json) => serde_json::from_str(&json).map_err(|err| StoreError::Json {
                context: "Failed to parse stored lock settings".to_string(),
                source: err,
            }),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(StoredSettings::default()),
            Err(err) => Err(StoreError::sqlite("Failed to read lock settings", err)),
        }
    }

    fn save(&self, stored: &StoredSettings) -> Result<()> {
        let json = serde_json::to_string(stored).map_err(|err| StoreError::Json {
            context: "Failed to serialize lock settings".to_string(),
            source: err,
        })?;
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.conn
            .execute(
                "INSERT OR REPLACE INTO app_settings (key, value, updated_at)\
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![SETTINGS_KEY, json, now],
            )
            .map_err(|err| StoreError::sqlite("Failed to write lock settings", err))?;
        Ok(())
    }

    /// Enrolls a PIN (4-6 ASCII digits) and enables the lock.
    pub fn set_pin(&self, pin: &str) -> Result<()> {
        validate_pin(pin)?;
        let hash = bcrypt::hash(pin, bcrypt::DEFAULT_COST)
            .map_err(|err| StoreError::Hash { source: err })?;

        let mut stored = self.load()?;
        stored.settings.is_enabled = true;
        stored.pin_hash = Some(hash);
        self.save(&stored)
    }

    /// Checks a candidate PIN against the enrolled hash. No enrollment
    /// reads as a non-match, not an error.
    pub fn verify_pin(&self, pin: &str) -> Result<bool> {
        let stored = self.load()?;
        match &stored.pin_hash {
            Some(hash) => Ok(bcrypt::verify(pin, hash).unwrap_or(false)),
            None => Ok(false),
        }
    }

    /// Replaces the enrolled PIN after verifying the current one.
    pub fn change_pin(&self, old_pin: &str, new_pin: &str) -> Result<()> {
        if !self.verify_pin(old_pin)? {
            return Err(StoreError::PinMismatch);
        }
        self.set_pin(new_pin)
    }

    /// Clears the enrollment and disables the lock.
    pub fn remove_pin(&self) -> Result<()> {
        let mut stored = self.load()?;
        stored.settings.is_enabled = false;
        stored.pin_hash = None;
        self.save(&stored)
    }

    /// The lock counts as enabled only when the flag is set AND a PIN
    /// is actually enrolled; a dangling flag without a hash reads as
    /// disabled.
    pub fn is_enabled(&self) -> Result<bool> {
        let stored = self.load()?;
        Ok(stored.settings.is_enabled && stored.pin_hash.is_some())
    }

    /// The host-visible settings, without the PIN hash.
    pub fn settings(&self) -> Result<LockSettings> {
        Ok(self.load()?.settings)
    }

    /// Updates the adjustable settings. Only `use_biometric`,
    /// `auto_lock_timeout`, and `lock_on_background` are taken from the
    /// caller; `is_enabled` and the PIN hash are owned by the PIN
    /// operations and preserved as stored.
    pub fn update_settings(&self, settings: &LockSettings) -> Result<()> {
        let mut stored = self.load()?;
        stored.settings.use_biometric = settings.use_biometric;
        stored.settings.auto_lock_timeout = settings.auto_lock_timeout;
        stored.settings.lock_on_background = settings.lock_on_background;
        self.save(&stored)
    }
}

/// PINs are 4-6 ASCII digits, matching the lock screen's keypad.
fn validate_pin(pin: &str) -> Result<()> {
    let len = pin.len();
    if !(4..=6).contains(&len) {
        return Err(StoreError::InvalidPin {
            reason: "must be 4-6 digits".to_string(),
        });
    }
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(StoreError::InvalidPin {
            reason: "must contain only digits".to_string(),
        });
    }
    Ok(())
}

impl SecurityBackend for SecurityStore {
    fn is_lock_enabled(&self) -> applock_core::Result<bool> {
        self.is_enabled()
            .map_err(|err| LockError::backend("is_lock_enabled", err))
    }

    fn get_lock_settings(&self) -> applock_core::Result<LockSettings> {
        self.settings()
            .map_err(|err| LockError::backend("get_lock_settings", err))
    }

    fn update_lock_settings(&self, settings: &LockSettings) -> applock_core::Result<()> {
        self.update_settings(settings)
            .map_err(|err| LockError::backend("update_lock_settings", err))
    }

    fn verify_pin(&self, pin: &str) -> applock_core::Result<bool> {
        SecurityStore::verify_pin(self, pin).map_err(|err| LockError::backend("verify_pin", err))
    }

    fn set_pin(&self, pin: &str) -> applock_core::Result<()> {
        SecurityStore::set_pin(self, pin).map_err(|err| match err {
            StoreError::InvalidPin { reason } => LockError::InvalidPin { reason },
            other => LockError::backend("set_pin", other),
        })
    }

    fn change_pin(&self, old_pin: &str, new_pin: &str) -> applock_core::Result<()> {
        SecurityStore::change_pin(self, old_pin, new_pin).map_err(|err| match err {
            StoreError::InvalidPin { reason } => LockError::InvalidPin { reason },
            other => LockError::backend("change_pin", other),
        })
    }

    fn remove_pin(&self) -> applock_core::Result<()> {
        SecurityStore::remove_pin(self).map_err(|err| LockError::backend("remove_pin", err))
    }

    fn authenticate_biometric(&self) -> applock_core::Result<bool> {
        // No native prompt in the portable store; refuse rather than lie.
        Ok(false)
    }

    fn is_biometric_available(&self) -> applock_core::Result<bool> {
        // Platform capability gate only; biometric hardware exists on
        // the mobile targets. Prompting still needs the shell's layer.
        Ok(cfg!(any(target_os = "android", target_os = "ios")))
    }

    fn get_biometric_type(&self) -> applock_core::Result<BiometricType> {
        // The concrete sensor type comes from the shell's native query;
        // absent one, report none (the safe capability default).
        Ok(BiometricType::None)
    }
}
