//! Default storage locations for the security store.

use std::path::PathBuf;

/// Returns the applock data directory (~/.applock).
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".applock"))
}

/// Returns the default path of the security database.
pub fn default_db_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("security.db"))
}
