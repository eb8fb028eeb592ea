//! # applock-store
//!
//! SQLite-backed [`SecurityBackend`](applock_core::SecurityBackend)
//! implementation for the app lock core: bcrypt-hashed PIN enrollment
//! and lock settings in a single `app_settings` table.
//!
//! This is the portable backend. Platform shells that have native
//! secure storage or biometric APIs wrap or replace it behind the same
//! trait; nothing in the lock core knows the difference.

pub mod error;
pub mod paths;
pub mod store;

pub use error::{Result, StoreError};
pub use paths::{data_dir, default_db_path};
pub use store::SecurityStore;
