//! Wishcore - core library for the wish-list Telegram Mini-App
//!
//! Everything that does not talk to Telegram lives here: verification of the
//! signed initData payload, storage of users, wishes, groups and gift
//! reservations, configuration and logging.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging
//! - `auth`: initData verification and identity extraction
//! - `storage`: SQLite pool, migrations and per-table queries

pub mod auth;
pub mod core;
pub mod storage;

// Re-export commonly used types for convenience
pub use auth::{InitDataError, InitDataVerifier, TelegramIdentity};
pub use self::core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
