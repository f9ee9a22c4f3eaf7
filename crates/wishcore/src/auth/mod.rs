//! Mini-App authentication: initData verification and identity extraction

pub mod identity;
pub mod init_data;

// Re-exports for convenience
pub use identity::{IdentityError, TelegramIdentity};
pub use init_data::{data_check_string, InitDataError, InitDataVerifier, ValidatedInitData};
