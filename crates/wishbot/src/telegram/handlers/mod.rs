//! Telegram bot handler tree configuration
//!
//! The same schema runs in production and can be driven by tests.

mod callbacks;
mod commands;
mod schema;
mod types;

pub use schema::schema;
pub use types::{identity_from_telegram, sync_sender, HandlerDeps, HandlerError};
