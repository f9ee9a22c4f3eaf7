//! Telegram bot front-end: commands and inline menus

pub mod bot;
pub mod handlers;
pub mod keyboards;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
