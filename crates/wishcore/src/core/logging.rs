//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Startup configuration banner (never prints secrets)

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let level = if config::is_production() {
        LevelFilter::Info
    } else {
        LevelFilter::Debug
    };

    let log_config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("refinery_core")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(level, log_config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, log_config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// The bot token is reported only as set/unset.
pub fn log_startup_configuration() {
    log::info!("Starting {} v{}", config::PROJECT_NAME, config::VERSION);
    log::info!("Environment: {}", config::ENVIRONMENT.as_str());
    log::info!("Database: {}", config::DATABASE_PATH.as_str());
    log::info!("Web App URL: {}", config::WEB_APP_URL.as_str());

    if config::BOT_TOKEN.is_empty() {
        log::error!("BOT_TOKEN: not set - initData verification will reject every request");
    } else {
        log::info!("BOT_TOKEN: set");
    }

    if !config::web_app_enabled() {
        log::warn!("WEB_APP_URL is not https:// - Web App button and share links are disabled");
    }
}
