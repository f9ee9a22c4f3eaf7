use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Application name reported by `/health` and the startup banner
pub const PROJECT_NAME: &str = "Wish List Bot";

/// Application version, taken from the crate manifest
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: wishlist.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "wishlist.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: wishlist.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "wishlist.log".to_string()));

/// Public URL of the Mini-App frontend
/// Read from WEB_APP_URL environment variable
///
/// Telegram only opens Web App buttons for https:// URLs, so a plain http URL
/// (local development) disables the Web App button and share links.
pub static WEB_APP_URL: Lazy<String> =
    Lazy::new(|| env::var("WEB_APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()));

/// Port of the HTTP API server
/// Read from API_PORT environment variable
/// Default: 8000
pub static API_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("API_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8000)
});

/// Deployment environment: "development" or "production"
/// Read from ENVIRONMENT environment variable
pub static ENVIRONMENT: Lazy<String> =
    Lazy::new(|| env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()));

/// Returns true when running with ENVIRONMENT=production
pub fn is_production() -> bool {
    ENVIRONMENT.as_str() == "production"
}

/// Returns true when the Mini-App is served over HTTPS
pub fn web_app_enabled() -> bool {
    WEB_APP_URL.starts_with("https://")
}

/// Mini-App authentication configuration
pub mod auth {
    /// Maximum age of a signed initData payload (in seconds)
    pub const INIT_DATA_MAX_AGE_SECS: i64 = 3600;

    /// Header carrying the raw initData string
    pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

    /// Constant key used to derive the HMAC secret from the bot token
    pub const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";
}

/// Pagination configuration
pub mod pagination {
    /// Page size used when the client does not ask for one
    pub const DEFAULT_PAGE_SIZE: u32 = 20;

    /// Largest page size a client may request
    pub const MAX_PAGE_SIZE: u32 = 100;
}

/// Database configuration
pub mod database {
    use super::Duration;

    /// Maximum number of pooled SQLite connections
    pub const POOL_MAX_SIZE: u32 = 10;

    /// How long a connection waits on a locked database (in seconds)
    pub const BUSY_TIMEOUT_SECS: u64 = 30;

    /// Busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

/// Bot front-end configuration
pub mod bot {
    /// Number of wishes shown by /list
    pub const LIST_PREVIEW_LIMIT: usize = 5;

    /// Wish descriptions longer than this are truncated in chat
    pub const DESCRIPTION_PREVIEW_CHARS: usize = 50;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
