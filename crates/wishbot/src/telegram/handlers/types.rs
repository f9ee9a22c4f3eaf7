//! Handler types, dependencies, and sender synchronization

use std::sync::Arc;

use teloxide::types::Update;

use wishcore::storage::users::{self, User};
use wishcore::{get_connection, DbPool, TelegramIdentity};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    /// Mini-App URL used for Web App buttons and share links
    pub web_app_url: String,
}

impl HandlerDeps {
    pub fn new(db_pool: Arc<DbPool>, web_app_url: impl Into<String>) -> Self {
        Self {
            db_pool,
            web_app_url: web_app_url.into(),
        }
    }

    /// True when Telegram will accept Web App and share buttons
    pub fn web_app_enabled(&self) -> bool {
        self.web_app_url.starts_with("https://")
    }
}

/// Identity of a Telegram user as the bot sees it
///
/// Telegram omits `language_code` for some clients; those users get "ru".
pub fn identity_from_telegram(user: &teloxide::types::User) -> Option<TelegramIdentity> {
    let id = i64::try_from(user.id.0).ok()?;
    Some(TelegramIdentity {
        id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        language_code: user.language_code.clone().unwrap_or_else(|| "ru".to_string()),
        is_premium: user.is_premium,
    })
}

/// Creates or refreshes the sender of an update
///
/// Returns `None` for updates without a sender or when storage fails; the
/// update is then dropped.
pub fn sync_sender(deps: &HandlerDeps, update: &Update) -> Option<User> {
    let identity = identity_from_telegram(update.from()?)?;

    let conn = match get_connection(&deps.db_pool) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection for telegram_id {}: {}", identity.id, e);
            return None;
        }
    };

    match users::sync_user(&conn, &identity) {
        Ok(user) => Some(user),
        Err(e) => {
            log::error!("Failed to sync telegram_id {}: {}", identity.id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telegram_user(language_code: Option<&str>) -> teloxide::types::User {
        let mut json = serde_json::json!({
            "id": 777,
            "is_bot": false,
            "first_name": "Алиса",
            "username": "alice",
            "is_premium": true,
        });
        if let Some(code) = language_code {
            json["language_code"] = code.into();
        }
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_identity_from_telegram() {
        let identity = identity_from_telegram(&telegram_user(Some("en"))).unwrap();
        assert_eq!(identity.id, 777);
        assert_eq!(identity.first_name, "Алиса");
        assert_eq!(identity.username.as_deref(), Some("alice"));
        assert_eq!(identity.language_code, "en");
        assert!(identity.is_premium);
    }

    #[test]
    fn test_missing_language_defaults_to_ru() {
        let identity = identity_from_telegram(&telegram_user(None)).unwrap();
        assert_eq!(identity.language_code, "ru");
    }

    #[test]
    fn test_web_app_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let pool = wishcore::create_pool(dir.path().join("t.sqlite").to_str().unwrap()).unwrap();
        let pool = Arc::new(pool);
        assert!(HandlerDeps::new(pool.clone(), "https://wishes.example.com").web_app_enabled());
        assert!(!HandlerDeps::new(pool, "http://localhost:3000").web_app_enabled());
    }
}
