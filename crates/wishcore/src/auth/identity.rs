//! Telegram identity carried in the `user` field of verified initData

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::init_data::ValidatedInitData;

/// Why no identity could be read from verified initData
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("user not found in init data")]
    MissingUser,

    #[error("invalid user JSON: {0}")]
    InvalidUser(#[from] serde_json::Error),
}

/// Authenticated Telegram account
///
/// Missing optional fields fall back to the defaults the frontend expects:
/// `first_name = "User"`, `language_code = "ru"`, `is_premium = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_first_name")]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default)]
    pub is_premium: bool,
}

fn default_first_name() -> String {
    "User".to_string()
}

fn default_language_code() -> String {
    "ru".to_string()
}

impl TelegramIdentity {
    /// Decodes the `user` JSON of a verified payload
    pub fn from_init_data(data: &ValidatedInitData) -> Result<Self, IdentityError> {
        let user_json = data.user_json().ok_or(IdentityError::MissingUser)?;
        Self::from_json(user_json)
    }

    pub fn from_json(user_json: &str) -> Result<Self, IdentityError> {
        Ok(serde_json::from_str(user_json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InitDataVerifier;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_defaults_for_missing_fields() {
        let identity = TelegramIdentity::from_json(r#"{"id":42}"#).unwrap();
        assert_eq!(
            identity,
            TelegramIdentity {
                id: 42,
                username: None,
                first_name: "User".to_string(),
                last_name: None,
                language_code: "ru".to_string(),
                is_premium: false,
            }
        );
    }

    #[test]
    fn test_full_user_with_unknown_fields() {
        let json = r#"{"id":279058397,"first_name":"Vladislav","last_name":"Kibenko","username":"vdkfrost",
            "language_code":"en","is_premium":true,"allows_write_to_pm":true,"photo_url":"https://t.me/i/u.svg"}"#;
        let identity = TelegramIdentity::from_json(json).unwrap();
        assert_eq!(identity.id, 279058397);
        assert_eq!(identity.username.as_deref(), Some("vdkfrost"));
        assert_eq!(identity.last_name.as_deref(), Some("Kibenko"));
        assert_eq!(identity.language_code, "en");
        assert!(identity.is_premium);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(matches!(
            TelegramIdentity::from_json(r#"{"first_name":"A"}"#),
            Err(IdentityError::InvalidUser(_))
        ));
        assert!(matches!(
            TelegramIdentity::from_json(r#"{"id":"42"}"#),
            Err(IdentityError::InvalidUser(_))
        ));
    }

    #[test]
    fn test_from_verified_init_data() {
        let verifier = InitDataVerifier::new("123:ABC");
        let mut fields = BTreeMap::new();
        fields.insert("auth_date".to_string(), "1700000000".to_string());
        let without_user = verifier.verify_at(&verifier.encode_signed(&fields), 1_700_000_000).unwrap();
        assert!(matches!(
            TelegramIdentity::from_init_data(&without_user),
            Err(IdentityError::MissingUser)
        ));

        fields.insert("user".to_string(), r#"{"id":7,"first_name":"A"}"#.to_string());
        let with_user = verifier.verify_at(&verifier.encode_signed(&fields), 1_700_000_000).unwrap();
        let identity = TelegramIdentity::from_init_data(&with_user).unwrap();
        assert_eq!(identity.id, 7);
        assert_eq!(identity.first_name, "A");
    }
}
