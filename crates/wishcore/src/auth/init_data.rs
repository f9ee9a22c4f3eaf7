//! Verification of Telegram Web App initData
//!
//! Telegram signs the initData query string with HMAC-SHA256. The HMAC key is
//! itself derived from the bot token: `HMAC_SHA256(key = "WebAppData", msg = bot_token)`.
//! The signed message is the data-check string: every field except `hash`,
//! sorted by key and joined as `key=value` lines.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::config;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 digest
const HASH_HEX_LEN: usize = 64;

/// Reasons an initData payload is rejected
///
/// Every variant is an authentication failure. Callers must translate all of
/// them into the same "unauthenticated" response; the kind is for logs only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitDataError {
    /// The payload is structurally invalid (duplicate keys, bad auth_date)
    #[error("malformed init data: {0}")]
    Malformed(String),

    /// No `hash` field
    #[error("hash not found in init data")]
    MissingSignature,

    /// `hash` does not match the payload
    #[error("init data signature mismatch")]
    InvalidSignature,

    /// `auth_date` is older than the allowed window
    #[error("init data is too old ({age_secs} seconds)")]
    Expired { age_secs: i64 },
}

impl InitDataError {
    /// Short stable label for log lines and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InitDataError::Malformed(_) => "malformed",
            InitDataError::MissingSignature => "missing_signature",
            InitDataError::InvalidSignature => "invalid_signature",
            InitDataError::Expired { .. } => "expired",
        }
    }
}

/// Fields of an initData payload whose signature and freshness were checked
///
/// Can only be obtained from [`InitDataVerifier::verify`]; `hash` is removed,
/// every other field is kept as the decoded string (`user` stays raw JSON).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInitData {
    fields: BTreeMap<String, String>,
}

impl ValidatedInitData {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Raw JSON of the `user` field, if present
    pub fn user_json(&self) -> Option<&str> {
        self.get("user")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

/// Verifier bound to one bot token
///
/// Holds the derived secret key, so the token is hashed once at startup. The
/// verifier is immutable and can be shared between request handlers behind an
/// `Arc` without locking.
#[derive(Debug)]
pub struct InitDataVerifier {
    secret_key: SecretSlice<u8>,
    max_age_secs: i64,
}

impl InitDataVerifier {
    /// Creates a verifier for `bot_token` with the default 1 hour window
    pub fn new(bot_token: &str) -> Self {
        Self::with_max_age(bot_token, config::auth::INIT_DATA_MAX_AGE_SECS)
    }

    pub fn with_max_age(bot_token: &str, max_age_secs: i64) -> Self {
        Self {
            secret_key: SecretSlice::from(derive_secret_key(bot_token)),
            max_age_secs,
        }
    }

    /// Verifies `init_data` against the current wall-clock time
    pub fn verify(&self, init_data: &str) -> Result<ValidatedInitData, InitDataError> {
        self.verify_at(init_data, chrono::Utc::now().timestamp())
    }

    /// Verifies `init_data` as if the current Unix time were `now`
    ///
    /// Payloads dated in the future are accepted.
    pub fn verify_at(&self, init_data: &str, now: i64) -> Result<ValidatedInitData, InitDataError> {
        let mut fields = parse_query(init_data)?;

        let received_hash = match fields.remove("hash") {
            Some(hash) if !hash.is_empty() => hash,
            _ => return Err(InitDataError::MissingSignature),
        };

        // Only well-formed lowercase hex can equal our hex digest; anything
        // else is a mismatch, not a parse failure.
        let is_lower_hex = received_hash.len() == HASH_HEX_LEN
            && received_hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !is_lower_hex {
            return Err(InitDataError::InvalidSignature);
        }
        let received = hex::decode(&received_hash).map_err(|_| InitDataError::InvalidSignature)?;

        // verify_slice compares in constant time
        self.mac_for(&fields)
            .verify_slice(&received)
            .map_err(|_| InitDataError::InvalidSignature)?;

        let auth_date = fields
            .get("auth_date")
            .ok_or_else(|| InitDataError::Malformed("auth_date is missing".to_string()))?
            .parse::<i64>()
            .map_err(|e| InitDataError::Malformed(format!("auth_date is not an integer: {}", e)))?;

        let age_secs = now.saturating_sub(auth_date);
        if age_secs > self.max_age_secs {
            return Err(InitDataError::Expired { age_secs });
        }

        Ok(ValidatedInitData { fields })
    }

    /// Hex-encoded signature of `fields` (which must not contain `hash`)
    pub fn sign(&self, fields: &BTreeMap<String, String>) -> String {
        hex::encode(self.mac_for(fields).finalize().into_bytes())
    }

    /// Encodes `fields` as a query string with a valid `hash` appended
    ///
    /// Produces exactly what a Telegram client would send; used by the
    /// `dev-init-data` command and by tests.
    pub fn encode_signed(&self, fields: &BTreeMap<String, String>) -> String {
        let hash = self.sign(fields);
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("hash", &hash);
        serializer.finish()
    }

    #[allow(clippy::expect_used)]
    fn mac_for(&self, fields: &BTreeMap<String, String>) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(self.secret_key.expose_secret()).expect("HMAC can take key of any size");
        mac.update(data_check_string(fields).as_bytes());
        mac
    }
}

/// Builds the data-check string: `key=value` lines sorted by key
///
/// `BTreeMap` iterates in byte-wise key order, which is exactly the order
/// Telegram signs in.
pub fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// HMAC_SHA256(key = "WebAppData", msg = bot_token), raw 32 bytes
#[allow(clippy::expect_used)]
fn derive_secret_key(bot_token: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(config::auth::WEB_APP_DATA_KEY).expect("HMAC can take key of any size");
    mac.update(bot_token.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Parses a query string into a map, rejecting repeated keys
fn parse_query(init_data: &str) -> Result<BTreeMap<String, String>, InitDataError> {
    let mut fields = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
        if key.is_empty() {
            return Err(InitDataError::Malformed("empty field name".to_string()));
        }
        match fields.entry(key.into_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into_owned());
            }
            Entry::Occupied(slot) => {
                return Err(InitDataError::Malformed(format!("duplicate field '{}'", slot.key())));
            }
        }
    }
    Ok(fields)
}
