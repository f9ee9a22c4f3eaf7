use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::auth::TelegramIdentity;
use crate::core::{AppError, AppResult};
use crate::storage::Assignments;

/// User row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub language_code: String,
    /// `YYYY-MM-DD`
    pub birthday: Option<String>,
    pub is_active: bool,
    pub is_premium: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl User {
    /// "First Last", or just the first name
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// "@username" when the user has one, otherwise the full name
    pub fn mention(&self) -> String {
        match &self.username {
            Some(username) if !username.is_empty() => format!("@{}", username),
            _ => self.full_name(),
        }
    }
}

/// Profile fields a user may edit; `None` leaves the column untouched
///
/// The inner `Option` of nullable columns distinguishes "clear" from "keep".
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub birthday: Option<Option<String>>,
    pub language_code: Option<String>,
}

impl UserUpdate {
    /// Trims names and checks that the birthday is a real `YYYY-MM-DD` date
    pub fn validate(mut self) -> AppResult<Self> {
        if let Some(first_name) = &self.first_name {
            let first_name = first_name.trim();
            if first_name.is_empty() {
                return Err(AppError::validation("first_name must not be empty"));
            }
            self.first_name = Some(first_name.to_string());
        }
        if let Some(Some(birthday)) = &self.birthday {
            if NaiveDate::parse_from_str(birthday, "%Y-%m-%d").is_err() {
                return Err(AppError::validation("birthday must be a YYYY-MM-DD date"));
            }
        }
        if let Some(language_code) = &self.language_code {
            if !(2..=10).contains(&language_code.len()) {
                return Err(AppError::validation("language_code must be 2 to 10 characters"));
            }
        }
        Ok(self)
    }
}

/// Per-user counters shown on the profile page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub wishes_count: i64,
    pub completed_wishes_count: i64,
    pub groups_count: i64,
}

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, avatar_url, language_code,
     birthday, is_active, is_premium, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        avatar_url: row.get(5)?,
        language_code: row.get(6)?,
        birthday: row.get(7)?,
        is_active: row.get(8)?,
        is_premium: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub fn get_user_by_id(conn: &Connection, user_id: i64) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [user_id], user_from_row).optional()?)
}

pub fn get_user_by_telegram_id(conn: &Connection, telegram_id: i64) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE telegram_id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [telegram_id], user_from_row).optional()?)
}

fn insert_user(conn: &Connection, identity: &TelegramIdentity) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (telegram_id, username, first_name, last_name, language_code, is_premium)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(telegram_id) DO NOTHING",
        params![
            identity.id,
            identity.username,
            identity.first_name,
            identity.last_name,
            identity.language_code,
            identity.is_premium,
        ],
    )?;
    Ok(())
}

/// Looks up the user for a verified identity, creating the row on first sight
///
/// Existing rows are returned as stored: profile edits made in the Mini-App
/// are not overwritten by the Telegram profile.
pub fn get_or_create_user(conn: &Connection, identity: &TelegramIdentity) -> AppResult<User> {
    if let Some(user) = get_user_by_telegram_id(conn, identity.id)? {
        return Ok(user);
    }

    insert_user(conn, identity)?;
    log::info!("Created user for telegram_id {}", identity.id);

    get_user_by_telegram_id(conn, identity.id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

/// Creates the user or refreshes username and names from Telegram
///
/// Used by the bot, where the sender's Telegram profile is authoritative.
pub fn sync_user(conn: &Connection, identity: &TelegramIdentity) -> AppResult<User> {
    insert_user(conn, identity)?;
    let changed = conn.execute(
        "UPDATE users
         SET username = ?2, first_name = ?3, last_name = ?4, updated_at = CURRENT_TIMESTAMP
         WHERE telegram_id = ?1
           AND (username IS NOT ?2 OR first_name IS NOT ?3 OR last_name IS NOT ?4)",
        params![identity.id, identity.username, identity.first_name, identity.last_name],
    )?;
    if changed > 0 {
        log::debug!("Refreshed Telegram profile of telegram_id {}", identity.id);
    }

    get_user_by_telegram_id(conn, identity.id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

/// Applies a profile update and returns the stored row
pub fn update_user_profile(conn: &Connection, user_id: i64, update: &UserUpdate) -> AppResult<Option<User>> {
    let mut set = Assignments::default();
    if let Some(first_name) = &update.first_name {
        set.set("first_name", first_name.clone());
    }
    if let Some(last_name) = &update.last_name {
        set.set("last_name", last_name.clone());
    }
    if let Some(avatar_url) = &update.avatar_url {
        set.set("avatar_url", avatar_url.clone());
    }
    if let Some(birthday) = &update.birthday {
        set.set("birthday", birthday.clone());
    }
    if let Some(language_code) = &update.language_code {
        set.set("language_code", language_code.clone());
    }
    set.execute(conn, "users", user_id)?;

    get_user_by_id(conn, user_id)
}

pub fn get_user_stats(conn: &Connection, user_id: i64) -> AppResult<UserStats> {
    Ok(conn.query_row(
        "SELECT
             (SELECT COUNT(*) FROM wishes WHERE user_id = ?1),
             (SELECT COUNT(*) FROM wishes WHERE user_id = ?1 AND status = 'completed'),
             (SELECT COUNT(*) FROM group_members WHERE user_id = ?1)",
        [user_id],
        |row| {
            Ok(UserStats {
                wishes_count: row.get(0)?,
                completed_wishes_count: row.get(1)?,
                groups_count: row.get(2)?,
            })
        },
    )?)
}
