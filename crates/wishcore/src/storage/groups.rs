use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::error::is_unique_violation;
use crate::core::{AppError, AppResult};
use crate::storage::wishes::{wish_from_row, Wish};
use crate::storage::Assignments;

const NAME_MAX_CHARS: usize = 100;

/// Attempts at drawing an invite code that is not taken yet
const INVITE_CODE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupRole {
    Owner,
    Admin,
    #[default]
    Member,
}

impl GroupRole {
    /// Owners and admins may edit the group
    pub fn can_manage(self) -> bool {
        matches!(self, GroupRole::Owner | GroupRole::Admin)
    }
}

impl ToSql for GroupRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for GroupRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub creator_id: i64,
    pub invite_code: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: Group,
    pub member_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub role: GroupRole,
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberWithUser {
    #[serde(flatten)]
    pub member: GroupMember,
    pub user_name: String,
    pub user_avatar: Option<String>,
}

/// A member's wish as seen from inside a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupWish {
    #[serde(flatten)]
    pub wish: Wish,
    pub owner_name: String,
    pub is_reserved: bool,
    pub reserved_by: Option<i64>,
    pub reservation_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl NewGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            avatar_url: None,
        }
    }

    pub fn validate(mut self) -> AppResult<Self> {
        self.name = validate_name(&self.name)?;
        Ok(self)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

impl GroupUpdate {
    pub fn validate(mut self) -> AppResult<Self> {
        if let Some(name) = &self.name {
            self.name = Some(validate_name(name)?);
        }
        Ok(self)
    }
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(AppError::validation(format!(
            "name must be at most {} characters",
            NAME_MAX_CHARS
        )));
    }
    Ok(name.to_string())
}

/// 12 random bytes as 16 URL-safe base64 characters
pub fn generate_invite_code() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 12]>())
}

const GROUP_COLUMNS: &str =
    "g.id, g.name, g.description, g.avatar_url, g.creator_id, g.invite_code, g.is_active, g.created_at, g.updated_at";

const MEMBER_COLUMNS: &str = "m.id, m.group_id, m.user_id, m.role, m.joined_at";

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        avatar_url: row.get(3)?,
        creator_id: row.get(4)?,
        invite_code: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<GroupMember> {
    Ok(GroupMember {
        id: row.get(0)?,
        group_id: row.get(1)?,
        user_id: row.get(2)?,
        role: row.get(3)?,
        joined_at: row.get(4)?,
    })
}

/// Creates a group and makes its creator the owner
///
/// Both rows are written in one transaction.
pub fn create_group(conn: &Connection, creator_id: i64, group: &NewGroup) -> AppResult<Group> {
    let tx = conn.unchecked_transaction()?;

    let mut attempt = 0;
    let group_id = loop {
        attempt += 1;
        let inserted = tx.execute(
            "INSERT INTO wish_groups (name, description, avatar_url, creator_id, invite_code)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                group.name,
                group.description,
                group.avatar_url,
                creator_id,
                generate_invite_code()
            ],
        );
        match inserted {
            Ok(_) => break tx.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) && attempt < INVITE_CODE_ATTEMPTS => {
                log::warn!("Invite code collision, drawing a new one");
            }
            Err(e) => return Err(e.into()),
        }
    };

    tx.execute(
        "INSERT INTO group_members (group_id, user_id, role) VALUES (?1, ?2, ?3)",
        params![group_id, creator_id, GroupRole::Owner],
    )?;
    tx.commit()?;
    log::info!("User {} created group {}", creator_id, group_id);

    get_group(conn, group_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

pub fn get_group(conn: &Connection, group_id: i64) -> AppResult<Option<Group>> {
    let sql = format!("SELECT {} FROM wish_groups g WHERE g.id = ?1", GROUP_COLUMNS);
    Ok(conn.query_row(&sql, [group_id], group_from_row).optional()?)
}

/// Groups the user belongs to, newest first
pub fn list_user_groups(conn: &Connection, user_id: i64) -> AppResult<Vec<GroupWithMembers>> {
    let sql = format!(
        "SELECT {}, (SELECT COUNT(*) FROM group_members c WHERE c.group_id = g.id)
         FROM wish_groups g
         JOIN group_members m ON m.group_id = g.id
         WHERE m.user_id = ?1
         ORDER BY g.created_at DESC, g.id DESC",
        GROUP_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let groups = stmt
        .query_map([user_id], |row| {
            Ok(GroupWithMembers {
                group: group_from_row(row)?,
                member_count: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

pub fn get_membership(conn: &Connection, group_id: i64, user_id: i64) -> AppResult<Option<GroupMember>> {
    let sql = format!(
        "SELECT {} FROM group_members m WHERE m.group_id = ?1 AND m.user_id = ?2",
        MEMBER_COLUMNS
    );
    Ok(conn.query_row(&sql, [group_id, user_id], member_from_row).optional()?)
}

pub fn update_group(conn: &Connection, group_id: i64, update: &GroupUpdate) -> AppResult<Option<Group>> {
    let mut set = Assignments::default();
    if let Some(name) = &update.name {
        set.set("name", name.clone());
    }
    if let Some(description) = &update.description {
        set.set("description", description.clone());
    }
    if let Some(avatar_url) = &update.avatar_url {
        set.set("avatar_url", avatar_url.clone());
    }
    set.execute(conn, "wish_groups", group_id)?;

    get_group(conn, group_id)
}

/// Adds the user to an active group whose invite code matches
pub fn join_group(conn: &Connection, group_id: i64, user_id: i64, invite_code: &str) -> AppResult<GroupMember> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM wish_groups WHERE id = ?1 AND invite_code = ?2 AND is_active = 1",
            params![group_id, invite_code],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(AppError::not_found("Group not found or invalid invite code"));
    }

    if get_membership(conn, group_id, user_id)?.is_some() {
        return Err(AppError::validation("Already a member of this group"));
    }

    match conn.execute(
        "INSERT INTO group_members (group_id, user_id, role) VALUES (?1, ?2, ?3)",
        params![group_id, user_id, GroupRole::Member],
    ) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::validation("Already a member of this group"));
        }
        Err(e) => return Err(e.into()),
    }
    log::info!("User {} joined group {}", user_id, group_id);

    get_membership(conn, group_id, user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

/// Members in join order, with display names
pub fn list_members(conn: &Connection, group_id: i64) -> AppResult<Vec<MemberWithUser>> {
    let sql = format!(
        "SELECT {}, u.first_name, u.last_name, u.avatar_url
         FROM group_members m
         JOIN users u ON u.id = m.user_id
         WHERE m.group_id = ?1
         ORDER BY m.joined_at ASC, m.id ASC",
        MEMBER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let members = stmt
        .query_map([group_id], |row| {
            Ok(MemberWithUser {
                member: member_from_row(row)?,
                user_name: display_name(row.get(5)?, row.get(6)?),
                user_avatar: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

fn display_name(first_name: String, last_name: Option<String>) -> String {
    match last_name {
        Some(last) if !last.is_empty() => format!("{} {}", first_name, last),
        _ => first_name,
    }
}

/// Active public wishes of every member, with this group's reservations
///
/// The viewer never learns whether their own wishes are reserved, and
/// private notes stay with their owners and reservers.
pub fn list_group_wishes(conn: &Connection, group_id: i64, viewer_id: i64) -> AppResult<Vec<GroupWish>> {
    let columns = crate::storage::wishes::WISH_COLUMNS
        .split(',')
        .map(|c| format!("w.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {}, u.first_name, u.last_name, r.reserved_by, r.notes
         FROM wishes w
         JOIN group_members m ON m.user_id = w.user_id AND m.group_id = ?1
         JOIN users u ON u.id = w.user_id
         LEFT JOIN reservations r ON r.wish_id = w.id AND r.group_id = ?1
         WHERE w.status = 'active' AND w.is_public = 1
         ORDER BY w.priority DESC, w.created_at DESC, w.id DESC",
        columns
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([group_id], |row| {
        let wish = wish_from_row(row)?;
        let owner_name = display_name(row.get(17)?, row.get(18)?);
        let reserved_by: Option<i64> = row.get(19)?;
        let reservation_notes: Option<String> = row.get(20)?;
        Ok((wish, owner_name, reserved_by, reservation_notes))
    })?;

    let mut wishes = Vec::new();
    for row in rows {
        let (mut wish, owner_name, reserved_by, reservation_notes) = row?;
        let own_wish = wish.user_id == viewer_id;
        if !own_wish {
            wish.notes = None;
        }
        let (reserved_by, reservation_notes) = if own_wish { (None, None) } else { (reserved_by, reservation_notes) };
        let reservation_notes = reservation_notes.filter(|_| reserved_by == Some(viewer_id));
        wishes.push(GroupWish {
            wish,
            owner_name,
            is_reserved: reserved_by.is_some(),
            reserved_by,
            reservation_notes,
        });
    }
    Ok(wishes)
}
