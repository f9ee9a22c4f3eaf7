use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::core::error::is_unique_violation;
use crate::core::{AppError, AppResult};
use crate::storage::groups::get_membership;
use crate::storage::wishes::{get_wish, WishStatus};

/// A gift claimed by a group member so others do not buy it too
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub id: i64,
    pub wish_id: i64,
    pub group_id: i64,
    pub reserved_by: i64,
    pub notes: Option<String>,
    pub reserved_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationWithDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub wish_title: String,
    pub wish_image_url: Option<String>,
    /// Display name of the wish's owner
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewReservation {
    pub wish_id: i64,
    pub group_id: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

const RESERVATION_COLUMNS: &str = "r.id, r.wish_id, r.group_id, r.reserved_by, r.notes, r.reserved_at";

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        wish_id: row.get(1)?,
        group_id: row.get(2)?,
        reserved_by: row.get(3)?,
        notes: row.get(4)?,
        reserved_at: row.get(5)?,
    })
}

/// Reserves a wish on behalf of `reserver_id` within a group
///
/// Both the reserver and the wish's owner must belong to the group, and the
/// wish must be active and public. A wish can be reserved once per group.
pub fn create_reservation(conn: &Connection, reserver_id: i64, new: &NewReservation) -> AppResult<Reservation> {
    if get_membership(conn, new.group_id, reserver_id)?.is_none() {
        return Err(AppError::forbidden("Not a member of this group"));
    }

    let wish = match get_wish(conn, new.wish_id)? {
        Some(wish) if wish.is_public => wish,
        _ => return Err(AppError::not_found("Wish not found")),
    };
    if wish.user_id == reserver_id {
        return Err(AppError::validation("You cannot reserve your own wish"));
    }
    if get_membership(conn, new.group_id, wish.user_id)?.is_none() {
        return Err(AppError::not_found("Wish not found"));
    }
    if wish.status != WishStatus::Active {
        return Err(AppError::validation("Only active wishes can be reserved"));
    }

    match conn.execute(
        "INSERT INTO reservations (wish_id, group_id, reserved_by, notes) VALUES (?1, ?2, ?3, ?4)",
        params![new.wish_id, new.group_id, reserver_id, new.notes],
    ) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("Wish is already reserved in this group".to_string()));
        }
        Err(e) => return Err(e.into()),
    }
    let id = conn.last_insert_rowid();
    log::info!(
        "User {} reserved wish {} in group {}",
        reserver_id,
        new.wish_id,
        new.group_id
    );

    get_reservation(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

fn get_reservation(conn: &Connection, reservation_id: i64) -> AppResult<Option<Reservation>> {
    let sql = format!("SELECT {} FROM reservations r WHERE r.id = ?1", RESERVATION_COLUMNS);
    Ok(conn.query_row(&sql, [reservation_id], reservation_from_row).optional()?)
}

/// Cancels a reservation; only the member who made it can
pub fn delete_reservation(conn: &Connection, reservation_id: i64, user_id: i64) -> AppResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM reservations WHERE id = ?1 AND reserved_by = ?2",
        [reservation_id, user_id],
    )?;
    if deleted > 0 {
        log::info!("User {} cancelled reservation {}", user_id, reservation_id);
    }
    Ok(deleted > 0)
}

/// Everything the user has reserved, newest first
pub fn list_user_reservations(conn: &Connection, user_id: i64) -> AppResult<Vec<ReservationWithDetails>> {
    let sql = format!(
        "SELECT {}, w.title, w.image_url, u.first_name, u.last_name
         FROM reservations r
         JOIN wishes w ON w.id = r.wish_id
         JOIN users u ON u.id = w.user_id
         WHERE r.reserved_by = ?1
         ORDER BY r.reserved_at DESC, r.id DESC",
        RESERVATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let reservations = stmt
        .query_map([user_id], |row| {
            let first_name: String = row.get(8)?;
            let last_name: Option<String> = row.get(9)?;
            Ok(ReservationWithDetails {
                reservation: reservation_from_row(row)?,
                wish_title: row.get(6)?,
                wish_image_url: row.get(7)?,
                user_name: match last_name {
                    Some(last) if !last.is_empty() => format!("{} {}", first_name, last),
                    _ => first_name,
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(reservations)
}

pub fn reservation_for_wish(conn: &Connection, wish_id: i64, group_id: i64) -> AppResult<Option<Reservation>> {
    let sql = format!(
        "SELECT {} FROM reservations r WHERE r.wish_id = ?1 AND r.group_id = ?2",
        RESERVATION_COLUMNS
    );
    Ok(conn.query_row(&sql, [wish_id, group_id], reservation_from_row).optional()?)
}
