use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::config;
use crate::core::{AppError, AppResult};
use crate::storage::Assignments;

/// Lowest wish priority
pub const PRIORITY_LOW: i64 = 1;
/// Priority given to wishes created without one
pub const PRIORITY_MEDIUM: i64 = 2;
pub const PRIORITY_HIGH: i64 = 3;
/// Highest wish priority
pub const PRIORITY_URGENT: i64 = 4;

const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WishStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl ToSql for WishStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for WishStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Wish row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wish {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub priority: i64,
    pub status: WishStatus,
    pub order_index: i64,
    pub is_public: bool,
    /// Private to the owner
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub completed_at: Option<String>,
}

impl Wish {
    /// Price with its currency symbol, e.g. "1500.00 ₽"
    ///
    /// Unknown currencies are shown by their code. A missing or zero price
    /// reads "Не указана" ("not specified").
    pub fn formatted_price(&self) -> String {
        match self.price {
            Some(price) if price != 0.0 => {
                let symbol = match self.currency.as_str() {
                    "RUB" => "₽",
                    "USD" => "$",
                    "EUR" => "€",
                    other => other,
                };
                format!("{:.2} {}", price, symbol)
            }
            _ => "Не указана".to_string(),
        }
    }
}

/// Fields of a wish being created
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewWish {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "RUB".to_string()
}

fn default_priority() -> i64 {
    PRIORITY_MEDIUM
}

fn default_true() -> bool {
    true
}

impl NewWish {
    /// A wish with only a title; everything else takes its default
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            image_url: None,
            link: None,
            price: None,
            currency: default_currency(),
            priority: default_priority(),
            category_id: None,
            is_public: true,
            notes: None,
        }
    }

    /// Trims the title, upper-cases the currency and checks ranges
    pub fn validate(mut self) -> AppResult<Self> {
        self.title = validate_title(&self.title)?;
        self.currency = validate_currency(&self.currency)?;
        validate_priority(self.priority)?;
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(self)
    }
}

/// Partial wish update; `None` leaves the column untouched
///
/// The inner `Option` of nullable columns distinguishes "clear" from "keep".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WishUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub link: Option<Option<String>>,
    pub price: Option<Option<f64>>,
    pub currency: Option<String>,
    pub priority: Option<i64>,
    pub category_id: Option<Option<i64>>,
    pub status: Option<WishStatus>,
    pub is_public: Option<bool>,
    pub notes: Option<Option<String>>,
    pub order_index: Option<i64>,
}

impl WishUpdate {
    pub fn validate(mut self) -> AppResult<Self> {
        if let Some(title) = &self.title {
            self.title = Some(validate_title(title)?);
        }
        if let Some(currency) = &self.currency {
            self.currency = Some(validate_currency(currency)?);
        }
        if let Some(priority) = self.priority {
            validate_priority(priority)?;
        }
        if let Some(Some(price)) = self.price {
            validate_price(price)?;
        }
        Ok(self)
    }
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::validation(format!(
            "title must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(title.to_string())
}

fn validate_currency(currency: &str) -> AppResult<String> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation("currency must be a 3-letter code"));
    }
    Ok(currency.to_ascii_uppercase())
}

fn validate_priority(priority: i64) -> AppResult<()> {
    if !(PRIORITY_LOW..=PRIORITY_URGENT).contains(&priority) {
        return Err(AppError::validation(format!(
            "priority must be between {} and {}",
            PRIORITY_LOW, PRIORITY_URGENT
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("price must be a non-negative number"));
    }
    Ok(())
}

/// Filter and page of the owner's wish list
#[derive(Debug, Clone, PartialEq)]
pub struct WishFilter {
    pub status: WishStatus,
    pub category_id: Option<i64>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl Default for WishFilter {
    fn default() -> Self {
        Self {
            status: WishStatus::Active,
            category_id: None,
            search: None,
            page: 1,
            page_size: config::pagination::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of wishes plus totals for the pager
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WishPage {
    pub items: Vec<Wish>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

pub(crate) const WISH_COLUMNS: &str = "id, user_id, category_id, title, description, image_url, link, price,
     currency, priority, status, order_index, is_public, notes, created_at, updated_at, completed_at";

/// Ordering used by every wish listing
const WISH_ORDER: &str = "priority DESC, order_index ASC, created_at DESC, id DESC";

pub(crate) fn wish_from_row(row: &Row<'_>) -> rusqlite::Result<Wish> {
    Ok(Wish {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        image_url: row.get(5)?,
        link: row.get(6)?,
        price: row.get(7)?,
        currency: row.get(8)?,
        priority: row.get(9)?,
        status: row.get(10)?,
        order_index: row.get(11)?,
        is_public: row.get(12)?,
        notes: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        completed_at: row.get(16)?,
    })
}

pub fn create_wish(conn: &Connection, user_id: i64, wish: &NewWish) -> AppResult<Wish> {
    conn.execute(
        "INSERT INTO wishes (user_id, category_id, title, description, image_url, link, price,
                             currency, priority, is_public, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user_id,
            wish.category_id,
            wish.title,
            wish.description,
            wish.image_url,
            wish.link,
            wish.price,
            wish.currency,
            wish.priority,
            wish.is_public,
            wish.notes,
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("Created wish {} for user {}", id, user_id);

    get_wish(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
}

/// Any wish by id, regardless of owner
pub fn get_wish(conn: &Connection, wish_id: i64) -> AppResult<Option<Wish>> {
    let sql = format!("SELECT {} FROM wishes WHERE id = ?1", WISH_COLUMNS);
    Ok(conn.query_row(&sql, [wish_id], wish_from_row).optional()?)
}

/// The wish, only when `user_id` owns it
pub fn get_wish_for_owner(conn: &Connection, wish_id: i64, user_id: i64) -> AppResult<Option<Wish>> {
    let sql = format!("SELECT {} FROM wishes WHERE id = ?1 AND user_id = ?2", WISH_COLUMNS);
    Ok(conn.query_row(&sql, [wish_id, user_id], wish_from_row).optional()?)
}

/// Owner's wishes matching `filter`, one page at a time
pub fn list_wishes(conn: &Connection, user_id: i64, filter: &WishFilter) -> AppResult<WishPage> {
    if filter.page == 0 {
        return Err(AppError::validation("page must be at least 1"));
    }
    if filter.page_size == 0 || filter.page_size > config::pagination::MAX_PAGE_SIZE {
        return Err(AppError::validation(format!(
            "page_size must be between 1 and {}",
            config::pagination::MAX_PAGE_SIZE
        )));
    }

    let mut conditions = vec!["user_id = ?1".to_string(), "status = ?2".to_string()];
    let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id), Box::new(filter.status)];

    if let Some(category_id) = filter.category_id {
        values.push(Box::new(category_id));
        conditions.push(format!("category_id = ?{}", values.len()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        values.push(Box::new(search.to_lowercase()));
        conditions.push(format!("instr(unicode_lower(title), ?{}) > 0", values.len()));
    }

    let where_clause = conditions.join(" AND ");
    let bound: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM wishes WHERE {}", where_clause),
        bound.as_slice(),
        |row| row.get(0),
    )?;

    let limit = i64::from(filter.page_size);
    let offset = i64::from(filter.page - 1) * limit;
    let sql = format!(
        "SELECT {} FROM wishes WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
        WISH_COLUMNS, where_clause, WISH_ORDER, limit, offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(bound.as_slice(), wish_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WishPage {
        items,
        total,
        page: filter.page,
        page_size: filter.page_size,
        total_pages: (total + limit - 1) / limit,
    })
}

/// Applies `update` to the owner's wish and returns the stored row
///
/// Moving a wish to `completed` stamps `completed_at`, any other status
/// clears it.
pub fn update_wish(conn: &Connection, wish_id: i64, user_id: i64, update: &WishUpdate) -> AppResult<Option<Wish>> {
    if get_wish_for_owner(conn, wish_id, user_id)?.is_none() {
        return Ok(None);
    }

    let mut set = Assignments::default();
    if let Some(title) = &update.title {
        set.set("title", title.clone());
    }
    if let Some(description) = &update.description {
        set.set("description", description.clone());
    }
    if let Some(image_url) = &update.image_url {
        set.set("image_url", image_url.clone());
    }
    if let Some(link) = &update.link {
        set.set("link", link.clone());
    }
    if let Some(price) = update.price {
        set.set("price", price);
    }
    if let Some(currency) = &update.currency {
        set.set("currency", currency.clone());
    }
    if let Some(priority) = update.priority {
        set.set("priority", priority);
    }
    if let Some(category_id) = update.category_id {
        set.set("category_id", category_id);
    }
    if let Some(status) = update.status {
        set.set("status", status);
        if status == WishStatus::Completed {
            set.set_expr("completed_at", "CURRENT_TIMESTAMP");
        } else {
            set.set_expr("completed_at", "NULL");
        }
    }
    if let Some(is_public) = update.is_public {
        set.set("is_public", is_public);
    }
    if let Some(notes) = &update.notes {
        set.set("notes", notes.clone());
    }
    if let Some(order_index) = update.order_index {
        set.set("order_index", order_index);
    }
    set.execute(conn, "wishes", wish_id)?;

    get_wish(conn, wish_id)
}

/// Marks the owner's wish as fulfilled
pub fn complete_wish(conn: &Connection, wish_id: i64, user_id: i64) -> AppResult<Option<Wish>> {
    let update = WishUpdate {
        status: Some(WishStatus::Completed),
        ..Default::default()
    };
    update_wish(conn, wish_id, user_id, &update)
}

/// Deletes the owner's wish; reservations on it go with it
pub fn delete_wish(conn: &Connection, wish_id: i64, user_id: i64) -> AppResult<bool> {
    let deleted = conn.execute("DELETE FROM wishes WHERE id = ?1 AND user_id = ?2", [wish_id, user_id])?;
    if deleted > 0 {
        log::info!("Deleted wish {} of user {}", wish_id, user_id);
    }
    Ok(deleted > 0)
}

/// Active public wishes of a user, as other people see them
pub fn list_public_wishes(conn: &Connection, user_id: i64) -> AppResult<Vec<Wish>> {
    let sql = format!(
        "SELECT {} FROM wishes WHERE user_id = ?1 AND status = 'active' AND is_public = 1 ORDER BY {}",
        WISH_COLUMNS, WISH_ORDER
    );
    let mut stmt = conn.prepare(&sql)?;
    let wishes = stmt.query_map([user_id], wish_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(wishes)
}

pub fn count_active_wishes(conn: &Connection, user_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM wishes WHERE user_id = ?1 AND status = 'active'",
        [user_id],
        |row| row.get(0),
    )?)
}

/// First `limit` active wishes in list order, for chat previews
pub fn top_active_wishes(conn: &Connection, user_id: i64, limit: usize) -> AppResult<Vec<Wish>> {
    let sql = format!(
        "SELECT {} FROM wishes WHERE user_id = ?1 AND status = 'active' ORDER BY {} LIMIT ?2",
        WISH_COLUMNS, WISH_ORDER
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&sql)?;
    let wishes = stmt
        .query_map(params![user_id, limit], wish_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(wishes)
}
