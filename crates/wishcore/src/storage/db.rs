use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::core::config;
use crate::core::AppResult;
use crate::storage::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Every connection enables foreign keys and a busy timeout. Schema
/// migrations run on the first connection before the pool is handed out.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use wishcore::storage;
///
/// let pool = storage::create_pool("wishlist.sqlite")?;
/// # Ok::<(), wishcore::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(config::database::busy_timeout())?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_functions(conn)
    });

    let pool = Pool::builder().max_size(config::database::POOL_MAX_SIZE).build(manager)?;

    let mut conn = pool.get()?;
    migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// SQLite's built-in `lower()` only folds ASCII; wish titles are mostly Cyrillic
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|s| s.to_lowercase()))
        },
    )
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    Ok(pool.get()?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::TelegramIdentity;
    use tempfile::TempDir;

    /// Pool over a fresh database file; keep the `TempDir` alive for the test
    pub fn test_pool() -> (TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    pub fn identity(id: i64, first_name: &str) -> TelegramIdentity {
        TelegramIdentity {
            id,
            username: None,
            first_name: first_name.to_string(),
            last_name: None,
            language_code: "ru".to_string(),
            is_premium: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_pool;
    use super::*;

    #[test]
    fn test_create_pool_applies_schema() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'wishes', 'wish_groups', 'group_members', 'reservations')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn test_foreign_keys_enabled_on_every_connection() {
        let (_dir, pool) = test_pool();
        let a = get_connection(&pool).unwrap();
        let b = get_connection(&pool).unwrap();
        for conn in [&a, &b] {
            let enabled: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
            assert_eq!(enabled, 1);
        }
    }

    #[test]
    fn test_unicode_lower_folds_cyrillic() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let folded: String = conn
            .query_row("SELECT unicode_lower('Новый ВЕЛОСИПЕД')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "новый велосипед");
    }

    #[test]
    fn test_reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("again.sqlite");
        let path = path.to_str().unwrap();
        drop(create_pool(path).unwrap());
        assert!(create_pool(path).is_ok());
    }
}
