//! SQLite storage: connection pool, migrations and per-table queries

pub mod db;
pub mod groups;
pub mod migrations;
pub mod reservations;
pub mod users;
pub mod wishes;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};

use rusqlite::{Connection, ToSql};

/// Column assignments for a partial `UPDATE ... SET`
///
/// Only the fields a client actually sent end up in the statement. Values
/// are bound as `?2..`, `?1` is always the row id.
#[derive(Default)]
pub(crate) struct Assignments {
    clauses: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl Assignments {
    pub(crate) fn set<T: ToSql + 'static>(&mut self, column: &str, value: T) {
        self.values.push(Box::new(value));
        self.clauses.push(format!("{} = ?{}", column, self.values.len() + 1));
    }

    /// Assigns an SQL expression such as `CURRENT_TIMESTAMP` or `NULL`
    pub(crate) fn set_expr(&mut self, column: &str, expr: &'static str) {
        self.clauses.push(format!("{} = {}", column, expr));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Runs the update against `table` for the row `id`, stamping `updated_at`
    pub(crate) fn execute(self, conn: &Connection, table: &str, id: i64) -> rusqlite::Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {} SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
            table,
            self.clauses.join(", ")
        );
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(self.values.len() + 1);
        params.push(&id);
        params.extend(self.values.iter().map(|v| v.as_ref()));
        conn.execute(&sql, params.as_slice())
    }
}
