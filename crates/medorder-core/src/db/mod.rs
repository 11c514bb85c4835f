//! Database layer for medorder.

mod audit;
mod leads;
mod notifications;
mod orders;
mod schema;
mod users;

pub use schema::*;

use rusqlite::types::Value;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise. Every `Database`
    /// method called from `f` joins the transaction. Must not be nested.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Database) -> Result<T, E>,
        E: From<DbError>,
    {
        let tx = self.conn.unchecked_transaction().map_err(DbError::from)?;
        let value = f(self)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

/// Incrementally built `WHERE` clause with positional arguments.
#[derive(Default)]
pub(crate) struct WhereClause {
    clauses: Vec<String>,
    args: Vec<Value>,
}

impl WhereClause {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, clause: &str, args: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.to_string());
        self.args.extend(args);
    }

    /// `" WHERE a AND b"`, or empty when no clause was pushed.
    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn args(&self) -> Vec<Value> {
        self.args.clone()
    }

    /// Arguments followed by `LIMIT ? OFFSET ?` values.
    pub(crate) fn paged_args(&self, limit: u32, offset: u64) -> Vec<Value> {
        let mut args = self.args.clone();
        args.push(Value::Integer(i64::from(limit)));
        args.push(Value::Integer(offset as i64));
        args
    }
}

/// `%term%` pattern for `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> Value {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Value::Text(format!("%{}%", escaped))
}

pub(crate) fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

/// Parse a stored enum string, reporting unknown values as a constraint error.
pub(crate) fn parse_stored<T>(value: &str, what: &str, parse: fn(&str) -> Option<T>) -> DbResult<T> {
    parse(value).ok_or_else(|| DbError::Constraint(format!("Unknown {}: {}", what, value)))
}
