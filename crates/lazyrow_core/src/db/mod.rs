//! Relational store boundary and SQLite adapter.
//!
//! # Responsibility
//! - Define the `Store` contract the record engine talks to.
//! - Materialize result rows as ordered column→value mappings.
//! - Open and configure SQLite connections.
//!
//! # Invariants
//! - Statements are always parameterized; values never reach SQL text.
//! - One `SqliteStore` owns exactly one connection and one open transaction
//!   at most. Concurrent callers are serialized by its internal lock, but a
//!   rollback still discards every uncommitted statement on that connection.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod row;
mod sqlite;

pub use open::{open_db, open_db_in_memory, open_db_with_options, StoreOptions};
pub use row::Row;
pub use rusqlite::types::Value;
pub use sqlite::SqliteStore;

pub type DbResult<T> = Result<T, DbError>;

/// Store failure surfaced to the record engine.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A previous holder of the connection lock panicked.
    LockPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "store connection lock poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::LockPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Minimal relational store client used by records and sessions.
///
/// Parameters bind to `?1..?N` placeholders in order. Implementations own
/// transaction boundaries: a write opens a transaction that stays open until
/// `commit` or `rollback`.
pub trait Store {
    /// Executes one statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize>;
    /// Runs a statement and returns its first row, if any.
    fn query_row(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>>;
    /// Runs a statement and returns every row in store order.
    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;
    /// Commits the open transaction. No-op without one.
    fn commit(&self) -> DbResult<()>;
    /// Rolls back the open transaction. No-op without one.
    fn rollback(&self) -> DbResult<()>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        (**self).execute(sql, params)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>> {
        (**self).query_row(sql, params)
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        (**self).query_rows(sql, params)
    }

    fn commit(&self) -> DbResult<()> {
        (**self).commit()
    }

    fn rollback(&self) -> DbResult<()> {
        (**self).rollback()
    }
}
