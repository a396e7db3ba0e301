//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections wrapped as `SqliteStore`.
//! - Apply connection pragmas from `StoreOptions`.
//!
//! # Invariants
//! - Returned stores are in autocommit mode with no open transaction.
//! - Table creation is the caller's job; no schema is applied here.

use super::{DbResult, SqliteStore};
use log::{error, info};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Connection settings applied when a store is opened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Enables `PRAGMA foreign_keys`, so parent references are enforced.
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database file.
    pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Opens a SQLite database file with default options.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<SqliteStore> {
    open_db_with_options(path, &StoreOptions::default())
}

/// Opens a SQLite database file.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_with_options(
    path: impl AsRef<Path>,
    options: &StoreOptions,
) -> DbResult<SqliteStore> {
    open_with("file", options, || Connection::open(path))
}

/// Opens a private in-memory SQLite database with default options.
pub fn open_db_in_memory() -> DbResult<SqliteStore> {
    open_with("memory", &StoreOptions::default(), Connection::open_in_memory)
}

fn open_with(
    mode: &str,
    options: &StoreOptions,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<SqliteStore> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = configure_connection(&conn, options) {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_configure_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err.into());
    }

    info!(
        "event=db_open module=db status=ok mode={} foreign_keys={} duration_ms={}",
        mode,
        options.foreign_keys,
        started_at.elapsed().as_millis()
    );
    Ok(SqliteStore::new(conn))
}

fn configure_connection(conn: &Connection, options: &StoreOptions) -> rusqlite::Result<()> {
    let pragma = if options.foreign_keys {
        "PRAGMA foreign_keys = ON;"
    } else {
        "PRAGMA foreign_keys = OFF;"
    };
    conn.execute_batch(pragma)?;
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
    Ok(())
}
