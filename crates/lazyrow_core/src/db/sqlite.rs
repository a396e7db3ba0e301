//! SQLite implementation of the `Store` contract.
//!
//! # Responsibility
//! - Execute parameterized statements on a single shared connection.
//! - Open a transaction lazily before the first write and expose
//!   commit/rollback on it.
//!
//! # Invariants
//! - Every call takes the connection lock, so statements from different
//!   threads never interleave mid-execution.
//! - Commit/rollback are no-ops while the connection is in autocommit mode.

use super::{DbError, DbResult, Row, Store};
use log::{debug, error, trace, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Statement};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Store backed by one `rusqlite::Connection`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wraps an already-configured connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs raw SQL (DDL or fixtures) outside the parameterized path.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    /// Returns whether a transaction is currently open.
    pub fn in_transaction(&self) -> DbResult<bool> {
        Ok(!self.lock()?.is_autocommit())
    }

    /// Releases the underlying connection.
    pub fn into_inner(self) -> DbResult<Connection> {
        self.conn.into_inner().map_err(|_| DbError::LockPoisoned)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }
}

impl Store for SqliteStore {
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let started_at = Instant::now();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        begin_if_writing(&conn, &stmt)?;
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        trace!(
            "event=db_execute module=store status=ok params={} changed={} duration_us={}",
            params.len(),
            changed,
            started_at.elapsed().as_micros()
        );
        Ok(changed)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>> {
        Ok(self.query_rows(sql, params)?.into_iter().next())
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let started_at = Instant::now();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        begin_if_writing(&conn, &stmt)?;

        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut images = Vec::new();
        while let Some(row) = rows.next()? {
            let mut image = Row::new();
            for (index, name) in names.iter().enumerate() {
                image.push(name.clone(), row.get::<_, Value>(index)?);
            }
            images.push(image);
        }

        trace!(
            "event=db_query module=store status=ok params={} rows={} duration_us={}",
            params.len(),
            images.len(),
            started_at.elapsed().as_micros()
        );
        Ok(images)
    }

    fn commit(&self) -> DbResult<()> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute_batch("COMMIT;")?;
        debug!("event=db_commit module=store status=ok");
        Ok(())
    }

    fn rollback(&self) -> DbResult<()> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            return Ok(());
        }
        match conn.execute_batch("ROLLBACK;") {
            Ok(()) => {
                warn!("event=db_rollback module=store status=ok");
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=db_rollback module=store status=error error_code=rollback_failed error={}",
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn begin_if_writing(conn: &Connection, stmt: &Statement<'_>) -> DbResult<()> {
    if !stmt.readonly() && conn.is_autocommit() {
        conn.execute_batch("BEGIN;")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::db::{Store, Value};
    use rusqlite::Connection;

    fn store() -> SqliteStore {
        let store = SqliteStore::new(Connection::open_in_memory().unwrap());
        store
            .execute_batch("CREATE TABLE item (item_id INTEGER PRIMARY KEY, item_name TEXT);")
            .unwrap();
        store
    }

    #[test]
    fn reads_do_not_open_a_transaction() {
        let store = store();
        store.query_rows("SELECT * FROM item;", &[]).unwrap();
        assert!(!store.in_transaction().unwrap());
    }

    #[test]
    fn writes_open_a_transaction_until_commit() {
        let store = store();
        store
            .execute(
                "INSERT INTO item (item_name) VALUES (?1);",
                &[Value::Text("a".to_string())],
            )
            .unwrap();
        assert!(store.in_transaction().unwrap());

        store.commit().unwrap();
        assert!(!store.in_transaction().unwrap());
    }

    #[test]
    fn rollback_discards_uncommitted_writes() {
        let store = store();
        store
            .execute(
                "INSERT INTO item (item_name) VALUES (?1);",
                &[Value::Text("gone".to_string())],
            )
            .unwrap();
        store.rollback().unwrap();

        let rows = store.query_rows("SELECT * FROM item;", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn query_rows_preserves_column_names_and_order() {
        let store = store();
        store
            .execute(
                "INSERT INTO item (item_name) VALUES (?1), (?2);",
                &[Value::Text("x".to_string()), Value::Text("y".to_string())],
            )
            .unwrap();

        let rows = store
            .query_rows("SELECT item_id, item_name FROM item ORDER BY item_id;", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].names().collect::<Vec<_>>(), vec!["item_id", "item_name"]);
        assert_eq!(rows[1].get("item_name"), Some(&Value::Text("y".to_string())));
    }

    #[test]
    fn commit_and_rollback_without_transaction_are_noops() {
        let store = store();
        store.commit().unwrap();
        store.rollback().unwrap();
    }
}
