//! Explicit store + registry context shared by records.
//!
//! # Responsibility
//! - Own the store handle and the validated type registry for one process
//!   or unit of work.
//! - Create records by table name or `Entity` type, and list whole tables.
//! - Turn store failures into a rollback plus `RecordError::Db`.
//!
//! # Invariants
//! - The registry is validated before the session exists and never changes.
//! - All records created from a session share its single transaction; a
//!   rollback triggered by one record discards every uncommitted write.
//! - A session is not `Sync`. Sharing one connection across threads needs a
//!   store that serializes access, and callers must still serialize their
//!   save/delete sequences to keep transactions from interleaving.

use crate::db::{DbResult, Store};
use crate::query;
use crate::record::{Record, RecordError, RecordResult};
use crate::registry::{Entity, TypeRegistry};
use crate::schema::{Schema, SchemaError};
use log::warn;
use std::sync::Arc;

/// Connection context passed to every record.
pub struct Session {
    store: Box<dyn Store>,
    registry: TypeRegistry,
}

impl Session {
    /// Validates `registry` and binds it to `store`.
    pub fn new(store: impl Store + 'static, registry: TypeRegistry) -> Result<Self, SchemaError> {
        registry.validate()?;
        Ok(Self {
            store: Box::new(store),
            registry,
        })
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn schema(&self, table: &str) -> RecordResult<Arc<Schema>> {
        self.registry
            .schema(table)
            .cloned()
            .ok_or_else(|| RecordError::UnknownType(table.to_string()))
    }

    /// Unsaved record of `table`.
    pub fn new_record(&self, table: &str) -> RecordResult<Record<'_>> {
        Ok(Record::new(self, self.schema(table)?, None))
    }

    /// Record of `table` with a known identifier. The row is fetched on first
    /// access.
    pub fn record(&self, table: &str, id: i64) -> RecordResult<Record<'_>> {
        Ok(Record::new(self, self.schema(table)?, Some(id)))
    }

    /// Every row of `table` as loaded records, in store order.
    pub fn all(&self, table: &str) -> RecordResult<Vec<Record<'_>>> {
        let schema = self.schema(table)?;
        let sql = query::list_all(table);
        let rows = self.run(|store| store.query_rows(&sql, &[]))?;
        rows.into_iter()
            .map(|row| Record::from_row(self, Arc::clone(&schema), row))
            .collect()
    }

    pub fn create<E: Entity>(&self) -> RecordResult<Record<'_>> {
        self.new_record(&E::table())
    }

    pub fn entity<E: Entity>(&self, id: i64) -> RecordResult<Record<'_>> {
        self.record(&E::table(), id)
    }

    pub fn all_of<E: Entity>(&self) -> RecordResult<Vec<Record<'_>>> {
        self.all(&E::table())
    }

    /// Runs one store operation, rolling back the transaction if it fails.
    pub(crate) fn run<T>(&self, op: impl FnOnce(&dyn Store) -> DbResult<T>) -> RecordResult<T> {
        op(self.store.as_ref()).map_err(|err| {
            self.discard();
            RecordError::Db(err)
        })
    }

    pub(crate) fn commit(&self) -> RecordResult<()> {
        self.run(|store| store.commit())
    }

    /// Rolls back the open transaction. The caller already holds the error
    /// it reports, so a rollback failure is only logged.
    pub(crate) fn discard(&self) {
        if let Err(err) = self.store.rollback() {
            warn!(
                "event=session_rollback module=session status=error error_code=rollback_failed error={}",
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::db::{DbError, DbResult, Row, Store, Value};
    use crate::record::RecordError;
    use crate::registry::TypeRegistry;
    use crate::schema::Schema;
    use std::cell::Cell;
    use std::rc::Rc;

    struct BrokenStore {
        rollbacks: Rc<Cell<usize>>,
    }

    impl Store for BrokenStore {
        fn execute(&self, _sql: &str, _params: &[Value]) -> DbResult<usize> {
            Err(DbError::LockPoisoned)
        }

        fn query_row(&self, _sql: &str, _params: &[Value]) -> DbResult<Option<Row>> {
            Err(DbError::LockPoisoned)
        }

        fn query_rows(&self, _sql: &str, _params: &[Value]) -> DbResult<Vec<Row>> {
            Err(DbError::LockPoisoned)
        }

        fn commit(&self) -> DbResult<()> {
            Ok(())
        }

        fn rollback(&self) -> DbResult<()> {
            self.rollbacks.set(self.rollbacks.get() + 1);
            Err(DbError::LockPoisoned)
        }
    }

    #[test]
    fn failed_rollback_still_reports_the_statement_error() {
        let rollbacks = Rc::new(Cell::new(0));
        let mut registry = TypeRegistry::new();
        registry
            .register(Schema::builder("Note").column("body").build().unwrap())
            .unwrap();
        let store = BrokenStore {
            rollbacks: Rc::clone(&rollbacks),
        };
        let session = Session::new(store, registry).unwrap();

        let mut note = session.new_record("note").unwrap();
        note.set("body", "draft".to_string()).unwrap();
        let err = note.save().unwrap_err();

        assert!(matches!(err, RecordError::Db(DbError::LockPoisoned)));
        assert_eq!(rollbacks.get(), 1);
        assert!(note.is_modified());
        assert_eq!(note.id(), None);
    }
}
