//! Load, insert, update, delete and save.
//!
//! Every statement goes through `Session::run`, which rolls back the shared
//! transaction on failure. A failed `save` leaves the in-memory state as it
//! was, still modified; state changes apply only after the commit succeeds.

use super::{row_image, Record, RecordError, RecordResult};
use crate::db::Value;
use crate::query;
use std::collections::BTreeMap;

impl Record<'_> {
    /// Fetches the row once; later calls are no-ops.
    pub fn load(&mut self) -> RecordResult<()> {
        let id = self.require_id()?;
        if self.state.loaded {
            return Ok(());
        }

        let sql = query::select_by_id(self.table());
        let row = self
            .session
            .run(|store| store.query_row(&sql, &[Value::Integer(id)]))?
            .ok_or_else(|| RecordError::RowNotFound {
                table: self.table().to_string(),
                id,
            })?;

        let (_, fields) = row_image(&self.schema, row)?;
        self.state.fields = fields;
        self.state.loaded = true;
        Ok(())
    }

    /// Flushes staged changes and commits. No statement runs when nothing
    /// is staged.
    pub fn save(&mut self) -> RecordResult<()> {
        if !self.state.modified {
            return Ok(());
        }

        let inserted = match self.state.id {
            Some(id) => {
                self.update(id)?;
                None
            }
            None => Some(self.insert()?),
        };
        self.session.commit()?;

        if let Some((id, fields)) = inserted {
            self.state.id = Some(id);
            self.state.fields = fields;
            self.state.loaded = true;
        }
        self.state.modified = false;
        self.state.deleted = false;
        Ok(())
    }

    /// Deletes the row, commits, and clears the identifier.
    ///
    /// The remaining field values stay staged, so a later `save` inserts
    /// them as a new row.
    pub fn delete(&mut self) -> RecordResult<()> {
        let id = self.require_id()?;
        let sql = query::delete(self.table());
        let changed = self
            .session
            .run(|store| store.execute(&sql, &[Value::Integer(id)]))?;
        if changed == 0 {
            self.session.discard();
            return Err(RecordError::RowNotFound {
                table: self.table().to_string(),
                id,
            });
        }
        self.session.commit()?;

        self.state.fields.remove(&self.schema.id_key());
        self.state.id = None;
        self.state.loaded = false;
        self.state.modified = true;
        self.state.deleted = true;
        Ok(())
    }

    /// Runs the insert and returns the stored row image without applying it.
    fn insert(&self) -> RecordResult<(i64, BTreeMap<String, Value>)> {
        let (sql, params) = {
            let keys = self.staged_keys();
            if keys.is_empty() {
                return Err(RecordError::EmptyInsert {
                    table: self.table().to_string(),
                });
            }
            let params = keys
                .iter()
                .map(|key| self.state.fields.get(*key).cloned().unwrap_or(Value::Null))
                .collect::<Vec<_>>();
            (query::insert(self.table(), &keys), params)
        };

        let row = self
            .session
            .run(|store| store.query_row(&sql, &params))?
            .ok_or_else(|| {
                RecordError::InvalidData(format!("insert into `{}` returned no row", self.table()))
            });
        let image = row.and_then(|row| row_image(&self.schema, row));
        if image.is_err() {
            self.session.discard();
        }
        image
    }

    fn update(&self, id: i64) -> RecordResult<()> {
        let (sql, params) = {
            let keys = self.staged_keys();
            if keys.is_empty() {
                return Ok(());
            }
            let mut params = keys
                .iter()
                .map(|key| self.state.fields.get(*key).cloned().unwrap_or(Value::Null))
                .collect::<Vec<_>>();
            params.push(Value::Integer(id));
            (query::update(self.table(), &keys), params)
        };

        let changed = self.session.run(|store| store.execute(&sql, &params))?;
        if changed == 0 {
            self.session.discard();
            return Err(RecordError::RowNotFound {
                table: self.table().to_string(),
                id,
            });
        }
        Ok(())
    }

    /// Field keys written by insert/update; store-managed keys are never
    /// written.
    fn staged_keys(&self) -> Vec<&str> {
        let managed = self.schema.managed_keys();
        self.state
            .fields
            .keys()
            .filter(|key| !managed.contains(*key))
            .map(String::as_str)
            .collect()
    }
}
