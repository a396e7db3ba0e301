//! Parent, children and sibling traversal.
//!
//! Related records are built from the rows already fetched, so reading their
//! own columns never issues another select.

use super::{Record, RecordError, RecordResult};
use crate::db::{Row, Value};
use crate::query;
use crate::schema::naming;
use crate::schema::AttributeKind;
use std::sync::Arc;

impl<'s> Record<'s> {
    pub(super) fn fetch_parent(&self, name: &str, table: &str) -> RecordResult<Record<'s>> {
        let parent_id = match self.state.fields.get(&naming::foreign_key(name)) {
            Some(Value::Integer(id)) => *id,
            _ => {
                return Err(RecordError::ParentNotSet {
                    table: self.table().to_string(),
                    name: name.to_string(),
                })
            }
        };

        let schema = self.session.schema(table)?;
        let sql = query::select_by_id(table);
        let row = self
            .session
            .run(|store| store.query_row(&sql, &[Value::Integer(parent_id)]))?
            .ok_or_else(|| RecordError::RowNotFound {
                table: table.to_string(),
                id: parent_id,
            })?;
        Record::from_row(self.session, schema, row)
    }

    pub(super) fn fetch_children(&self, table: &str) -> RecordResult<Vec<Record<'s>>> {
        let sql = query::select_children(table, self.table());
        self.fetch_related(table, &sql)
    }

    pub(super) fn fetch_siblings(&self, table: &str) -> RecordResult<Vec<Record<'s>>> {
        let sql = query::select_siblings(table, self.table());
        self.fetch_related(table, &sql)
    }

    fn fetch_related(&self, table: &str, sql: &str) -> RecordResult<Vec<Record<'s>>> {
        let id = self.require_id()?;
        let schema = self.session.schema(table)?;
        let rows: Vec<Row> = self
            .session
            .run(|store| store.query_rows(sql, &[Value::Integer(id)]))?;
        rows.into_iter()
            .map(|row| Record::from_row(self.session, Arc::clone(&schema), row))
            .collect()
    }

    /// Points every listed child of relation `name` at this record in one
    /// statement, commits, and returns the number of rows changed.
    ///
    /// Rows not listed are untouched. Ids that match no row are skipped.
    pub fn reparent_children(&mut self, name: &str, child_ids: &[i64]) -> RecordResult<usize> {
        let attribute = self.resolve_kind(name, AttributeKind::Children)?;
        let parent_id = self.require_id()?;
        if child_ids.is_empty() {
            return Ok(0);
        }

        let child_table = attribute.target_table().unwrap_or_default();
        let sql = query::update_children(child_table, self.table(), child_ids.len());
        let mut params = Vec::with_capacity(child_ids.len() + 1);
        params.push(Value::Integer(parent_id));
        params.extend(child_ids.iter().copied().map(Value::Integer));

        let changed = self.session.run(|store| store.execute(&sql, &params))?;
        self.session.commit()?;
        Ok(changed)
    }
}
