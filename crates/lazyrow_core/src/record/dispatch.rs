//! Attribute routing by schema kind.

use super::{Record, RecordError, RecordResult};
use crate::db::Value;
use crate::schema::naming;
use crate::schema::{Attribute, AttributeKind};
use rusqlite::types::{FromSql, ValueRef};

/// Result of a generic attribute read.
#[derive(Debug)]
pub enum AttributeValue<'s> {
    Value(Value),
    Parent(Record<'s>),
    Children(Vec<Record<'s>>),
    Siblings(Vec<Record<'s>>),
}

impl<'s> AttributeValue<'s> {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Value(_) => AttributeKind::Column,
            Self::Parent(_) => AttributeKind::Parent,
            Self::Children(_) => AttributeKind::Children,
            Self::Siblings(_) => AttributeKind::Siblings,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record<'s>> {
        match self {
            Self::Parent(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_records(self) -> Option<Vec<Record<'s>>> {
        match self {
            Self::Children(records) | Self::Siblings(records) => Some(records),
            _ => None,
        }
    }
}

impl<'s> Record<'s> {
    /// Reads any declared attribute, loading the row first if needed.
    pub fn get(&mut self, name: &str) -> RecordResult<AttributeValue<'s>> {
        let attribute = self.resolve(name)?;
        self.prepare_read()?;
        match attribute {
            Attribute::Column => self.read_column(name).map(AttributeValue::Value),
            Attribute::Parent { table } => {
                self.fetch_parent(name, &table).map(AttributeValue::Parent)
            }
            Attribute::Children { table } => {
                self.fetch_children(&table).map(AttributeValue::Children)
            }
            Attribute::Siblings { table } => {
                self.fetch_siblings(&table).map(AttributeValue::Siblings)
            }
        }
    }

    /// Reads an own column.
    pub fn column(&mut self, name: &str) -> RecordResult<Value> {
        self.resolve_kind(name, AttributeKind::Column)?;
        self.prepare_read()?;
        self.read_column(name)
    }

    /// Reads an own column converted through `FromSql`.
    pub fn column_as<T: FromSql>(&mut self, name: &str) -> RecordResult<T> {
        let value = self.column(name)?;
        T::column_result(ValueRef::from(&value)).map_err(|err| {
            RecordError::InvalidData(format!(
                "column `{name}` on `{}` cannot be converted: {err}",
                self.table()
            ))
        })
    }

    pub fn parent(&mut self, name: &str) -> RecordResult<Record<'s>> {
        let attribute = self.resolve_kind(name, AttributeKind::Parent)?;
        self.prepare_read()?;
        self.fetch_parent(name, target_of(&attribute))
    }

    pub fn children(&mut self, name: &str) -> RecordResult<Vec<Record<'s>>> {
        let attribute = self.resolve_kind(name, AttributeKind::Children)?;
        self.prepare_read()?;
        self.fetch_children(target_of(&attribute))
    }

    pub fn siblings(&mut self, name: &str) -> RecordResult<Vec<Record<'s>>> {
        let attribute = self.resolve_kind(name, AttributeKind::Siblings)?;
        self.prepare_read()?;
        self.fetch_siblings(target_of(&attribute))
    }

    /// Store-maintained creation time; `None` while the record has no row.
    pub fn created(&mut self) -> RecordResult<Option<Value>> {
        self.timestamp(naming::CREATED_COLUMN)
    }

    /// Store-maintained modification time as of the last load or insert;
    /// `None` while the record has no row.
    pub fn updated(&mut self) -> RecordResult<Option<Value>> {
        self.timestamp(naming::UPDATED_COLUMN)
    }

    /// Stages a column value, or a raw identifier (or null) for a parent.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> RecordResult<()> {
        let value = value.into();
        match self.resolve(name)? {
            Attribute::Column => {
                let key = self.schema.column_key(name);
                self.stage(key, value)
            }
            Attribute::Parent { .. } => match value {
                Value::Integer(_) | Value::Null => self.stage(naming::foreign_key(name), value),
                other => Err(RecordError::InvalidValue {
                    table: self.table().to_string(),
                    name: name.to_string(),
                    reason: format!("parent identifier must be an integer or null, got {other:?}"),
                }),
            },
            attribute => Err(RecordError::ReadOnlyAttribute {
                table: self.table().to_string(),
                name: name.to_string(),
                kind: attribute.kind(),
            }),
        }
    }

    /// Stages `parent`'s identifier as the foreign key of relation `name`.
    pub fn set_parent(&mut self, name: &str, parent: &Record<'_>) -> RecordResult<()> {
        let attribute = self.resolve_kind(name, AttributeKind::Parent)?;
        if attribute.target_table() != Some(parent.table()) {
            return Err(RecordError::InvalidValue {
                table: self.table().to_string(),
                name: name.to_string(),
                reason: format!(
                    "expected a `{}` record, got `{}`",
                    target_of(&attribute),
                    parent.table()
                ),
            });
        }
        let parent_id = parent.require_id()?;
        self.stage(naming::foreign_key(name), Value::Integer(parent_id))
    }

    pub(super) fn resolve(&self, name: &str) -> RecordResult<Attribute> {
        self.schema
            .attribute(name)
            .cloned()
            .ok_or_else(|| RecordError::UnknownAttribute {
                table: self.table().to_string(),
                name: name.to_string(),
            })
    }

    pub(super) fn resolve_kind(
        &self,
        name: &str,
        expected: AttributeKind,
    ) -> RecordResult<Attribute> {
        let attribute = self.resolve(name)?;
        if attribute.kind() != expected {
            return Err(RecordError::AttributeKindMismatch {
                table: self.table().to_string(),
                name: name.to_string(),
                expected,
                actual: attribute.kind(),
            });
        }
        Ok(attribute)
    }

    fn prepare_read(&mut self) -> RecordResult<()> {
        if self.state.modified {
            return Err(RecordError::PendingModification {
                table: self.table().to_string(),
            });
        }
        self.load()
    }

    fn timestamp(&mut self, column: &str) -> RecordResult<Option<Value>> {
        if !self.schema.has_timestamps() {
            return Err(RecordError::UnknownAttribute {
                table: self.table().to_string(),
                name: column.to_string(),
            });
        }
        if self.state.id.is_none() {
            return Ok(None);
        }
        self.prepare_read()?;
        self.read_column(column).map(Some)
    }

    fn read_column(&self, name: &str) -> RecordResult<Value> {
        let key = self.schema.column_key(name);
        self.state.fields.get(&key).cloned().ok_or_else(|| {
            RecordError::InvalidData(format!("`{}` field cache lacks `{key}`", self.table()))
        })
    }

    fn stage(&mut self, key: String, value: Value) -> RecordResult<()> {
        if self.state.id.is_some() {
            self.load()?;
        }
        self.state.fields.insert(key, value);
        self.state.modified = true;
        Ok(())
    }
}

fn target_of(attribute: &Attribute) -> &str {
    attribute.target_table().unwrap_or_default()
}
