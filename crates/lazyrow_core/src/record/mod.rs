//! Lazy-loading records bound to a session.
//!
//! # Responsibility
//! - Hold per-instance state: identifier, field cache, loaded/modified flags.
//! - Route attribute reads and writes by schema kind (`dispatch`).
//! - Persist through load/insert/update/delete/save (`persist`).
//! - Traverse parent/children/siblings relations (`relation`).
//!
//! # Invariants
//! - `fields` is empty or a full image of the row's own keys; rows are never
//!   merged partially.
//! - While `modified` is set, reads fail with `PendingModification` until
//!   `save` flushes the staged change.
//! - Records materialized from a query are loaded and never re-select.

mod dispatch;
mod persist;
mod relation;

use crate::db::{DbError, Row, Value};
use crate::schema::{AttributeKind, Schema};
use crate::session::Session;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

pub use dispatch::AttributeValue;

pub type RecordResult<T> = Result<T, RecordError>;

/// Record operation failure.
///
/// `Db` is the store-failure kind; every other variant is the
/// not-found/misuse kind. `InvalidData` counts as not-found: a stored row
/// that does not fit the schema is never handed out. Misuse errors leave the
/// transaction alone, except a zero-row update or delete, which rolls back
/// the write transaction it opened.
#[derive(Debug)]
pub enum RecordError {
    /// Statement failed; the open transaction was rolled back.
    Db(DbError),
    UnknownType(String),
    /// The operation needs a persisted row but the record has no identifier.
    Unsaved {
        table: String,
    },
    RowNotFound {
        table: String,
        id: i64,
    },
    UnknownAttribute {
        table: String,
        name: String,
    },
    AttributeKindMismatch {
        table: String,
        name: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },
    /// Parent foreign key is null or absent.
    ParentNotSet {
        table: String,
        name: String,
    },
    PendingModification {
        table: String,
    },
    /// `save` would insert a row with no staged values.
    EmptyInsert {
        table: String,
    },
    /// Children and siblings cannot be assigned directly.
    ReadOnlyAttribute {
        table: String,
        name: String,
        kind: AttributeKind,
    },
    InvalidValue {
        table: String,
        name: String,
        reason: String,
    },
    /// Stored data does not match the record's schema.
    InvalidData(String),
}

impl RecordError {
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Db(_))
    }

    pub fn is_not_found(&self) -> bool {
        !self.is_store_failure()
    }
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "store failure: {err}"),
            Self::UnknownType(table) => write!(f, "record type not registered: {table}"),
            Self::Unsaved { table } => write!(f, "`{table}` record has no identifier"),
            Self::RowNotFound { table, id } => write!(f, "`{table}` row not found: {id}"),
            Self::UnknownAttribute { table, name } => {
                write!(f, "unrecognized attribute `{name}` on `{table}`")
            }
            Self::AttributeKindMismatch {
                table,
                name,
                expected,
                actual,
            } => write!(
                f,
                "attribute `{name}` on `{table}` is a {actual} attribute, not {expected}"
            ),
            Self::ParentNotSet { table, name } => {
                write!(f, "parent `{name}` is not set on `{table}`")
            }
            Self::PendingModification { table } => {
                write!(f, "`{table}` record has unsaved modifications")
            }
            Self::EmptyInsert { table } => {
                write!(f, "`{table}` record has no staged values to insert")
            }
            Self::ReadOnlyAttribute { table, name, kind } => {
                write!(f, "{kind} attribute `{name}` on `{table}` cannot be assigned")
            }
            Self::InvalidValue {
                table,
                name,
                reason,
            } => write!(f, "invalid value for `{name}` on `{table}`: {reason}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RecordError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Persistence state of one record instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No identifier; never persisted.
    New,
    /// Identifier known, row not fetched yet.
    Unloaded,
    Loaded,
    /// Staged changes wait for `save`.
    Modified,
    /// Row removed; the next `save` inserts a new one.
    Deleted,
}

#[derive(Debug, Clone, Default)]
struct RecordState {
    id: Option<i64>,
    fields: BTreeMap<String, Value>,
    loaded: bool,
    modified: bool,
    deleted: bool,
}

/// One row of one table, loaded on first access.
pub struct Record<'s> {
    session: &'s Session,
    schema: Arc<Schema>,
    state: RecordState,
}

impl<'s> Record<'s> {
    pub(crate) fn new(session: &'s Session, schema: Arc<Schema>, id: Option<i64>) -> Self {
        Self {
            session,
            schema,
            state: RecordState {
                id,
                ..RecordState::default()
            },
        }
    }

    /// Builds a loaded record from a full row of its table.
    pub(crate) fn from_row(
        session: &'s Session,
        schema: Arc<Schema>,
        row: Row,
    ) -> RecordResult<Self> {
        let (id, fields) = row_image(&schema, row)?;
        Ok(Self {
            session,
            schema,
            state: RecordState {
                id: Some(id),
                fields,
                loaded: true,
                modified: false,
                deleted: false,
            },
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.state.id
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn is_loaded(&self) -> bool {
        self.state.loaded
    }

    pub fn is_modified(&self) -> bool {
        self.state.modified
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.state.deleted {
            Lifecycle::Deleted
        } else if self.state.id.is_none() {
            Lifecycle::New
        } else if self.state.modified {
            Lifecycle::Modified
        } else if self.state.loaded {
            Lifecycle::Loaded
        } else {
            Lifecycle::Unloaded
        }
    }

    fn require_id(&self) -> RecordResult<i64> {
        self.state.id.ok_or_else(|| RecordError::Unsaved {
            table: self.table().to_string(),
        })
    }
}

impl Debug for Record<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table())
            .field("id", &self.state.id)
            .field("fields", &self.state.fields)
            .field("loaded", &self.state.loaded)
            .field("modified", &self.state.modified)
            .finish()
    }
}

/// Keeps the row's own keys and checks the image is complete.
///
/// Natural joins bring in join-table columns; those are dropped here so they
/// never reach an update statement.
fn row_image(schema: &Schema, row: Row) -> RecordResult<(i64, BTreeMap<String, Value>)> {
    let owned = schema.owned_keys();
    let mut fields = BTreeMap::new();
    for (name, value) in row {
        if owned.contains(&name) && !fields.contains_key(&name) {
            fields.insert(name, value);
        }
    }

    if let Some(missing) = owned.iter().find(|key| !fields.contains_key(*key)) {
        return Err(RecordError::InvalidData(format!(
            "`{}` row lacks column `{missing}`",
            schema.table()
        )));
    }

    match fields.get(&schema.id_key()) {
        Some(Value::Integer(id)) => Ok((*id, fields)),
        other => Err(RecordError::InvalidData(format!(
            "`{}` row has non-integer identifier {other:?}",
            schema.table()
        ))),
    }
}
