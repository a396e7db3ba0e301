//! Lazy-loading mapping between records and relational rows.
//!
//! Record attributes resolve to column reads, parent lookups, child lists
//! and many-to-many sibling lists, all driven by per-type `Schema`
//! metadata. A `Session` carries the store and the type registry; records
//! borrow it for their whole life.

pub mod db;
pub mod logging;
pub mod query;
pub mod record;
pub mod registry;
pub mod schema;
pub mod session;

pub use db::{
    open_db, open_db_in_memory, open_db_with_options, DbError, DbResult, Row, SqliteStore, Store,
    StoreOptions, Value,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use record::{AttributeValue, Lifecycle, Record, RecordError, RecordResult};
pub use registry::{Entity, TypeRegistry};
pub use schema::{Attribute, AttributeKind, Schema, SchemaBuilder, SchemaError};
pub use session::Session;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
