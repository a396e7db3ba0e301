//! Naming conventions that map record structure onto tables and columns.
//!
//! - table = lowercase type name
//! - own column key = `<table>_<column>`
//! - identifier key = `<table>_id`
//! - foreign key = `<parent>_id`
//! - join table = both table names sorted, joined by `__`

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between the two table names of a join table.
pub const JOIN_TABLE_SEPARATOR: &str = "__";

/// Column name suffix used by identifier and foreign keys.
pub const ID_COLUMN: &str = "id";

/// Store-maintained creation timestamp column.
pub const CREATED_COLUMN: &str = "created";

/// Store-maintained modification timestamp column.
pub const UPDATED_COLUMN: &str = "updated";

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:_[a-z0-9]+)*$").expect("identifier regex must compile")
});

static TYPE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("type name regex must compile"));

/// Returns whether `value` is a usable table/column/relation name.
///
/// Lowercase snake case only. A double underscore is rejected because it is
/// reserved for join tables.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

pub fn is_valid_type_name(value: &str) -> bool {
    TYPE_NAME_RE.is_match(value)
}

pub fn table_name(type_name: &str) -> String {
    type_name.to_ascii_lowercase()
}

pub fn column_key(table: &str, column: &str) -> String {
    format!("{table}_{column}")
}

pub fn id_key(table: &str) -> String {
    column_key(table, ID_COLUMN)
}

pub fn foreign_key(parent: &str) -> String {
    format!("{parent}_{ID_COLUMN}")
}

/// Join table name for a sibling relation; symmetric in its arguments.
pub fn join_table_name(left: &str, right: &str) -> String {
    let (first, second) = if left <= right {
        (left, right)
    } else {
        (right, left)
    };
    format!("{first}{JOIN_TABLE_SEPARATOR}{second}")
}
