//! Statement templates for record persistence and relation traversal.
//!
//! Pure string generation. Table and column names come from validated
//! schemas and are double-quoted; every value is a `?N` placeholder.

use crate::schema::naming::{foreign_key, id_key, join_table_name};

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn select_by_id(table: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = ?1;",
        quote(table),
        quote(&id_key(table))
    )
}

pub fn list_all(table: &str) -> String {
    format!("SELECT * FROM {};", quote(table))
}

/// Insert over `keys`, returning the stored row. `keys` must not be empty.
pub fn insert(table: &str, keys: &[&str]) -> String {
    debug_assert!(!keys.is_empty(), "insert needs at least one staged key");
    let columns = keys.iter().map(|key| quote(key)).collect::<Vec<_>>();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *;",
        quote(table),
        columns.join(", "),
        placeholders(1, keys.len())
    )
}

/// Update of `keys`; the identifier binds to the last placeholder.
pub fn update(table: &str, keys: &[&str]) -> String {
    let assignments = keys
        .iter()
        .enumerate()
        .map(|(index, key)| format!("{} = ?{}", quote(key), index + 1))
        .collect::<Vec<_>>();
    format!(
        "UPDATE {} SET {} WHERE {} = ?{};",
        quote(table),
        assignments.join(", "),
        quote(&id_key(table)),
        keys.len() + 1
    )
}

pub fn delete(table: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?1;",
        quote(table),
        quote(&id_key(table))
    )
}

/// Rows of `child` whose foreign key points at `parent`.
pub fn select_children(child: &str, parent: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = ?1;",
        quote(child),
        quote(&foreign_key(parent))
    )
}

/// Rows of `sibling` linked to one `table` row through their join table.
pub fn select_siblings(sibling: &str, table: &str) -> String {
    format!(
        "SELECT * FROM {} NATURAL JOIN {} WHERE {} = ?1;",
        quote(sibling),
        quote(&join_table_name(table, sibling)),
        quote(&id_key(table))
    )
}

/// Points `count` children at a new parent; the parent id binds to `?1`.
pub fn update_children(child: &str, parent: &str, count: usize) -> String {
    format!(
        "UPDATE {} SET {} = ?1 WHERE {} IN ({});",
        quote(child),
        quote(&foreign_key(parent)),
        quote(&id_key(child)),
        placeholders(2, count)
    )
}
