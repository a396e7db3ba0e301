//! Table name → record type registry.
//!
//! # Responsibility
//! - Hold every known record type's `Schema`, keyed by table name.
//! - Validate cross-type references once, before any record is used.
//!
//! # Invariants
//! - A table is registered at most once.
//! - After `validate`, every relation target is registered and every child
//!   type carries the parent relation its foreign key comes from.

use crate::schema::naming;
use crate::schema::{Attribute, AttributeKind, Schema, SchemaBuilder, SchemaError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A concrete record type with a static schema declaration.
///
/// ```
/// use lazyrow_core::{Entity, SchemaBuilder};
///
/// struct Tag;
///
/// impl Entity for Tag {
///     const TYPE_NAME: &'static str = "Tag";
///
///     fn describe(schema: SchemaBuilder) -> SchemaBuilder {
///         schema.column("value").sibling("posts", "Post")
///     }
/// }
/// ```
pub trait Entity {
    const TYPE_NAME: &'static str;

    fn describe(schema: SchemaBuilder) -> SchemaBuilder;

    fn schema() -> Result<Schema, SchemaError> {
        Self::describe(SchemaBuilder::new(Self::TYPE_NAME)).build()
    }

    fn table() -> String {
        naming::table_name(Self::TYPE_NAME)
    }
}

/// Registry of record types available to relation traversal.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one schema under its table name.
    pub fn register(&mut self, schema: Schema) -> Result<Arc<Schema>, SchemaError> {
        let table = schema.table().to_string();
        if self.schemas.contains_key(&table) {
            return Err(SchemaError::DuplicateType(table));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(table, Arc::clone(&schema));
        Ok(schema)
    }

    pub fn register_entity<E: Entity>(&mut self) -> Result<Arc<Schema>, SchemaError> {
        self.register(E::schema()?)
    }

    pub fn schema(&self, table: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(table)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered table names, sorted.
    pub fn tables(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Checks relation targets across all registered types.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for schema in self.schemas.values() {
            for (name, attribute) in schema.attributes() {
                let Some(target) = attribute.target_table() else {
                    continue;
                };
                let Some(target_schema) = self.schemas.get(target) else {
                    return Err(SchemaError::UnknownTarget {
                        table: schema.table().to_string(),
                        name: name.to_string(),
                        target: target.to_string(),
                    });
                };

                if attribute.kind() == AttributeKind::Children {
                    check_back_reference(schema, target_schema)?;
                }
            }
        }
        Ok(())
    }
}

fn check_back_reference(parent: &Schema, child: &Schema) -> Result<(), SchemaError> {
    let expected = Attribute::Parent {
        table: parent.table().to_string(),
    };
    if child.attribute(parent.table()) == Some(&expected) {
        return Ok(());
    }
    Err(SchemaError::MissingBackReference {
        parent: parent.table().to_string(),
        child: child.table().to_string(),
        foreign_key: naming::foreign_key(parent.table()),
    })
}
