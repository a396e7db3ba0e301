//! Schema descriptors for record types.
//!
//! # Responsibility
//! - Describe one record type: table, own columns, and parent/child/sibling
//!   relations.
//! - Classify attribute names once, at build time, into a closed set of kinds.
//!
//! # Invariants
//! - Attribute names are partitioned exactly among columns, parents,
//!   children and siblings.
//! - Every storage key the type owns (`<table>_id`, column keys, timestamp
//!   keys, foreign keys) is unique.
//! - Names are validated lowercase identifiers, so they can be quoted into
//!   statement text safely.

pub mod naming;

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Kind of a named attribute on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    Column,
    Parent,
    Children,
    Siblings,
}

impl AttributeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Parent => "parent",
            Self::Children => "children",
            Self::Siblings => "siblings",
        }
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved attribute: its kind plus the related table for relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Column,
    Parent { table: String },
    Children { table: String },
    Siblings { table: String },
}

impl Attribute {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Column => AttributeKind::Column,
            Self::Parent { .. } => AttributeKind::Parent,
            Self::Children { .. } => AttributeKind::Children,
            Self::Siblings { .. } => AttributeKind::Siblings,
        }
    }

    /// Related table, `None` for own columns.
    pub fn target_table(&self) -> Option<&str> {
        match self {
            Self::Column => None,
            Self::Parent { table } | Self::Children { table } | Self::Siblings { table } => {
                Some(table.as_str())
            }
        }
    }
}

/// Schema declaration or registration failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidTypeName(String),
    InvalidName {
        table: String,
        name: String,
    },
    /// `id` is the identifier column of every table.
    ReservedColumn {
        table: String,
        name: String,
    },
    DuplicateAttribute {
        table: String,
        name: String,
    },
    /// Two attributes map to the same storage key.
    KeyCollision {
        table: String,
        key: String,
    },
    SelfSibling {
        table: String,
        name: String,
    },
    DuplicateType(String),
    UnknownTarget {
        table: String,
        name: String,
        target: String,
    },
    /// A child type lacks the parent relation that points back at `parent`.
    MissingBackReference {
        parent: String,
        child: String,
        foreign_key: String,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTypeName(name) => write!(f, "invalid record type name `{name}`"),
            Self::InvalidName { table, name } => {
                write!(f, "invalid attribute name `{name}` on `{table}`")
            }
            Self::ReservedColumn { table, name } => {
                write!(f, "column name `{name}` on `{table}` is reserved")
            }
            Self::DuplicateAttribute { table, name } => {
                write!(f, "attribute `{name}` declared twice on `{table}`")
            }
            Self::KeyCollision { table, key } => {
                write!(f, "storage key `{key}` is claimed twice on `{table}`")
            }
            Self::SelfSibling { table, name } => {
                write!(f, "sibling relation `{name}` on `{table}` points at its own table")
            }
            Self::DuplicateType(table) => write!(f, "record type `{table}` already registered"),
            Self::UnknownTarget {
                table,
                name,
                target,
            } => write!(
                f,
                "relation `{name}` on `{table}` targets unregistered type `{target}`"
            ),
            Self::MissingBackReference {
                parent,
                child,
                foreign_key,
            } => write!(
                f,
                "child type `{child}` of `{parent}` declares no parent relation `{parent}` (foreign key `{foreign_key}`)"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Static metadata for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    type_name: String,
    table: String,
    columns: BTreeSet<String>,
    attributes: BTreeMap<String, Attribute>,
    timestamps: bool,
}

impl Schema {
    /// Starts a declaration for `type_name`; the table is its lowercase form.
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(type_name)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Own column names, unprefixed.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .map(|(name, attribute)| (name.as_str(), attribute))
    }

    /// Relations of one kind as `(name, target table)`.
    pub fn relations(&self, kind: AttributeKind) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(move |(name, attribute)| {
            match attribute.target_table() {
                Some(table) if attribute.kind() == kind => Some((name.as_str(), table)),
                _ => None,
            }
        })
    }

    /// Storage key of the identifier column.
    pub fn id_key(&self) -> String {
        naming::id_key(&self.table)
    }

    pub fn column_key(&self, column: &str) -> String {
        naming::column_key(&self.table, column)
    }

    /// Whether rows carry store-maintained `<table>_created` and
    /// `<table>_updated` columns.
    pub fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Keys the store fills in; records read them but never write them.
    pub fn managed_keys(&self) -> Vec<String> {
        let mut keys = vec![self.id_key()];
        if self.timestamps {
            keys.push(self.column_key(naming::CREATED_COLUMN));
            keys.push(self.column_key(naming::UPDATED_COLUMN));
        }
        keys
    }

    /// Every storage key a full row of this type carries.
    pub fn owned_keys(&self) -> Vec<String> {
        let mut keys = vec![self.id_key()];
        keys.extend(self.columns.iter().map(|column| self.column_key(column)));
        keys.extend(self.managed_keys().into_iter().skip(1));
        keys.extend(
            self.relations(AttributeKind::Parent)
                .map(|(name, _)| naming::foreign_key(name)),
        );
        keys
    }
}

/// Collects and validates a `Schema` declaration.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    type_name: String,
    columns: Vec<String>,
    relations: Vec<(String, AttributeKind, String)>,
    timestamps: bool,
}

impl SchemaBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            columns: Vec::new(),
            relations: Vec::new(),
            timestamps: false,
        }
    }

    /// Declares the store-maintained `created`/`updated` columns. They are
    /// read through `Record::created`/`Record::updated` and never written.
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    pub fn columns<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.columns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Many-to-one reference stored in `<name>_id`.
    pub fn parent(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.relation(name, AttributeKind::Parent, type_name)
    }

    /// One-to-many reference; the child table holds `<this table>_id`.
    pub fn child(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.relation(name, AttributeKind::Children, type_name)
    }

    /// Many-to-many reference through the sorted join table.
    pub fn sibling(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.relation(name, AttributeKind::Siblings, type_name)
    }

    fn relation(
        mut self,
        name: impl Into<String>,
        kind: AttributeKind,
        type_name: impl Into<String>,
    ) -> Self {
        self.relations.push((name.into(), kind, type_name.into()));
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        if !naming::is_valid_type_name(&self.type_name) {
            return Err(SchemaError::InvalidTypeName(self.type_name));
        }
        let table = naming::table_name(&self.type_name);
        if !naming::is_valid_identifier(&table) {
            return Err(SchemaError::InvalidTypeName(self.type_name));
        }

        let mut attributes = BTreeMap::new();
        let mut columns = BTreeSet::new();
        let mut keys = BTreeSet::from([naming::id_key(&table)]);
        if self.timestamps {
            keys.insert(naming::column_key(&table, naming::CREATED_COLUMN));
            keys.insert(naming::column_key(&table, naming::UPDATED_COLUMN));
        }

        for column in self.columns {
            check_name(&table, &column)?;
            if column == naming::ID_COLUMN {
                return Err(SchemaError::ReservedColumn {
                    table,
                    name: column,
                });
            }
            claim_key(&table, &mut keys, naming::column_key(&table, &column))?;
            insert_attribute(&table, &mut attributes, column.clone(), Attribute::Column)?;
            columns.insert(column);
        }

        for (name, kind, target_type) in self.relations {
            check_name(&table, &name)?;
            if !naming::is_valid_type_name(&target_type) {
                return Err(SchemaError::InvalidTypeName(target_type));
            }
            let target = naming::table_name(&target_type);
            let attribute = match kind {
                AttributeKind::Parent => {
                    claim_key(&table, &mut keys, naming::foreign_key(&name))?;
                    Attribute::Parent { table: target }
                }
                AttributeKind::Children => Attribute::Children { table: target },
                AttributeKind::Siblings => {
                    if target == table {
                        return Err(SchemaError::SelfSibling { table, name });
                    }
                    Attribute::Siblings { table: target }
                }
                AttributeKind::Column => Attribute::Column,
            };
            insert_attribute(&table, &mut attributes, name, attribute)?;
        }

        Ok(Schema {
            type_name: self.type_name,
            table,
            columns,
            attributes,
            timestamps: self.timestamps,
        })
    }
}

fn check_name(table: &str, name: &str) -> Result<(), SchemaError> {
    if naming::is_valid_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName {
            table: table.to_string(),
            name: name.to_string(),
        })
    }
}

fn claim_key(table: &str, keys: &mut BTreeSet<String>, key: String) -> Result<(), SchemaError> {
    if keys.contains(&key) {
        return Err(SchemaError::KeyCollision {
            table: table.to_string(),
            key,
        });
    }
    keys.insert(key);
    Ok(())
}

fn insert_attribute(
    table: &str,
    attributes: &mut BTreeMap<String, Attribute>,
    name: String,
    attribute: Attribute,
) -> Result<(), SchemaError> {
    if attributes.contains_key(&name) {
        return Err(SchemaError::DuplicateAttribute {
            table: table.to_string(),
            name,
        });
    }
    attributes.insert(name, attribute);
    Ok(())
}
