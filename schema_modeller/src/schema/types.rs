//! Type definitions for database schema objects
//!
//! A [`Database`] owns its [`Table`]s; a table owns its [`Column`]s and [`Index`]es.
//! Indexes refer to their member columns by name only. Column values are immutable
//! once built: changes are expressed by building a replacement through
//! [`Column::to_builder`].

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::wire::WireType;

/// Represents a database and the tables it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Database {
    name: String,
    tables: IndexMap<String, Table>,
}

impl Database {
    /// Create a new empty database model
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a table to the database, replacing any table with the same name
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).or_else(|| {
            self.tables
                .values()
                .find(|table| table.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    database: String,
    name: String,
    columns: IndexMap<String, Column>,
    indexes: IndexMap<String, Index>,
}

impl Table {
    /// Create a new table with the given name inside the named database
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    /// Name of the database owning this table
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a column to the table. A column whose name matches an existing one
    /// case-insensitively replaces it in place.
    pub fn add_column(&mut self, column: Column) {
        let existing = self
            .columns
            .keys()
            .find(|name| name.eq_ignore_ascii_case(&column.name))
            .cloned();
        match existing {
            Some(old) if old != column.name => {
                if let Some(position) = self.columns.get_index_of(&old) {
                    self.columns.shift_remove(&old);
                    self.columns.insert(column.name.clone(), column);
                    let last = self.columns.len() - 1;
                    self.columns.move_index(last, position);
                }
            }
            _ => {
                self.columns.insert(column.name.clone(), column);
            }
        }
    }

    /// Builder-style variant of [`Table::add_column`]
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Add an index. Every member column must already belong to the table.
    pub fn add_index(&mut self, index: Index) -> Result<()> {
        if let Some(missing) = index.columns().find(|name| self.column(name).is_none()) {
            return Err(Error::ModellerError(format!(
                "Index '{}' refers to column '{}' which is not in table '{}'",
                index.name, missing, self.name
            )));
        }
        self.indexes.insert(index.name.clone(), index);
        Ok(())
    }

    /// Builder-style variant of [`Table::add_index`]
    pub fn with_index(mut self, index: Index) -> Result<Self> {
        self.add_index(index)?;
        Ok(self)
    }

    /// Look up a column, preferring an exact match over a case-insensitive one
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).or_else(|| {
            self.columns
                .values()
                .find(|column| column.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Look up an index, preferring an exact match over a case-insensitive one
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name).or_else(|| {
            self.indexes
                .values()
                .find(|index| index.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }
}

/// The variant-specific part of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnKind {
    String { length: u32 },
    Binary { length: u32 },
    Decimal { precision: u32, scale: u32 },
    Bit { bits: u32 },
    Enum { values: BTreeSet<String> },
    Set { values: BTreeSet<String> },
    Integer,
    Double,
    Boolean,
    DateTime,
    TimeStamp,
}

impl ColumnKind {
    /// The wire type a column of this kind carries unless told otherwise
    pub fn default_wire_type(&self) -> WireType {
        match self {
            ColumnKind::String { .. } => WireType::Varchar,
            ColumnKind::Binary { .. } => WireType::VarBinary,
            ColumnKind::Decimal { .. } => WireType::Decimal,
            ColumnKind::Bit { .. } => WireType::Bit,
            ColumnKind::Enum { .. } | ColumnKind::Set { .. } => WireType::Other,
            ColumnKind::Integer => WireType::Integer,
            ColumnKind::Double => WireType::Double,
            ColumnKind::Boolean => WireType::Boolean,
            ColumnKind::DateTime | ColumnKind::TimeStamp => WireType::Timestamp,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::String { .. } => "string",
            ColumnKind::Binary { .. } => "binary",
            ColumnKind::Decimal { .. } => "decimal",
            ColumnKind::Bit { .. } => "bit",
            ColumnKind::Enum { .. } => "enum",
            ColumnKind::Set { .. } => "set",
            ColumnKind::Integer => "integer",
            ColumnKind::Double => "double",
            ColumnKind::Boolean => "boolean",
            ColumnKind::DateTime => "datetime",
            ColumnKind::TimeStamp => "timestamp",
        }
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    name: String,
    wire_type: WireType,
    nullable: bool,
    key: bool,
    auto_increment: bool,
    default: Option<String>,
    #[serde(flatten)]
    kind: ColumnKind,
}

impl Column {
    /// Start building a column of the given kind
    pub fn builder(name: impl Into<String>, kind: ColumnKind) -> ColumnBuilder {
        let wire_type = kind.default_wire_type();
        ColumnBuilder {
            column: Column {
                name: name.into(),
                wire_type,
                nullable: false,
                key: false,
                auto_increment: false,
                default: None,
                kind,
            },
        }
    }

    pub fn string(name: impl Into<String>, length: u32) -> ColumnBuilder {
        Self::builder(name, ColumnKind::String { length })
    }

    pub fn binary(name: impl Into<String>, length: u32) -> ColumnBuilder {
        Self::builder(name, ColumnKind::Binary { length })
    }

    pub fn decimal(name: impl Into<String>, precision: u32, scale: u32) -> ColumnBuilder {
        Self::builder(name, ColumnKind::Decimal { precision, scale })
    }

    pub fn bit(name: impl Into<String>, bits: u32) -> ColumnBuilder {
        Self::builder(name, ColumnKind::Bit { bits })
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> ColumnBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::builder(name, ColumnKind::Enum { values })
    }

    pub fn set<I, S>(name: impl Into<String>, values: I) -> ColumnBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::builder(name, ColumnKind::Set { values })
    }

    pub fn integer(name: impl Into<String>) -> ColumnBuilder {
        Self::builder(name, ColumnKind::Integer)
    }

    pub fn double(name: impl Into<String>) -> ColumnBuilder {
        Self::builder(name, ColumnKind::Double)
    }

    pub fn boolean(name: impl Into<String>) -> ColumnBuilder {
        Self::builder(name, ColumnKind::Boolean)
    }

    pub fn datetime(name: impl Into<String>) -> ColumnBuilder {
        Self::builder(name, ColumnKind::DateTime)
    }

    pub fn timestamp(name: impl Into<String>) -> ColumnBuilder {
        Self::builder(name, ColumnKind::TimeStamp)
    }

    /// Reopen this column as a builder to produce a modified copy
    pub fn to_builder(&self) -> ColumnBuilder {
        ColumnBuilder {
            column: self.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Declared length of a string or binary column
    pub fn length(&self) -> Option<u32> {
        match self.kind {
            ColumnKind::String { length } | ColumnKind::Binary { length } => Some(length),
            _ => None,
        }
    }

    pub fn precision(&self) -> Option<u32> {
        match self.kind {
            ColumnKind::Decimal { precision, .. } => Some(precision),
            _ => None,
        }
    }

    pub fn scale(&self) -> Option<u32> {
        match self.kind {
            ColumnKind::Decimal { scale, .. } => Some(scale),
            _ => None,
        }
    }

    pub fn bits(&self) -> Option<u32> {
        match self.kind {
            ColumnKind::Bit { bits } => Some(bits),
            _ => None,
        }
    }

    /// Allowed labels of an enum or set column
    pub fn values(&self) -> Option<&BTreeSet<String>> {
        match &self.kind {
            ColumnKind::Enum { values } | ColumnKind::Set { values } => Some(values),
            _ => None,
        }
    }
}

/// Builder producing immutable [`Column`] values
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    column: Column,
}

impl ColumnBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.column.name = name.into();
        self
    }

    pub fn wire_type(mut self, wire_type: WireType) -> Self {
        self.column.wire_type = wire_type;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.column.nullable = nullable;
        self
    }

    pub fn key(mut self, key: bool) -> Self {
        self.column.key = key;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.column.auto_increment = auto_increment;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.column.default = Some(default.into());
        self
    }

    pub fn default_opt(mut self, default: Option<String>) -> Self {
        self.column.default = default;
        self
    }

    pub fn build(self) -> Column {
        self.column
    }
}

/// Represents an index on a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    name: String,
    columns: IndexSet<String>,
    unique: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            columns: IndexSet::new(),
            unique,
        }
    }

    /// Add a member column by name; repeated names are ignored
    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.columns.insert(name);
        }
    }

    pub fn with_column(mut self, name: impl Into<String>) -> Self {
        self.add_column(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Whether both indexes cover the same set of columns, ignoring order and case
    pub fn same_columns(&self, other: &Index) -> bool {
        self.columns.len() == other.columns.len()
            && self.columns().all(|name| other.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_is_case_insensitive() {
        let table = Table::new("shop", "users").with_column(Column::string("Email", 128).build());
        assert_eq!(table.column("email").map(Column::name), Some("Email"));
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn replacing_a_column_keeps_its_position() {
        let mut table = Table::new("shop", "users")
            .with_column(Column::integer("id").build())
            .with_column(Column::string("name", 50).build())
            .with_column(Column::string("email", 128).build());
        table.add_column(Column::string("NAME", 100).build());

        let names: Vec<_> = table.columns().map(Column::name).collect();
        assert_eq!(names, vec!["id", "NAME", "email"]);
    }

    #[test]
    fn index_rejects_unknown_columns() {
        let mut table = Table::new("shop", "users").with_column(Column::integer("id").build());
        let err = table
            .add_index(Index::new("ix_email", true).with_column("email"))
            .unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn index_columns_are_a_set() {
        let one = Index::new("ix", false).with_column("a").with_column("b").with_column("A");
        let other = Index::new("ix", false).with_column("b").with_column("a");
        assert_eq!(one.columns().count(), 2);
        assert!(one.same_columns(&other));
    }

    #[test]
    fn builder_yields_requested_attributes() {
        let column = Column::integer("id")
            .wire_type(WireType::BigInt)
            .key(true)
            .auto_increment(true)
            .build();
        assert!(column.is_key());
        assert!(column.is_auto_increment());
        assert!(!column.is_nullable());
        assert_eq!(column.wire_type(), WireType::BigInt);

        let widened = column.to_builder().nullable(true).build();
        assert!(widened.is_nullable());
        assert!(!column.is_nullable());
    }
}
