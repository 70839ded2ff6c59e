//! Introspection interface
//!
//! The modeller talks to a live database only through these traits. A
//! [`ConnectionSupplier`] hands out one [`MetadataConnection`] per operation; the
//! connection is released when it is dropped.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Raw description of one column as reported by the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Portable wire type code, see [`crate::schema::WireType`]
    pub wire_code: i32,
    /// Declared size: character length, byte length, bit count or numeric precision
    pub size: u32,
    pub decimal_digits: u32,
    pub nullable: bool,
    pub auto_increment: bool,
    /// Engine-specific type name (e.g. `ENUM`, `DATETIME`, `timestamp`)
    pub type_name: String,
    /// Default value as the engine reports it, before dialect decoding
    pub default: Option<String>,
}

/// One column of a primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryKeyDescriptor {
    pub column_name: String,
    pub pk_name: String,
}

/// One (index, column) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    pub index_name: String,
    pub column_name: String,
    pub unique: bool,
}

/// A live connection able to describe tables and run DDL
#[async_trait]
pub trait MetadataConnection: Send {
    /// Names of the base tables in `database`, optionally restricted to one table
    async fn table_names(&mut self, database: &str, table: Option<&str>) -> Result<Vec<String>>;

    /// Columns of a table in ordinal order, optionally restricted to one column
    async fn columns(
        &mut self,
        database: &str,
        table: &str,
        column: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>>;

    async fn primary_keys(&mut self, database: &str, table: &str) -> Result<Vec<PrimaryKeyDescriptor>>;

    async fn indexes(&mut self, database: &str, table: &str) -> Result<Vec<IndexDescriptor>>;

    /// First column of the first row returned by `sql`, if any
    async fn query_string(&mut self, sql: &str) -> Result<Option<String>>;

    /// Execute one statement
    async fn execute(&mut self, sql: &str) -> Result<()>;
}

/// Factory for live connections
#[async_trait]
pub trait ConnectionSupplier: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn MetadataConnection>>;
}
