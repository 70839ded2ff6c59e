//! Database module for the schema modeller
//!
//! This module holds the introspection interface the core depends on and its
//! sqlx-backed MySQL and PostgreSQL implementations.

pub mod connection;
pub mod executor;
pub mod metadata;
pub mod mysql;
pub mod postgres;

// Re-export key types
pub use connection::DatabaseConnection;
pub use executor::SqlExecutor;
pub use metadata::{
    ColumnDescriptor, ConnectionSupplier, IndexDescriptor, MetadataConnection, PrimaryKeyDescriptor,
};
