//! Schema module for the modeller
//!
//! This module holds the schema model, the metadata reader that builds it from a
//! live database, and the comparison of two models.

pub mod diff;
pub mod reader;
pub mod types;
pub mod wire;

// Re-export key types
pub use diff::{compare, compare_with, defaults_equivalent, Diff};
pub use reader::MetadataReader;
pub use types::{Column, ColumnBuilder, ColumnKind, Database, Index, Table};
pub use wire::WireType;
