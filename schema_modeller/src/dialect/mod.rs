//! SQL dialects
//!
//! A [`Dialect`] turns schema model values into DDL for one SQL engine and makes the
//! engine-specific decisions the reader and synchronizer need: type compatibility,
//! enum/set detection, default decoding and length normalization. Statement shapes
//! shared by every engine are free functions taking the dialect as a parameter.

mod mysql;
mod postgres;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::db::metadata::{ColumnDescriptor, MetadataConnection};
use crate::error::Result;
use crate::schema::types::{Column, ColumnKind, Index, Table};
use crate::schema::wire::WireType;

/// Ceiling tiers for string and binary lengths
pub const LENGTH_TIERS: [u32; 4] = [255, 65_535, 16_777_215, 2_147_483_647];

/// Map a declared length to its storage tier.
///
/// Lengths up to 255 are kept as they are; anything longer is promoted to the
/// smallest tier that holds it.
pub fn normalize_length(length: u32) -> u32 {
    if length <= LENGTH_TIERS[0] {
        return length;
    }
    LENGTH_TIERS
        .iter()
        .copied()
        .find(|tier| length <= *tier)
        .unwrap_or(LENGTH_TIERS[3])
}

/// Length normalization shared between comparison and DDL rendering
pub trait LengthTiers {
    fn text_length(&self, length: u32) -> u32 {
        normalize_length(length)
    }

    fn binary_length(&self, length: u32) -> u32 {
        normalize_length(length)
    }
}

/// The tier function without any engine-specific adjustment
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTiers;

impl LengthTiers for StandardTiers {}

/// Capability interface implemented once per SQL engine
#[async_trait]
pub trait Dialect: LengthTiers + Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the engine has a native multi-valued SET type
    fn supports_set(&self) -> bool;

    fn database_name(&self, name: &str) -> String;

    fn table_name(&self, table: &Table) -> String;

    fn column_name(&self, name: &str) -> String;

    fn index_name(&self, name: &str) -> String;

    /// Render a column's type together with its nullability, default and
    /// auto-increment modifiers. Primary keys are not included.
    fn create_type(&self, table: &Table, column: &Column) -> Result<String>;

    fn create_table_query(&self, table: &Table) -> Result<Vec<String>>;

    fn add_column_query(&self, table: &Table, column: &Column) -> Result<Vec<String>>;

    /// Statements turning the live column into `changed`.
    ///
    /// When `current` is unknown the dialect may consult the live database through
    /// `conn` to decide which statements are needed.
    async fn modify_column_query(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        current: Option<&Column>,
        changed: &Column,
    ) -> Result<Vec<String>>;

    fn remove_index_query(&self, table: &Table, index: &Index) -> String;

    fn rename_index_query(&self, table: &Table, current: &Index, changed: &Index) -> String;

    /// Drop the live index under its own name, then create the wanted one
    fn modify_index_query(&self, table: &Table, current: &Index, changed: &Index) -> Vec<String> {
        vec![
            self.remove_index_query(table, current),
            add_index_query(self, table, changed),
        ]
    }

    /// Name of the plain integer type used for a wire type
    fn integer_type(&self, wire_type: WireType) -> &'static str;

    /// Whether two columns have types the engine stores identically
    fn types_are_compatible(&self, one: &Column, other: &Column) -> bool {
        match (one.kind(), other.kind()) {
            (ColumnKind::Enum { values: a }, ColumnKind::Enum { values: b })
            | (ColumnKind::Set { values: a }, ColumnKind::Set { values: b }) => a == b,
            (ColumnKind::Bit { bits: a }, ColumnKind::Bit { bits: b }) => a == b,
            (ColumnKind::Bit { bits }, ColumnKind::Boolean)
            | (ColumnKind::Boolean, ColumnKind::Bit { bits }) => *bits == 1,
            (ColumnKind::Boolean, ColumnKind::Boolean) => true,
            (ColumnKind::String { length: a }, ColumnKind::String { length: b }) => {
                self.text_length(*a) == self.text_length(*b)
            }
            (ColumnKind::Binary { length: a }, ColumnKind::Binary { length: b }) => {
                self.binary_length(*a) == self.binary_length(*b)
            }
            (
                ColumnKind::Decimal { precision, scale },
                ColumnKind::Decimal {
                    precision: other_precision,
                    scale: other_scale,
                },
            ) => precision == other_precision && scale == other_scale,
            (ColumnKind::Integer, ColumnKind::Integer) => {
                self.integer_type(one.wire_type()) == self.integer_type(other.wire_type())
            }
            (ColumnKind::TimeStamp, ColumnKind::TimeStamp) => {
                date_time_family(one.wire_type()) == date_time_family(other.wire_type())
            }
            (ColumnKind::DateTime, ColumnKind::DateTime) | (ColumnKind::Double, ColumnKind::Double) => {
                true
            }
            _ => false,
        }
    }

    async fn is_enum_column(
        &self,
        conn: &mut dyn MetadataConnection,
        descriptor: &ColumnDescriptor,
    ) -> Result<bool>;

    fn is_set_column(&self, descriptor: &ColumnDescriptor) -> bool;

    /// Whether a date/time column maps to the DateTime variant rather than TimeStamp
    fn is_datetime_column(&self, descriptor: &ColumnDescriptor) -> bool;

    async fn read_enum_values(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        descriptor: &ColumnDescriptor,
    ) -> Result<BTreeSet<String>>;

    async fn read_set_values(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        descriptor: &ColumnDescriptor,
    ) -> Result<BTreeSet<String>>;

    /// Parse the label list of an enum or set type declaration
    fn extract_set_values(&self, text: &str) -> BTreeSet<String>;

    /// Decode a raw default as reported by the engine
    fn extract_default(&self, raw: &str) -> Option<String>;
}

/// Date, time and timestamp columns are only interchangeable within their family
fn date_time_family(wire_type: WireType) -> WireType {
    match wire_type {
        WireType::TimeWithTimezone => WireType::Time,
        WireType::TimestampWithTimezone => WireType::Timestamp,
        other => other,
    }
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Comma-separated, quoted labels of an enum or set
pub(crate) fn label_list(values: &BTreeSet<String>) -> String {
    values
        .iter()
        .map(|value| quote_literal(value))
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn column_list<D: Dialect + ?Sized>(dialect: &D, index: &Index) -> String {
    index
        .columns()
        .map(|name| dialect.column_name(name))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn add_index_query<D: Dialect + ?Sized>(dialect: &D, table: &Table, index: &Index) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.is_unique() { "UNIQUE " } else { "" },
        dialect.index_name(index.name()),
        dialect.table_name(table),
        column_list(dialect, index)
    )
}

pub fn rename_column_query<D: Dialect + ?Sized>(
    dialect: &D,
    table: &Table,
    current: &str,
    changed: &str,
) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        dialect.table_name(table),
        dialect.column_name(current),
        dialect.column_name(changed)
    )
}

pub fn delete_column_query<D: Dialect + ?Sized>(dialect: &D, table: &Table, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        dialect.table_name(table),
        dialect.column_name(column)
    )
}

pub fn delete_table_query<D: Dialect + ?Sized>(dialect: &D, table: &Table) -> String {
    format!("DROP TABLE {}", dialect.table_name(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(100, 100)]
    #[case(255, 255)]
    #[case(256, 65_535)]
    #[case(300, 65_535)]
    #[case(60_000, 65_535)]
    #[case(65_535, 65_535)]
    #[case(70_000, 16_777_215)]
    #[case(16_777_216, 2_147_483_647)]
    #[case(u32::MAX, 2_147_483_647)]
    fn lengths_promote_to_tiers(#[case] length: u32, #[case] tier: u32) {
        assert_eq!(normalize_length(length), tier);
    }

    #[test]
    fn literals_escape_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
