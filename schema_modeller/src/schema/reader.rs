//! Database metadata reader
//!
//! Builds schema model values from a live database. Raw column descriptors are
//! classified into column variants in a fixed order: enum, set, string, binary,
//! date/time, then the remaining numeric, boolean and bit types.

use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::trace;

use crate::db::metadata::{ColumnDescriptor, MetadataConnection};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnKind, Database, Index, Table};
use crate::schema::wire::WireType;

/// Reads tables through a dialect's classification rules
pub struct MetadataReader<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> MetadataReader<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Read every base table of a database
    pub async fn read_database(
        &self,
        conn: &mut dyn MetadataConnection,
        name: &str,
    ) -> Result<Database> {
        let names = conn
            .table_names(name, None)
            .await
            .map_err(|e| Error::introspection(format!("Error scanning database '{}'", name), e))?;

        let mut database = Database::new(name);
        for table_name in names {
            database.add_table(self.read_table(conn, name, &table_name).await?);
        }
        Ok(database)
    }

    /// Read one table with its columns, primary key and indexes
    pub async fn read_table(
        &self,
        conn: &mut dyn MetadataConnection,
        database: &str,
        name: &str,
    ) -> Result<Table> {
        self.scan_table(conn, database, name)
            .await
            .map_err(|e| Error::introspection(format!("Error scanning table '{}'", name), e))
    }

    pub async fn table_exists(&self, conn: &mut dyn MetadataConnection, table: &Table) -> Result<bool> {
        let names = conn
            .table_names(table.database(), Some(table.name()))
            .await
            .map_err(|e| Error::introspection(format!("Error checking table '{}'", table.name()), e))?;
        Ok(!names.is_empty())
    }

    async fn scan_table(
        &self,
        conn: &mut dyn MetadataConnection,
        database: &str,
        name: &str,
    ) -> Result<Table> {
        if conn.table_names(database, Some(name)).await?.is_empty() {
            return Err(Error::IntrospectionError(format!(
                "Table '{}' does not exist in database '{}'",
                name, database
            )));
        }

        let mut table = Table::new(database, name);
        for descriptor in conn.columns(database, name, None).await? {
            let column = self.classify(conn, &table, &descriptor).await?;
            trace!(table = %name, column = %column.name(), kind = column.kind().label(), "Classified column");
            table.add_column(column);
        }

        // Primary keys are carried by the key flag, never as an index
        let mut pk_names = HashSet::new();
        for pk in conn.primary_keys(database, name).await? {
            let column = table.column(&pk.column_name).cloned().ok_or_else(|| {
                Error::IntrospectionError(format!(
                    "Cannot find column '{}' in table '{}' yet it is a primary key",
                    pk.column_name, name
                ))
            })?;
            table.add_column(column.to_builder().key(true).build());
            pk_names.insert(pk.pk_name);
        }

        let mut indexes: IndexMap<String, Index> = IndexMap::new();
        for row in conn.indexes(database, name).await? {
            if pk_names.contains(&row.index_name) {
                continue;
            }
            indexes
                .entry(row.index_name.clone())
                .or_insert_with(|| Index::new(row.index_name.clone(), row.unique))
                .add_column(row.column_name);
        }
        for index in indexes.into_values() {
            table.add_index(index)?;
        }

        Ok(table)
    }

    /// Map one raw descriptor to a column
    pub async fn classify(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        descriptor: &ColumnDescriptor,
    ) -> Result<Column> {
        let wire_type = WireType::from_code(descriptor.wire_code)?;
        let default = descriptor
            .default
            .as_deref()
            .and_then(|raw| self.dialect.extract_default(raw));

        let builder = if self.dialect.is_enum_column(conn, descriptor).await? {
            let values = self.dialect.read_enum_values(conn, table, descriptor).await?;
            Column::builder(&descriptor.name, ColumnKind::Enum { values })
        } else if self.dialect.is_set_column(descriptor) {
            let values = self.dialect.read_set_values(conn, table, descriptor).await?;
            Column::builder(&descriptor.name, ColumnKind::Set { values })
        } else if wire_type.is_string() {
            Column::string(&descriptor.name, descriptor.size).wire_type(wire_type)
        } else if wire_type.is_binary() {
            Column::binary(&descriptor.name, descriptor.size).wire_type(wire_type)
        } else if wire_type.is_date_time() {
            if self.dialect.is_datetime_column(descriptor) {
                Column::datetime(&descriptor.name).wire_type(wire_type)
            } else {
                Column::timestamp(&descriptor.name).wire_type(wire_type)
            }
        } else {
            let builder = match wire_type {
                WireType::Bit => Column::bit(&descriptor.name, descriptor.size),
                WireType::Boolean => Column::boolean(&descriptor.name),
                WireType::Decimal | WireType::Numeric => {
                    Column::decimal(&descriptor.name, descriptor.size, descriptor.decimal_digits)
                }
                WireType::Double | WireType::Float | WireType::Real => Column::double(&descriptor.name),
                WireType::TinyInt | WireType::SmallInt | WireType::Integer | WireType::BigInt => {
                    Column::integer(&descriptor.name)
                }
                other => {
                    return Err(Error::UnsupportedType(format!(
                        "Unsupported wire type {} for column '{}' in table '{}'. BUG!",
                        other,
                        descriptor.name,
                        table.name()
                    )))
                }
            };
            builder.wire_type(wire_type)
        };

        Ok(builder
            .nullable(descriptor.nullable)
            .auto_increment(descriptor.auto_increment)
            .default_opt(default)
            .build())
    }
}
