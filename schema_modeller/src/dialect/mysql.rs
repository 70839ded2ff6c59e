//! MySQL and MariaDB syntax

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::db::metadata::{ColumnDescriptor, MetadataConnection};
use crate::dialect::{column_list, label_list, quote_literal, Dialect, LengthTiers};
use crate::error::Result;
use crate::schema::types::{Column, ColumnKind, Index, Table};
use crate::schema::wire::WireType;

static QUOTED_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'((?:[^']|'')*)'").expect("valid label pattern"));

/// Dialect for MySQL-family engines
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect {
    anonymous: bool,
}

impl MySqlDialect {
    /// Create the dialect. An anonymous dialect renders table names without the
    /// database qualifier, relying on the connection's default database.
    pub fn new(anonymous: bool) -> Self {
        Self { anonymous }
    }

    fn render_type(&self, column: &Column, skip_key: bool) -> Result<String> {
        let mut sql = match column.kind() {
            ColumnKind::Enum { values } => format!("ENUM({})", label_list(values)),
            ColumnKind::Set { values } => format!("SET({})", label_list(values)),
            ColumnKind::String { length } => {
                let length = *length;
                if length > 16_777_215 {
                    "LONGTEXT".to_string()
                } else if length > 65_535 {
                    "MEDIUMTEXT".to_string()
                } else if length > 255 {
                    "TEXT".to_string()
                } else if column.wire_type() == WireType::Char {
                    format!("CHAR({})", length)
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            ColumnKind::Binary { length } => {
                let length = *length;
                if length > 16_777_215 {
                    "LONGBLOB".to_string()
                } else if length > 65_535 {
                    "MEDIUMBLOB".to_string()
                } else if length > 255 {
                    "BLOB".to_string()
                } else if column.wire_type() == WireType::Binary {
                    format!("BINARY({})", length)
                } else {
                    format!("VARBINARY({})", length)
                }
            }
            ColumnKind::Decimal { precision, scale } => format!("DECIMAL({},{})", precision, scale),
            ColumnKind::Bit { bits } => format!("BIT({})", bits),
            ColumnKind::Integer => self.integer_type(column.wire_type()).to_string(),
            ColumnKind::Double => match column.wire_type() {
                WireType::Float | WireType::Real => "FLOAT".to_string(),
                _ => "DOUBLE".to_string(),
            },
            ColumnKind::Boolean => "BOOLEAN".to_string(),
            ColumnKind::DateTime => "DATETIME".to_string(),
            ColumnKind::TimeStamp => match column.wire_type() {
                WireType::Date => "DATE".to_string(),
                WireType::Time | WireType::TimeWithTimezone => "TIME".to_string(),
                _ => "TIMESTAMP".to_string(),
            },
        };

        sql.push_str(if column.is_nullable() { " NULL" } else { " NOT NULL" });

        if let Some(default) = column.default() {
            if !column.is_auto_increment() {
                sql.push_str(" DEFAULT ");
                sql.push_str(&render_default(column, default));
            }
        }

        if !skip_key && column.is_auto_increment() {
            sql.push_str(" AUTO_INCREMENT");
        }
        Ok(sql)
    }

    fn modify_statement(&self, table: &Table, column: &Column, skip_key: bool) -> Result<String> {
        let mut sql = format!(
            "ALTER TABLE {} MODIFY COLUMN {} {}",
            self.table_name(table),
            self.column_name(column.name()),
            self.render_type(column, skip_key)?
        );
        if !skip_key && column.is_key() {
            sql.push_str(" PRIMARY KEY");
        }
        Ok(sql)
    }

    fn read_labels_query(table: &Table, column: &str, offset: u32) -> String {
        format!(
            "SELECT CAST(SUBSTRING(COLUMN_TYPE,{}) AS CHAR(4096)) FROM information_schema.COLUMNS WHERE TABLE_SCHEMA={} AND TABLE_NAME={} AND COLUMN_NAME={}",
            offset,
            quote_literal(table.database()),
            quote_literal(table.name()),
            quote_literal(column)
        )
    }

    async fn read_labels(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        descriptor: &ColumnDescriptor,
        offset: u32,
    ) -> Result<BTreeSet<String>> {
        let sql = Self::read_labels_query(table, &descriptor.name, offset);
        let text = conn.query_string(&sql).await?.unwrap_or_default();
        Ok(self.extract_set_values(&text))
    }
}

fn render_default(column: &Column, default: &str) -> String {
    match column.kind() {
        ColumnKind::String { .. }
        | ColumnKind::Enum { .. }
        | ColumnKind::Set { .. }
        | ColumnKind::Binary { .. } => quote_literal(default),
        ColumnKind::Bit { .. } if default.chars().all(|c| c == '0' || c == '1') => {
            format!("b'{}'", default)
        }
        _ => default.to_string(),
    }
}

impl LengthTiers for MySqlDialect {}

#[async_trait]
impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn supports_set(&self) -> bool {
        true
    }

    fn database_name(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn table_name(&self, table: &Table) -> String {
        if self.anonymous {
            format!("`{}`", table.name().replace('`', "``"))
        } else {
            format!(
                "{}.`{}`",
                self.database_name(table.database()),
                table.name().replace('`', "``")
            )
        }
    }

    fn column_name(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn index_name(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn create_type(&self, _table: &Table, column: &Column) -> Result<String> {
        self.render_type(column, false)
    }

    fn create_table_query(&self, table: &Table) -> Result<Vec<String>> {
        let mut body = Vec::new();
        for column in table.columns() {
            body.push(format!(
                "{} {}",
                self.column_name(column.name()),
                self.create_type(table, column)?
            ));
        }

        let keys: Vec<String> = table
            .columns()
            .filter(|column| column.is_key())
            .map(|column| self.column_name(column.name()))
            .collect();
        if !keys.is_empty() {
            body.push(format!("PRIMARY KEY ({})", keys.join(",")));
        }

        for index in table.indexes() {
            body.push(format!(
                "{}KEY {} ({})",
                if index.is_unique() { "UNIQUE " } else { "" },
                self.index_name(index.name()),
                column_list(self, index)
            ));
        }

        Ok(vec![format!(
            "CREATE TABLE {} ({})",
            self.table_name(table),
            body.join(",")
        )])
    }

    fn add_column_query(&self, table: &Table, column: &Column) -> Result<Vec<String>> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.table_name(table),
            self.column_name(column.name()),
            self.create_type(table, column)?
        );
        if column.is_key() {
            sql.push_str(" PRIMARY KEY");
        }
        Ok(vec![sql])
    }

    async fn modify_column_query(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        current: Option<&Column>,
        changed: &Column,
    ) -> Result<Vec<String>> {
        let currently_key = match current {
            Some(current) => current.is_key(),
            None => conn
                .primary_keys(table.database(), table.name())
                .await?
                .iter()
                .any(|pk| pk.column_name.eq_ignore_ascii_case(changed.name())),
        };

        let mut statements = Vec::new();
        if currently_key {
            // The live column may have just been renamed to the changed name
            let unkeyed = match current {
                Some(current) => current.to_builder().name(changed.name()).build(),
                None => changed.clone(),
            };
            statements.push(format!(
                "{}, DROP PRIMARY KEY",
                self.modify_statement(table, &unkeyed, true)?
            ));
        }
        statements.push(self.modify_statement(table, changed, false)?);
        Ok(statements)
    }

    fn remove_index_query(&self, table: &Table, index: &Index) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.index_name(index.name()),
            self.table_name(table)
        )
    }

    fn rename_index_query(&self, table: &Table, current: &Index, changed: &Index) -> String {
        format!(
            "ALTER TABLE {} RENAME INDEX {} TO {}",
            self.table_name(table),
            self.index_name(current.name()),
            self.index_name(changed.name())
        )
    }

    fn integer_type(&self, wire_type: WireType) -> &'static str {
        match wire_type {
            WireType::TinyInt => "TINYINT",
            WireType::SmallInt => "SMALLINT",
            WireType::BigInt => "BIGINT",
            _ => "INT",
        }
    }

    async fn is_enum_column(
        &self,
        _conn: &mut dyn MetadataConnection,
        descriptor: &ColumnDescriptor,
    ) -> Result<bool> {
        Ok(descriptor.type_name.eq_ignore_ascii_case("ENUM"))
    }

    fn is_set_column(&self, descriptor: &ColumnDescriptor) -> bool {
        descriptor.type_name.eq_ignore_ascii_case("SET")
    }

    fn is_datetime_column(&self, descriptor: &ColumnDescriptor) -> bool {
        descriptor.type_name.eq_ignore_ascii_case("DATETIME")
    }

    async fn read_enum_values(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        descriptor: &ColumnDescriptor,
    ) -> Result<BTreeSet<String>> {
        // COLUMN_TYPE reads enum('a','b')
        self.read_labels(conn, table, descriptor, 5).await
    }

    async fn read_set_values(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        descriptor: &ColumnDescriptor,
    ) -> Result<BTreeSet<String>> {
        // COLUMN_TYPE reads set('a','b')
        self.read_labels(conn, table, descriptor, 4).await
    }

    fn extract_set_values(&self, text: &str) -> BTreeSet<String> {
        QUOTED_LABEL
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().replace("''", "'"))
            .collect()
    }

    fn extract_default(&self, raw: &str) -> Option<String> {
        match raw {
            "NULL" => None,
            "''" => Some(String::new()),
            _ if raw.len() > 1 && raw.starts_with('\'') && raw.ends_with('\'') => {
                Some(raw[1..raw.len() - 1].replace("''", "'"))
            }
            _ if raw.len() > 3 && (raw.starts_with("b'") || raw.starts_with("B'")) && raw.ends_with('\'') => {
                Some(raw[2..raw.len() - 1].to_string())
            }
            _ => Some(raw.to_string()),
        }
    }
}
