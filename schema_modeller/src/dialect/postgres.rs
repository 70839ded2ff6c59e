//! PostgreSQL syntax
//!
//! PostgreSQL has no SET type and models enums as named types, so enum columns
//! carry a type `<table>_<column>` that is created before first use and swapped out
//! when its labels change.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::db::metadata::{ColumnDescriptor, MetadataConnection};
use crate::dialect::{label_list, normalize_length, quote_literal, Dialect, LengthTiers};
use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnKind, Index, Table};
use crate::schema::wire::WireType;

/// Longest length a VARCHAR may declare; longer strings become TEXT
const MAX_VARCHAR: u32 = 10_485_760;
const UNBOUNDED: u32 = 2_147_483_647;

/// Built-in string types never need an enum lookup
const BUILTIN_STRING_TYPES: [&str; 6] = ["varchar", "text", "bpchar", "json", "jsonb", "name"];

/// Dialect for PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    schema: String,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new("public")
    }
}

fn set_unsupported() -> Error {
    Error::UnsupportedFeature("SET data types are not supported for PostgreSQL".to_string())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl PostgresDialect {
    /// Create the dialect for tables living in `schema`
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Name of the enum type backing a column
    pub fn enum_type_name(table: &Table, column: &Column) -> String {
        format!("{}_{}", table.name(), column.name())
    }

    fn qualified(&self, name: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(name))
    }

    fn serial_type(wire_type: WireType) -> &'static str {
        match wire_type {
            WireType::TinyInt | WireType::SmallInt => "SMALLSERIAL",
            WireType::BigInt => "BIGSERIAL",
            _ => "SERIAL",
        }
    }

    /// The bare type of a column. `retype` selects the storage type of serial
    /// columns, which is what an ALTER ... TYPE must name.
    fn base_type(&self, table: &Table, column: &Column, retype: bool) -> Result<String> {
        let type_name = match column.kind() {
            ColumnKind::Enum { .. } => self.qualified(&Self::enum_type_name(table, column)),
            ColumnKind::Set { .. } => return Err(set_unsupported()),
            ColumnKind::String { length } => {
                if *length > MAX_VARCHAR {
                    "TEXT".to_string()
                } else if column.wire_type() == WireType::Char {
                    format!("CHAR({})", length)
                } else {
                    format!("VARCHAR({})", length)
                }
            }
            ColumnKind::Binary { .. } => "BYTEA".to_string(),
            ColumnKind::Decimal { precision, scale } => format!("DECIMAL({},{})", precision, scale),
            ColumnKind::Bit { bits } => format!("BIT({})", bits),
            ColumnKind::Integer => {
                if column.is_auto_increment() && !retype {
                    Self::serial_type(column.wire_type()).to_string()
                } else {
                    self.integer_type(column.wire_type()).to_string()
                }
            }
            ColumnKind::Double => match column.wire_type() {
                WireType::Float | WireType::Real => "REAL".to_string(),
                _ => "DOUBLE PRECISION".to_string(),
            },
            ColumnKind::Boolean => "BOOLEAN".to_string(),
            ColumnKind::DateTime => "TIMESTAMP".to_string(),
            ColumnKind::TimeStamp => match column.wire_type() {
                WireType::Date => "DATE".to_string(),
                WireType::Time => "TIME".to_string(),
                WireType::TimeWithTimezone => "TIMETZ".to_string(),
                _ => "TIMESTAMPTZ".to_string(),
            },
        };
        Ok(type_name)
    }

    fn render_default(column: &Column, default: &str) -> String {
        match column.kind() {
            ColumnKind::Bit { .. } if default.chars().all(|c| c == '0' || c == '1') => {
                format!("B'{}'", default)
            }
            ColumnKind::String { .. } | ColumnKind::Enum { .. } | ColumnKind::Binary { .. } => {
                quote_literal(default)
            }
            _ if is_expression(default) => default.to_string(),
            _ => quote_literal(default),
        }
    }

    /// Idempotent creation of the enum type backing `column`
    pub fn create_enum_type_query(&self, table: &Table, column: &Column) -> String {
        let type_name = Self::enum_type_name(table, column);
        let labels = column.values().map(label_list).unwrap_or_default();
        [
            "DO $$".to_string(),
            "BEGIN".to_string(),
            format!(
                "    IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = {}) THEN",
                quote_literal(&type_name)
            ),
            format!(
                "        CREATE TYPE {} AS ENUM ({});",
                self.qualified(&type_name),
                labels
            ),
            "    END IF;".to_string(),
            "END$$".to_string(),
        ]
        .join("\n")
    }

    fn enum_labels_query(type_name: &str) -> String {
        format!(
            "SELECT json_agg(e.enumlabel ORDER BY e.enumsortorder)::text FROM pg_type t JOIN pg_enum e ON e.enumtypid = t.oid WHERE t.typname = {}",
            quote_literal(type_name)
        )
    }

    async fn live_enum_labels(
        &self,
        conn: &mut dyn MetadataConnection,
        type_name: &str,
    ) -> Result<Option<BTreeSet<String>>> {
        let text = conn.query_string(&Self::enum_labels_query(type_name)).await?;
        let labels = text
            .map(|text| serde_json::from_str::<Vec<String>>(&text))
            .transpose()?;
        Ok(labels.map(|labels| labels.into_iter().collect()))
    }

    /// Sequence backing an auto-increment column, named the way SERIAL names it
    fn sequence_name(table: &Table, column: &Column) -> String {
        format!("{}_{}_seq", table.name(), column.name())
    }

    /// Statements retyping a column through text and re-applying nullability and
    /// default. Auto-increment columns get their sequence default back, with the
    /// sequence created first if the column was not serial before.
    fn retype_statements(&self, table: &Table, column: &Column) -> Result<Vec<String>> {
        let name = self.column_name(column.name());
        let base = self.base_type(table, column, true)?;
        let mut clauses = vec![
            format!("ALTER COLUMN {} DROP DEFAULT", name),
            format!("ALTER COLUMN {} TYPE {} USING ({}::text::{})", name, base, name, base),
            if column.is_nullable() {
                format!("ALTER COLUMN {} DROP NOT NULL", name)
            } else {
                format!("ALTER COLUMN {} SET NOT NULL", name)
            },
        ];

        if !column.is_auto_increment() {
            if let Some(default) = column.default() {
                clauses.push(format!(
                    "ALTER COLUMN {} SET DEFAULT {}",
                    name,
                    Self::render_default(column, default)
                ));
            }
            return Ok(vec![format!(
                "ALTER TABLE {} {}",
                self.table_name(table),
                clauses.join(", ")
            )]);
        }

        let sequence = self.qualified(&Self::sequence_name(table, column));
        clauses.push(format!(
            "ALTER COLUMN {} SET DEFAULT nextval({}::regclass)",
            name,
            quote_literal(&sequence)
        ));
        Ok(vec![
            format!("CREATE SEQUENCE IF NOT EXISTS {}", sequence),
            format!("ALTER TABLE {} {}", self.table_name(table), clauses.join(", ")),
            format!(
                "ALTER SEQUENCE {} AS {} OWNED BY {}.{}.{}",
                sequence,
                base,
                quote_ident(&self.schema),
                quote_ident(table.name()),
                name
            ),
        ])
    }
}

/// Defaults that are SQL expressions rather than literals
fn is_expression(default: &str) -> bool {
    default.contains('(') || default.to_ascii_uppercase().starts_with("CURRENT_")
}

impl LengthTiers for PostgresDialect {
    fn text_length(&self, length: u32) -> u32 {
        if length > MAX_VARCHAR {
            UNBOUNDED
        } else {
            normalize_length(length)
        }
    }

    fn binary_length(&self, _length: u32) -> u32 {
        UNBOUNDED
    }
}

#[async_trait]
impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn supports_set(&self) -> bool {
        false
    }

    fn database_name(&self, name: &str) -> String {
        quote_ident(name)
    }

    fn table_name(&self, table: &Table) -> String {
        format!(
            "{}.{}.{}",
            quote_ident(table.database()),
            quote_ident(&self.schema),
            quote_ident(table.name())
        )
    }

    fn column_name(&self, name: &str) -> String {
        quote_ident(name)
    }

    fn index_name(&self, name: &str) -> String {
        quote_ident(name)
    }

    fn create_type(&self, table: &Table, column: &Column) -> Result<String> {
        let mut sql = self.base_type(table, column, false)?;
        if !column.is_nullable() {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = column.default() {
            if !column.is_auto_increment() {
                sql.push_str(" DEFAULT ");
                sql.push_str(&Self::render_default(column, default));
            }
        }
        Ok(sql)
    }

    fn create_table_query(&self, table: &Table) -> Result<Vec<String>> {
        if table
            .columns()
            .any(|column| matches!(column.kind(), ColumnKind::Set { .. }))
        {
            return Err(set_unsupported());
        }

        let mut statements: Vec<String> = table
            .columns()
            .filter(|column| matches!(column.kind(), ColumnKind::Enum { .. }))
            .map(|column| self.create_enum_type_query(table, column))
            .collect();

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

        statements.push(format!(
            "CREATE TABLE {} ({})",
            self.table_name(table),
            body.join(",")
        ));
        for index in table.indexes() {
            statements.push(super::add_index_query(self, table, index));
        }
        Ok(statements)
    }

    fn add_column_query(&self, table: &Table, column: &Column) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        match column.kind() {
            ColumnKind::Set { .. } => return Err(set_unsupported()),
            ColumnKind::Enum { .. } => statements.push(self.create_enum_type_query(table, column)),
            _ => {}
        }

        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.table_name(table),
            self.column_name(column.name()),
            self.create_type(table, column)?
        );
        if column.is_key() {
            sql.push_str(" PRIMARY KEY");
        }
        statements.push(sql);
        Ok(statements)
    }

    async fn modify_column_query(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        current: Option<&Column>,
        changed: &Column,
    ) -> Result<Vec<String>> {
        let wanted = match changed.kind() {
            ColumnKind::Set { .. } => return Err(set_unsupported()),
            ColumnKind::Enum { values } => values,
            _ => return self.retype_statements(table, changed),
        };

        let type_name = Self::enum_type_name(table, changed);
        let live = match current {
            Some(current) => match current.kind() {
                ColumnKind::Enum { values } => Some(values.clone()),
                _ => None,
            },
            None => self.live_enum_labels(conn, &type_name).await?,
        };

        let old_name = format!("{}_old", type_name);
        let replaced = matches!(&live, Some(live) if live != wanted);
        let mut statements = Vec::new();
        if replaced {
            statements.push(format!(
                "ALTER TYPE {} RENAME TO {}",
                self.qualified(&type_name),
                quote_ident(&old_name)
            ));
        }
        if replaced || live.is_none() {
            statements.push(self.create_enum_type_query(table, changed));
        }
        statements.extend(self.retype_statements(table, changed)?);
        if replaced {
            statements.push(format!("DROP TYPE IF EXISTS {}", self.qualified(&old_name)));
        }
        Ok(statements)
    }

    fn remove_index_query(&self, _table: &Table, index: &Index) -> String {
        format!("DROP INDEX IF EXISTS {}", self.qualified(index.name()))
    }

    fn rename_index_query(&self, _table: &Table, current: &Index, changed: &Index) -> String {
        format!(
            "ALTER INDEX {} RENAME TO {}",
            self.qualified(current.name()),
            self.index_name(changed.name())
        )
    }

    fn integer_type(&self, wire_type: WireType) -> &'static str {
        match wire_type {
            WireType::TinyInt | WireType::SmallInt => "SMALLINT",
            WireType::BigInt => "BIGINT",
            _ => "INTEGER",
        }
    }

    async fn is_enum_column(
        &self,
        conn: &mut dyn MetadataConnection,
        descriptor: &ColumnDescriptor,
    ) -> Result<bool> {
        if descriptor.wire_code != WireType::Varchar.code()
            || BUILTIN_STRING_TYPES.contains(&descriptor.type_name.as_str())
        {
            return Ok(false);
        }
        let sql = format!(
            "SELECT t.typname::text FROM pg_type t WHERE t.typname = {} AND t.typtype = 'e'",
            quote_literal(&descriptor.type_name)
        );
        Ok(conn.query_string(&sql).await?.is_some())
    }

    fn is_set_column(&self, _descriptor: &ColumnDescriptor) -> bool {
        false
    }

    fn is_datetime_column(&self, descriptor: &ColumnDescriptor) -> bool {
        descriptor.type_name == "timestamp"
    }

    async fn read_enum_values(
        &self,
        conn: &mut dyn MetadataConnection,
        table: &Table,
        descriptor: &ColumnDescriptor,
    ) -> Result<BTreeSet<String>> {
        self.live_enum_labels(conn, &descriptor.type_name)
            .await?
            .ok_or_else(|| {
                Error::IntrospectionError(format!(
                    "No enum values found for column {} in table {}",
                    descriptor.name,
                    table.name()
                ))
            })
    }

    async fn read_set_values(
        &self,
        _conn: &mut dyn MetadataConnection,
        _table: &Table,
        _descriptor: &ColumnDescriptor,
    ) -> Result<BTreeSet<String>> {
        Err(set_unsupported())
    }

    /// Labels arrive as a JSON array so commas and spaces inside labels survive
    fn extract_set_values(&self, text: &str) -> BTreeSet<String> {
        serde_json::from_str::<Vec<String>>(text)
            .map(|labels| labels.into_iter().collect())
            .unwrap_or_default()
    }

    fn extract_default(&self, raw: &str) -> Option<String> {
        if raw == "NULL" || raw.starts_with("NULL::") {
            return None;
        }
        if let Some(rest) = raw.strip_prefix("B'").or_else(|| raw.strip_prefix("b'")) {
            return rest.split('\'').next().map(str::to_string);
        }
        if let Some(rest) = raw.strip_prefix('\'') {
            return Some(unquote(rest));
        }
        let value = match raw.find("::") {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        Some(value.trim().to_string())
    }
}

/// Read a single-quoted literal whose opening quote has been consumed
fn unquote(rest: &str) -> String {
    let mut value = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                value.push('\'');
                chars.next();
            } else {
                break;
            }
        } else {
            value.push(c);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("NULL", None)]
    #[case("NULL::character varying", None)]
    #[case("'active'::character varying", Some("active"))]
    #[case("'it''s'::text", Some("it's"))]
    #[case("'a::b'::text", Some("a::b"))]
    #[case("B'1'::\"bit\"", Some("1"))]
    #[case("0", Some("0"))]
    #[case("now()", Some("now()"))]
    #[case("true", Some("true"))]
    fn decodes_defaults(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(PostgresDialect::default().extract_default(raw).as_deref(), expected);
    }

    #[test]
    fn labels_keep_commas_and_spaces() {
        let labels = PostgresDialect::default().extract_set_values(r#"["a, b"," padded ","plain"]"#);
        let expected: BTreeSet<String> = ["a, b", " padded ", "plain"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn retyping_a_serial_column_keeps_its_sequence() {
        let table = Table::new("shop", "orders");
        let column = Column::integer("id")
            .wire_type(WireType::BigInt)
            .key(true)
            .auto_increment(true)
            .build();

        let statements = PostgresDialect::default()
            .retype_statements(&table, &column)
            .unwrap();

        assert_eq!(
            statements,
            vec![
                "CREATE SEQUENCE IF NOT EXISTS \"public\".\"orders_id_seq\"".to_string(),
                "ALTER TABLE \"shop\".\"public\".\"orders\" ALTER COLUMN \"id\" DROP DEFAULT, ALTER COLUMN \"id\" TYPE BIGINT USING (\"id\"::text::BIGINT), ALTER COLUMN \"id\" SET NOT NULL, ALTER COLUMN \"id\" SET DEFAULT nextval('\"public\".\"orders_id_seq\"'::regclass)".to_string(),
                "ALTER SEQUENCE \"public\".\"orders_id_seq\" AS BIGINT OWNED BY \"public\".\"orders\".\"id\"".to_string(),
            ]
        );
    }

    #[test]
    fn text_tier_follows_varchar_limit() {
        let dialect = PostgresDialect::default();
        assert_eq!(dialect.text_length(300), 65_535);
        assert_eq!(dialect.text_length(MAX_VARCHAR), 16_777_215);
        assert_eq!(dialect.text_length(MAX_VARCHAR + 1), UNBOUNDED);
        assert_eq!(dialect.binary_length(16), UNBOUNDED);
    }

    #[rstest]
    #[case(Column::integer("id").key(true).auto_increment(true), "SERIAL NOT NULL")]
    #[case(Column::integer("id").wire_type(WireType::BigInt).auto_increment(true), "BIGSERIAL NOT NULL")]
    #[case(Column::string("s", 20_000_000).nullable(true), "TEXT")]
    #[case(Column::binary("b", 16), "BYTEA NOT NULL")]
    #[case(Column::datetime("d"), "TIMESTAMP NOT NULL")]
    #[case(Column::timestamp("t"), "TIMESTAMPTZ NOT NULL")]
    #[case(Column::timestamp("t").default_value("now()"), "TIMESTAMPTZ NOT NULL DEFAULT now()")]
    #[case(Column::boolean("b").default_value("true"), "BOOLEAN NOT NULL DEFAULT 'true'")]
    #[case(Column::enumeration("status", ["a"]), "\"public\".\"orders_status\" NOT NULL")]
    fn renders_types(#[case] column: crate::schema::types::ColumnBuilder, #[case] expected: &str) {
        let table = Table::new("shop", "orders");
        let rendered = PostgresDialect::default()
            .create_type(&table, &column.build())
            .unwrap();
        assert_eq!(rendered, expected);
    }

    #[test]
    fn set_columns_are_unsupported() {
        let table = Table::new("shop", "orders");
        let column = Column::set("tags", ["a"]).build();
        assert!(matches!(
            PostgresDialect::default().create_type(&table, &column),
            Err(Error::UnsupportedFeature(_))
        ));
    }
}
