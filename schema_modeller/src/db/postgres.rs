//! PostgreSQL introspection over a pooled connection

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, FromRow, Postgres};

use crate::db::metadata::{ColumnDescriptor, IndexDescriptor, MetadataConnection, PrimaryKeyDescriptor};
use crate::error::Result;
use crate::schema::wire::WireType;

const UNBOUNDED: u32 = i32::MAX as u32;

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    udt_name: String,
    character_maximum_length: Option<i64>,
    numeric_precision: Option<i64>,
    numeric_scale: Option<i64>,
    is_nullable: String,
    column_default: Option<String>,
}

#[derive(FromRow)]
struct PrimaryKeyRow {
    constraint_name: String,
    column_name: String,
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
    column_name: String,
    is_unique: bool,
}

/// A PostgreSQL connection checked out of the pool, scoped to one schema
pub struct PgMetadata {
    conn: PoolConnection<Postgres>,
    schema: String,
}

impl PgMetadata {
    pub fn new(conn: PoolConnection<Postgres>, schema: impl Into<String>) -> Self {
        Self {
            conn,
            schema: schema.into(),
        }
    }
}

/// Map a PostgreSQL column to its wire type and declared size
fn wire_type_of(row: &ColumnRow) -> (WireType, u32) {
    let length = row
        .character_maximum_length
        .map(|l| l.clamp(0, i64::from(i32::MAX)) as u32);
    let precision = row
        .numeric_precision
        .map(|p| p.clamp(0, i64::from(i32::MAX)) as u32)
        .unwrap_or(0);

    if row.data_type == "USER-DEFINED" {
        return (WireType::Varchar, UNBOUNDED);
    }

    match row.udt_name.as_str() {
        "bool" => (WireType::Boolean, 1),
        "bit" | "varbit" => (WireType::Bit, length.unwrap_or(1)),
        "int2" => (WireType::SmallInt, precision),
        "int4" => (WireType::Integer, precision),
        "int8" => (WireType::BigInt, precision),
        "numeric" => (WireType::Numeric, precision),
        "float4" => (WireType::Real, precision),
        "float8" => (WireType::Double, precision),
        "bpchar" => (WireType::Char, length.unwrap_or(1)),
        "varchar" => (WireType::Varchar, length.unwrap_or(UNBOUNDED)),
        "text" | "json" | "jsonb" => (WireType::Varchar, UNBOUNDED),
        "bytea" => (WireType::Binary, UNBOUNDED),
        "date" => (WireType::Date, 0),
        "time" | "timetz" => (WireType::Time, 0),
        "timestamp" | "timestamptz" => (WireType::Timestamp, 0),
        _ => (WireType::Other, 0),
    }
}

fn is_sequence_default(default: &Option<String>) -> bool {
    default
        .as_deref()
        .map_or(false, |d| d.starts_with("nextval("))
}

#[async_trait]
impl MetadataConnection for PgMetadata {
    async fn table_names(&mut self, database: &str, table: Option<&str>) -> Result<Vec<String>> {
        let sql = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_catalog = $1
              AND table_schema = $2
              AND table_type = 'BASE TABLE'
              AND ($3::text IS NULL OR table_name = $3)
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(database)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows.into_iter().map(|row| row.table_name).collect())
    }

    async fn columns(
        &mut self,
        database: &str,
        table: &str,
        column: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        let sql = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                udt_name::text AS udt_name,
                character_maximum_length::bigint AS character_maximum_length,
                numeric_precision::bigint AS numeric_precision,
                numeric_scale::bigint AS numeric_scale,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default
            FROM information_schema.columns
            WHERE table_catalog = $1
              AND table_schema = $2
              AND table_name = $3
              AND ($4::text IS NULL OR column_name = $4)
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(database)
            .bind(&self.schema)
            .bind(table)
            .bind(column)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (wire_type, size) = wire_type_of(&row);
                let auto_increment = is_sequence_default(&row.column_default);
                ColumnDescriptor {
                    wire_code: wire_type.code(),
                    size,
                    decimal_digits: row.numeric_scale.unwrap_or(0).max(0) as u32,
                    nullable: row.is_nullable == "YES",
                    auto_increment,
                    type_name: row.udt_name,
                    default: if auto_increment { None } else { row.column_default },
                    name: row.column_name,
                }
            })
            .collect())
    }

    async fn primary_keys(&mut self, database: &str, table: &str) -> Result<Vec<PrimaryKeyDescriptor>> {
        let sql = r#"
            SELECT
                tc.constraint_name::text AS constraint_name,
                kcu.column_name::text AS column_name
            FROM
                information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE
                tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_catalog = $1
                AND tc.table_schema = $2
                AND tc.table_name = $3
            ORDER BY kcu.ordinal_position
        "#;

        let rows = sqlx::query_as::<_, PrimaryKeyRow>(sql)
            .bind(database)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PrimaryKeyDescriptor {
                column_name: row.column_name,
                pk_name: row.constraint_name,
            })
            .collect())
    }

    async fn indexes(&mut self, _database: &str, table: &str) -> Result<Vec<IndexDescriptor>> {
        let sql = r#"
            SELECT
                i.relname::text AS index_name,
                a.attname::text AS column_name,
                ix.indisunique AS is_unique
            FROM
                pg_index ix
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            JOIN pg_namespace n ON n.oid = t.relnamespace
            WHERE
                t.relname = $1
                AND n.nspname = $2
            ORDER BY i.relname, a.attnum
        "#;

        let rows = sqlx::query_as::<_, IndexRow>(sql)
            .bind(table)
            .bind(&self.schema)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| IndexDescriptor {
                index_name: row.index_name,
                column_name: row.column_name,
                unique: row.is_unique,
            })
            .collect())
    }

    async fn query_string(&mut self, sql: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, Option<String>>(sql)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(value.flatten())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        (&mut *self.conn).execute(sql).await?;
        Ok(())
    }
}
