//! MySQL introspection over a pooled connection
//!
//! Reads `information_schema` and maps MySQL type names to portable wire types the
//! way a generic connectivity driver reports them.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, FromRow, MySql};

use crate::db::metadata::{ColumnDescriptor, IndexDescriptor, MetadataConnection, PrimaryKeyDescriptor};
use crate::error::Result;
use crate::schema::wire::WireType;

const MAX_SIZE: i64 = i32::MAX as i64;

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    column_type: String,
    column_size: i64,
    decimal_digits: i64,
    nullable: i64,
    auto_increment: i64,
    column_default: Option<String>,
}

#[derive(FromRow)]
struct PrimaryKeyRow {
    column_name: String,
    pk_name: String,
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
    column_name: String,
    is_unique: i64,
}

/// A MySQL connection checked out of the pool
pub struct MySqlMetadata {
    conn: PoolConnection<MySql>,
}

impl MySqlMetadata {
    pub fn new(conn: PoolConnection<MySql>) -> Self {
        Self { conn }
    }
}

/// Map a MySQL data type to its wire type and reported type name
fn wire_type_of(data_type: &str, column_type: &str) -> (WireType, String) {
    let data_type = data_type.to_ascii_lowercase();
    let wire_type = match data_type.as_str() {
        "bit" => WireType::Bit,
        "tinyint" if column_type.to_ascii_lowercase().starts_with("tinyint(1)") => {
            return (WireType::Boolean, "BOOLEAN".to_string())
        }
        "bool" | "boolean" => WireType::Boolean,
        "tinyint" => WireType::TinyInt,
        "smallint" => WireType::SmallInt,
        "mediumint" | "int" | "integer" => WireType::Integer,
        "bigint" => WireType::BigInt,
        "decimal" | "numeric" => WireType::Decimal,
        "float" => WireType::Real,
        "double" | "real" => WireType::Double,
        "char" | "enum" | "set" => WireType::Char,
        "varchar" => WireType::Varchar,
        "tinytext" | "text" | "mediumtext" | "longtext" | "json" => WireType::LongVarchar,
        "binary" => WireType::Binary,
        "varbinary" => WireType::VarBinary,
        "tinyblob" | "blob" | "mediumblob" | "longblob" => WireType::LongVarBinary,
        "date" | "year" => WireType::Date,
        "time" => WireType::Time,
        "datetime" | "timestamp" => WireType::Timestamp,
        _ => WireType::Other,
    };
    (wire_type, data_type.to_ascii_uppercase())
}

fn clamp_size(value: i64) -> u32 {
    value.clamp(0, MAX_SIZE) as u32
}

#[async_trait]
impl MetadataConnection for MySqlMetadata {
    async fn table_names(&mut self, database: &str, table: Option<&str>) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ?
              AND TABLE_TYPE = 'BASE TABLE'
              AND (? IS NULL OR TABLE_NAME = ?)
            ORDER BY TABLE_NAME
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(database)
            .bind(table)
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
                CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(DATA_TYPE AS CHAR(64)) AS data_type,
                CAST(COLUMN_TYPE AS CHAR(4096)) AS column_type,
                CAST(LEAST(COALESCE(CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, DATETIME_PRECISION, 0), 2147483647) AS SIGNED) AS column_size,
                CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS decimal_digits,
                CAST(IF(IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS nullable,
                CAST(IF(EXTRA LIKE '%auto_increment%', 1, 0) AS SIGNED) AS auto_increment,
                CAST(COLUMN_DEFAULT AS CHAR(4096)) AS column_default
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
              AND (? IS NULL OR COLUMN_NAME = ?)
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(database)
            .bind(table)
            .bind(column)
            .bind(column)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (wire_type, type_name) = wire_type_of(&row.data_type, &row.column_type);
                ColumnDescriptor {
                    name: row.column_name,
                    wire_code: wire_type.code(),
                    size: clamp_size(row.column_size),
                    decimal_digits: clamp_size(row.decimal_digits),
                    nullable: row.nullable != 0,
                    auto_increment: row.auto_increment != 0,
                    type_name,
                    default: row.column_default,
                }
            })
            .collect())
    }

    async fn primary_keys(&mut self, database: &str, table: &str) -> Result<Vec<PrimaryKeyDescriptor>> {
        let sql = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(CONSTRAINT_NAME AS CHAR(255)) AS pk_name
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
              AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query_as::<_, PrimaryKeyRow>(sql)
            .bind(database)
            .bind(table)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PrimaryKeyDescriptor {
                column_name: row.column_name,
                pk_name: row.pk_name,
            })
            .collect())
    }

    async fn indexes(&mut self, database: &str, table: &str) -> Result<Vec<IndexDescriptor>> {
        let sql = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR(255)) AS index_name,
                CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(IF(NON_UNIQUE = 0, 1, 0) AS SIGNED) AS is_unique
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
              AND COLUMN_NAME IS NOT NULL
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

        let rows = sqlx::query_as::<_, IndexRow>(sql)
            .bind(database)
            .bind(table)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| IndexDescriptor {
                index_name: row.index_name,
                column_name: row.column_name,
                unique: row.is_unique != 0,
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

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("tinyint", "tinyint(1)", WireType::Boolean)]
    #[case("tinyint", "tinyint(4)", WireType::TinyInt)]
    #[case("enum", "enum('a','b')", WireType::Char)]
    #[case("mediumtext", "mediumtext", WireType::LongVarchar)]
    #[case("longblob", "longblob", WireType::LongVarBinary)]
    #[case("datetime", "datetime", WireType::Timestamp)]
    #[case("geometry", "geometry", WireType::Other)]
    fn maps_mysql_types(#[case] data_type: &str, #[case] column_type: &str, #[case] expected: WireType) {
        assert_eq!(wire_type_of(data_type, column_type).0, expected);
    }

    #[test]
    fn enum_keeps_its_type_name() {
        assert_eq!(wire_type_of("enum", "enum('a')").1, "ENUM");
    }

    #[test]
    fn sizes_are_clamped() {
        assert_eq!(clamp_size(4294967295), 2147483647);
        assert_eq!(clamp_size(-1), 0);
    }
}
