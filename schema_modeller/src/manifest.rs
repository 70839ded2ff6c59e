//! Desired-schema manifests
//!
//! A manifest describes the tables a database should have, written as TOML or
//! YAML:
//!
//! ```toml
//! database = "shop"
//!
//! [[tables]]
//! name = "users"
//!
//! [[tables.columns]]
//! name = "id"
//! type = "integer"
//! key = true
//! auto_increment = true
//!
//! [[tables.columns]]
//! name = "email"
//! type = "string"
//! length = 255
//!
//! [[tables.indexes]]
//! name = "ix_users_email"
//! columns = ["email"]
//! unique = true
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnKind, Database, Index, Table};
use crate::schema::wire::WireType;

/// Load a manifest, choosing the format from the file extension
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Database> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        Error::ManifestError(format!("Failed to read manifest {}: {}", path.display(), e))
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => from_toml_str(&text),
        Some("yaml") | Some("yml") => from_yaml_str(&text),
        _ => Err(Error::ManifestError(format!(
            "Unsupported manifest format: {}",
            path.display()
        ))),
    }
}

pub fn from_toml_str(text: &str) -> Result<Database> {
    let manifest: Manifest =
        toml::from_str(text).map_err(|e| Error::ManifestError(e.to_string()))?;
    manifest.into_database()
}

pub fn from_yaml_str(text: &str) -> Result<Database> {
    let manifest: Manifest = serde_yaml::from_str(text)?;
    manifest.into_database()
}

/// Raw manifest document
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub database: String,
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize)]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub bits: Option<u32>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    pub default: Option<String>,
    pub wire_type: Option<WireType>,
}

#[derive(Debug, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl Manifest {
    /// Convert into schema model values
    pub fn into_database(self) -> Result<Database> {
        let mut database = Database::new(&self.database);
        for spec in self.tables {
            database.add_table(spec.into_table(&self.database)?);
        }
        Ok(database)
    }
}

impl TableSpec {
    fn into_table(self, database: &str) -> Result<Table> {
        let mut table = Table::new(database, &self.name);
        for column in self.columns {
            table.add_column(column.into_column(&self.name)?);
        }
        for spec in self.indexes {
            let mut index = Index::new(&spec.name, spec.unique);
            for column in spec.columns {
                index.add_column(column);
            }
            table
                .add_index(index)
                .map_err(|e| Error::ManifestError(e.to_string()))?;
        }
        Ok(table)
    }
}

impl ColumnSpec {
    fn into_column(self, table: &str) -> Result<Column> {
        let kind = self.column_kind(table)?;
        let mut builder = Column::builder(&self.name, kind)
            .nullable(self.nullable)
            .key(self.key)
            .auto_increment(self.auto_increment)
            .default_opt(self.default);
        if let Some(wire_type) = self.wire_type {
            builder = builder.wire_type(wire_type);
        }
        Ok(builder.build())
    }

    fn column_kind(&self, table: &str) -> Result<ColumnKind> {
        let kind = match self.kind.to_ascii_lowercase().as_str() {
            "string" => ColumnKind::String {
                length: self.require(self.length, "length", table)?,
            },
            "binary" => ColumnKind::Binary {
                length: self.require(self.length, "length", table)?,
            },
            "decimal" => ColumnKind::Decimal {
                precision: self.require(self.precision, "precision", table)?,
                scale: self.scale.unwrap_or(0),
            },
            "bit" => ColumnKind::Bit {
                bits: self.bits.unwrap_or(1),
            },
            "enum" => ColumnKind::Enum {
                values: self.labels(table)?,
            },
            "set" => ColumnKind::Set {
                values: self.labels(table)?,
            },
            "integer" => ColumnKind::Integer,
            "double" => ColumnKind::Double,
            "boolean" => ColumnKind::Boolean,
            "datetime" => ColumnKind::DateTime,
            "timestamp" => ColumnKind::TimeStamp,
            other => {
                return Err(Error::ManifestError(format!(
                    "Unknown type '{}' for column '{}' in table '{}'",
                    other, self.name, table
                )))
            }
        };
        Ok(kind)
    }

    fn require(&self, value: Option<u32>, field: &str, table: &str) -> Result<u32> {
        value.ok_or_else(|| {
            Error::ManifestError(format!(
                "Column '{}' in table '{}' needs a {}",
                self.name, table, field
            ))
        })
    }

    fn labels(&self, table: &str) -> Result<std::collections::BTreeSet<String>> {
        if self.values.is_empty() {
            return Err(Error::ManifestError(format!(
                "Column '{}' in table '{}' needs at least one value",
                self.name, table
            )));
        }
        Ok(self.values.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::Builder;

    const USERS_TOML: &str = r#"
database = "shop"

[[tables]]
name = "users"

[[tables.columns]]
name = "id"
type = "integer"
key = true
auto_increment = true

[[tables.columns]]
name = "email"
type = "string"
length = 255
nullable = true

[[tables.columns]]
name = "status"
type = "enum"
values = ["active", "banned"]
default = "active"

[[tables.indexes]]
name = "ix_users_email"
columns = ["email"]
unique = true
"#;

    #[test]
    fn reads_toml_manifest() {
        let database = from_toml_str(USERS_TOML).unwrap();
        let users = database.table("users").unwrap();

        assert_eq!(users.database(), "shop");
        let names: Vec<&str> = users.columns().map(|c| c.name()).collect();
        assert_eq!(names, vec!["id", "email", "status"]);

        let id = users.column("id").unwrap();
        assert!(id.is_key() && id.is_auto_increment());
        assert_eq!(users.column("email").unwrap().length(), Some(255));
        assert_eq!(users.column("status").unwrap().default(), Some("active"));
        assert!(users.index("ix_users_email").unwrap().is_unique());
    }

    #[test]
    fn reads_yaml_manifest_from_file() {
        let yaml = r#"
database: shop
tables:
  - name: orders
    columns:
      - name: total
        type: decimal
        precision: 10
        scale: 2
      - name: placed
        type: timestamp
        wire_type: DATE
"#;
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let database = load_from_file(file.path()).unwrap();
        let orders = database.table("orders").unwrap();
        assert_eq!(orders.column("total").unwrap().scale(), Some(2));
        assert_eq!(orders.column("placed").unwrap().wire_type(), WireType::Date);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let text = r#"
database = "shop"
[[tables]]
name = "t"
[[tables.columns]]
name = "c"
type = "money"
"#;
        assert!(matches!(from_toml_str(text), Err(Error::ManifestError(_))));
    }

    #[test]
    fn index_on_unknown_column_is_rejected() {
        let text = r#"
database = "shop"
[[tables]]
name = "t"
[[tables.columns]]
name = "c"
type = "integer"
[[tables.indexes]]
name = "ix"
columns = ["missing"]
"#;
        assert!(matches!(from_toml_str(text), Err(Error::ManifestError(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = Builder::new().suffix(".json").tempfile().unwrap();
        assert!(matches!(
            load_from_file(file.path()),
            Err(Error::ManifestError(_))
        ));
    }
}
