//! Configuration handling for the schema modeller

use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

use crate::dialect::{Dialect, MySqlDialect, PostgresDialect};
use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete modeller configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Select the dialect matching the configured driver
    pub fn dialect(&self) -> Result<Arc<dyn Dialect>> {
        match self.database.driver.as_str() {
            "mysql" | "mariadb" => Ok(Arc::new(MySqlDialect::new(
                self.database.anonymous.unwrap_or(false),
            ))),
            "postgres" | "postgresql" => {
                Ok(Arc::new(PostgresDialect::new(self.database.schema_name())))
            }
            other => Err(Error::UnsupportedFeature(format!(
                "No dialect for database driver: {}",
                other
            ))),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub driver: String,
    pub url: String,
    /// Database whose tables are read and synchronized
    pub name: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    /// PostgreSQL schema holding the tables
    pub schema: Option<String>,
    /// Render MySQL table names without the database qualifier
    pub anonymous: Option<bool>,
}

impl DatabaseConfig {
    pub fn schema_name(&self) -> &str {
        self.schema.as_deref().unwrap_or("public")
    }
}

/// Synchronization behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SyncConfig {
    #[serde(default)]
    pub delete_missing_columns: bool,
    #[serde(default)]
    pub delete_missing_indexes: bool,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_stdout")]
    pub stdout: bool,
}

fn default_format() -> String {
    "text".to_string()
}

fn default_stdout() -> bool {
    true
}
