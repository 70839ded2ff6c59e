//! Database connection handling
//!
//! This module establishes connection pools and hands out per-operation
//! introspection connections from them.

use async_trait::async_trait;
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, MySql, Pool, Postgres};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::db::metadata::{ConnectionSupplier, MetadataConnection};
use crate::db::mysql::MySqlMetadata;
use crate::db::postgres::PgMetadata;
use crate::error::{Error, Result};

/// Enumeration of supported database pools
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres { pool: Pool<Postgres>, schema: String },
    MySql(Pool<MySql>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(10);
        let timeout_seconds = config.timeout_seconds.unwrap_or(30);

        match config.driver.as_str() {
            "postgres" | "postgresql" => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(Duration::from_secs(timeout_seconds))
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Postgres {
                    pool,
                    schema: config.schema_name().to_string(),
                })
            }
            "mysql" | "mariadb" => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(Duration::from_secs(timeout_seconds))
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::MySql(pool))
            }
            _ => Err(Error::DatabaseError(format!(
                "Unsupported database driver: {}",
                config.driver
            ))),
        }
    }

    /// Close the underlying pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        match self {
            DatabaseConnection::Postgres { pool, .. } => pool.close().await,
            DatabaseConnection::MySql(pool) => pool.close().await,
        }
    }
}

#[async_trait]
impl ConnectionSupplier for DatabaseConnection {
    async fn acquire(&self) -> Result<Box<dyn MetadataConnection>> {
        match self {
            DatabaseConnection::Postgres { pool, schema } => {
                let conn = pool.acquire().await?;
                Ok(Box::new(PgMetadata::new(conn, schema.clone())))
            }
            DatabaseConnection::MySql(pool) => {
                let conn = pool.acquire().await?;
                Ok(Box::new(MySqlMetadata::new(conn)))
            }
        }
    }
}
