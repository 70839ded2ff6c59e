//! schema_modeller: models SQL schemas as data and reconciles live databases with them
//!
//! Tables, columns and indexes are plain values. The modeller reads them from a live
//! MySQL or PostgreSQL database, compares them with wanted definitions and issues
//! the dialect-specific DDL needed to make the live schema match.

pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod manifest;
pub mod modeller;
pub mod schema;
pub mod sync;
pub mod utils;

use indexmap::IndexMap;
use std::sync::Arc;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use db::metadata::{ConnectionSupplier, MetadataConnection};
pub use dialect::{Dialect, MySqlDialect, PostgresDialect};
pub use error::{Error, Result};
pub use modeller::Modeller;
pub use schema::diff::{compare, Diff};
pub use schema::types::{Column, ColumnKind, Database, Index, Table};
pub use schema::wire::WireType;
pub use sync::{Action, ActionType, Synchronizer};

/// Initialize the modeller with the specified configuration file
pub async fn init(config_path: &str) -> Result<SchemaSyncClient> {
    let config = config::load_from_file(config_path)?;
    SchemaSyncClient::new(config).await
}

/// The main client tying configuration, connection pool and dialect together
pub struct SchemaSyncClient {
    config: Config,
    db_connection: DatabaseConnection,
    modeller: Modeller,
}

impl SchemaSyncClient {
    /// Create a new client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let dialect = config.dialect()?;
        let db_connection = DatabaseConnection::connect(&config.database).await?;
        let modeller = Modeller::new(Arc::new(db_connection.clone()), dialect);

        Ok(Self {
            config,
            db_connection,
            modeller,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn modeller(&self) -> &Modeller {
        &self.modeller
    }

    /// A synchronizer using the configured deletion policy
    pub fn synchronizer(&self) -> Synchronizer {
        Synchronizer::from_config(self.modeller.clone(), &self.config.sync)
    }

    /// Read the configured database
    pub async fn read_database(&self) -> Result<Database> {
        self.modeller.read_database(&self.config.database.name).await
    }

    /// Differences between the live database and each wanted table, keyed by table name
    pub async fn plan_database(&self, want: &Database) -> Result<IndexMap<String, Vec<Diff>>> {
        let synchronizer = self.synchronizer();
        let mut plans = IndexMap::new();
        for table in want.tables() {
            plans.insert(table.name().to_string(), synchronizer.plan(table).await?);
        }
        Ok(plans)
    }

    /// Synchronize every wanted table, one after another
    pub async fn sync_database(&self, want: &Database, synchronizer: &Synchronizer) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        for table in want.tables() {
            actions.extend(synchronizer.synchronize(table).await?);
        }

        if actions.is_empty() {
            tracing::info!("Database schema is already in sync");
        }
        Ok(actions)
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.db_connection.close().await;
    }
}
