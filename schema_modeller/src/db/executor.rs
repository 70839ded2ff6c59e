//! SQL executor
//!
//! Runs DDL statements on a single checked-out connection. Statements of a batch
//! run in order and stop at the first failure; earlier statements are not undone.

use tracing::debug;

use crate::db::metadata::MetadataConnection;
use crate::error::Result;

/// SQL executor bound to one connection
pub struct SqlExecutor<'a> {
    connection: &'a mut dyn MetadataConnection,
}

impl<'a> SqlExecutor<'a> {
    /// Create a new SQL executor
    pub fn new(connection: &'a mut dyn MetadataConnection) -> Self {
        Self { connection }
    }

    /// Execute a single SQL statement
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "Executing statement");
        self.connection.execute(sql).await
    }

    /// Execute multiple SQL statements in order
    pub async fn execute_batch(&mut self, statements: &[String]) -> Result<()> {
        for statement in statements {
            self.execute(statement).await?;
        }

        Ok(())
    }

    /// Get the underlying connection
    pub fn connection(&mut self) -> &mut dyn MetadataConnection {
        &mut *self.connection
    }
}
