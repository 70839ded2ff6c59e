//! DDL-issuing operations
//!
//! The [`Modeller`] applies structural changes to a live database through a
//! [`Dialect`]. Every operation checks out one connection from the injected
//! [`ConnectionSupplier`], renders all of its statements, runs them in order and
//! releases the connection when it returns. Failures are wrapped in
//! [`Error::ModellerError`] naming the affected object, except capability errors
//! which propagate unchanged.

use std::sync::Arc;
use tracing::info;

use crate::db::executor::SqlExecutor;
use crate::db::metadata::{ConnectionSupplier, MetadataConnection};
use crate::dialect::{
    add_index_query, delete_column_query, delete_table_query, rename_column_query, Dialect,
    MySqlDialect, PostgresDialect,
};
use crate::error::{Error, Result};
use crate::schema::reader::MetadataReader;
use crate::schema::types::{Column, Database, Index, Table};

/// Applies schema changes to one database server
#[derive(Clone)]
pub struct Modeller {
    supplier: Arc<dyn ConnectionSupplier>,
    dialect: Arc<dyn Dialect>,
}

impl Modeller {
    pub fn new(supplier: Arc<dyn ConnectionSupplier>, dialect: Arc<dyn Dialect>) -> Self {
        Self { supplier, dialect }
    }

    /// A modeller speaking MySQL
    pub fn mysql(supplier: Arc<dyn ConnectionSupplier>, anonymous: bool) -> Self {
        Self::new(supplier, Arc::new(MySqlDialect::new(anonymous)))
    }

    /// A modeller speaking PostgreSQL against the given schema
    pub fn postgres(supplier: Arc<dyn ConnectionSupplier>, schema: impl Into<String>) -> Self {
        Self::new(supplier, Arc::new(PostgresDialect::new(schema)))
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn supports_set(&self) -> bool {
        self.dialect.supports_set()
    }

    /// Read every table of a database
    pub async fn read_database(&self, name: &str) -> Result<Database> {
        let mut conn = self
            .acquire()
            .await
            .map_err(|e| Error::introspection(format!("Error scanning database '{}'", name), e))?;
        self.reader().read_database(conn.as_mut(), name).await
    }

    /// Read one table of a database
    pub async fn read_table(&self, database: &str, name: &str) -> Result<Table> {
        let mut conn = self
            .acquire()
            .await
            .map_err(|e| Error::introspection(format!("Error scanning table '{}'", name), e))?;
        self.reader().read_table(conn.as_mut(), database, name).await
    }

    /// Whether the table exists in its database
    pub async fn table_exists(&self, table: &Table) -> Result<bool> {
        let mut conn = self.acquire().await.map_err(|e| {
            Error::introspection(format!("Error checking table '{}'", table.name()), e)
        })?;
        self.reader().table_exists(conn.as_mut(), table).await
    }

    pub async fn create_table(&self, table: &Table) -> Result<()> {
        let context = format!("Error creating table '{}'", table.name());
        let statements = self
            .dialect
            .create_table_query(table)
            .map_err(|e| Error::modeller(&context, e))?;
        self.run(context, &statements).await?;
        info!(table = %table.name(), database = %table.database(), "Created table");
        Ok(())
    }

    pub async fn delete_table(&self, table: &Table) -> Result<()> {
        let context = format!("Error deleting table '{}'", table.name());
        let statements = vec![delete_table_query(self.dialect(), table)];
        self.run(context, &statements).await?;
        info!(table = %table.name(), database = %table.database(), "Deleted table");
        Ok(())
    }

    pub async fn add_column(&self, table: &Table, column: &Column) -> Result<()> {
        let context = format!(
            "Error adding column '{}' to table '{}'",
            column.name(),
            table.name()
        );
        let statements = self
            .dialect
            .add_column_query(table, column)
            .map_err(|e| Error::modeller(&context, e))?;
        self.run(context, &statements).await?;
        info!(table = %table.name(), column = %column.name(), "Added column");
        Ok(())
    }

    pub async fn rename_column(&self, table: &Table, current: &str, changed: &str) -> Result<()> {
        let context = format!(
            "Error renaming column '{}' in table '{}'",
            current,
            table.name()
        );
        let statements = vec![rename_column_query(self.dialect(), table, current, changed)];
        self.run(context, &statements).await?;
        info!(table = %table.name(), from = %current, to = %changed, "Renamed column");
        Ok(())
    }

    pub async fn delete_column(&self, table: &Table, column: &str) -> Result<()> {
        let context = format!(
            "Error deleting column '{}' from table '{}'",
            column,
            table.name()
        );
        let statements = vec![delete_column_query(self.dialect(), table, column)];
        self.run(context, &statements).await?;
        info!(table = %table.name(), column = %column, "Deleted column");
        Ok(())
    }

    /// Modify a column whose live definition is unknown; the dialect may look it up
    pub async fn modify_column(&self, table: &Table, changed: &Column) -> Result<()> {
        self.modify(table, None, changed).await
    }

    /// Modify a column whose live definition is already known
    pub async fn modify_column_from(
        &self,
        table: &Table,
        current: &Column,
        changed: &Column,
    ) -> Result<()> {
        self.modify(table, Some(current), changed).await
    }

    pub async fn add_index(&self, table: &Table, index: &Index) -> Result<()> {
        let context = format!(
            "Error adding index '{}' in table '{}'",
            index.name(),
            table.name()
        );
        let statements = vec![add_index_query(self.dialect(), table, index)];
        self.run(context, &statements).await?;
        info!(table = %table.name(), index = %index.name(), "Added index");
        Ok(())
    }

    pub async fn rename_index(&self, table: &Table, current: &Index, changed: &Index) -> Result<()> {
        let context = format!(
            "Error renaming index '{}' in table '{}'",
            current.name(),
            table.name()
        );
        let statements = vec![self.dialect.rename_index_query(table, current, changed)];
        self.run(context, &statements).await?;
        info!(table = %table.name(), from = %current.name(), to = %changed.name(), "Renamed index");
        Ok(())
    }

    /// Replace the live index `current` with `changed`
    pub async fn modify_index(&self, table: &Table, current: &Index, changed: &Index) -> Result<()> {
        let context = format!(
            "Error modifying index '{}' in table '{}'",
            changed.name(),
            table.name()
        );
        let statements = self.dialect.modify_index_query(table, current, changed);
        self.run(context, &statements).await?;
        info!(table = %table.name(), index = %changed.name(), "Modified index");
        Ok(())
    }

    pub async fn remove_index(&self, table: &Table, index: &Index) -> Result<()> {
        let context = format!(
            "Error removing index '{}' in table '{}'",
            index.name(),
            table.name()
        );
        let statements = vec![self.dialect.remove_index_query(table, index)];
        self.run(context, &statements).await?;
        info!(table = %table.name(), index = %index.name(), "Removed index");
        Ok(())
    }

    async fn modify(&self, table: &Table, current: Option<&Column>, changed: &Column) -> Result<()> {
        let context = format!(
            "Error modifying column '{}' in table '{}'",
            changed.name(),
            table.name()
        );
        let result: Result<()> = async {
            let mut conn = self.acquire().await?;
            let statements = self
                .dialect
                .modify_column_query(conn.as_mut(), table, current, changed)
                .await?;
            SqlExecutor::new(conn.as_mut())
                .execute_batch(&statements)
                .await
        }
        .await;
        result.map_err(|e| Error::modeller(context, e))?;
        info!(table = %table.name(), column = %changed.name(), "Modified column");
        Ok(())
    }

    /// Run prepared statements on one connection
    async fn run(&self, context: String, statements: &[String]) -> Result<()> {
        let result: Result<()> = async {
            let mut conn = self.acquire().await?;
            SqlExecutor::new(conn.as_mut())
                .execute_batch(statements)
                .await
        }
        .await;
        result.map_err(|e| Error::modeller(context, e))
    }

    async fn acquire(&self) -> Result<Box<dyn MetadataConnection>> {
        self.supplier.acquire().await
    }

    fn reader(&self) -> MetadataReader<'_> {
        MetadataReader::new(self.dialect.as_ref())
    }
}
