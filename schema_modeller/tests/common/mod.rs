//! In-memory stand-in for a live database
//!
//! Serves canned column, primary key and index descriptors, answers scalar
//! queries by SQL fragment and records every executed statement.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use schema_modeller::db::{
    ColumnDescriptor, ConnectionSupplier, IndexDescriptor, MetadataConnection, PrimaryKeyDescriptor,
};
use schema_modeller::{Error, Result, WireType};

#[derive(Default)]
struct FakeTable {
    database: String,
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_keys: Vec<PrimaryKeyDescriptor>,
    indexes: Vec<IndexDescriptor>,
}

#[derive(Default)]
struct State {
    tables: Vec<FakeTable>,
    answers: Vec<(String, String)>,
    failures: Vec<(String, String)>,
    executed: Vec<String>,
    queries: Vec<String>,
    acquisitions: usize,
}

impl State {
    fn table(&self, database: &str, name: &str) -> Option<&FakeTable> {
        self.tables
            .iter()
            .find(|t| t.database == database && t.name.eq_ignore_ascii_case(name))
    }

    fn table_mut(&mut self, database: &str, name: &str) -> &mut FakeTable {
        let position = self
            .tables
            .iter()
            .position(|t| t.database == database && t.name == name)
            .expect("table registered before its keys and indexes");
        &mut self.tables[position]
    }
}

/// Shared handle to the fake; clones see the same state
#[derive(Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, database: &str, name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.state.lock().unwrap().tables.push(FakeTable {
            database: database.to_string(),
            name: name.to_string(),
            columns,
            ..FakeTable::default()
        });
        self
    }

    pub fn with_primary_key(self, database: &str, table: &str, column: &str, pk_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .table_mut(database, table)
            .primary_keys
            .push(PrimaryKeyDescriptor {
                column_name: column.to_string(),
                pk_name: pk_name.to_string(),
            });
        self
    }

    pub fn with_index(self, database: &str, table: &str, index: &str, column: &str, unique: bool) -> Self {
        self.state
            .lock()
            .unwrap()
            .table_mut(database, table)
            .indexes
            .push(IndexDescriptor {
                index_name: index.to_string(),
                column_name: column.to_string(),
                unique,
            });
        self
    }

    /// Answer any scalar query containing `fragment` with `value`
    pub fn answer(self, fragment: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .answers
            .push((fragment.to_string(), value.to_string()));
        self
    }

    /// Fail any statement containing `fragment` with a transport error
    pub fn fail_on(self, fragment: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((fragment.to_string(), message.to_string()));
        self
    }

    pub fn supplier(&self) -> Arc<dyn ConnectionSupplier> {
        Arc::new(self.clone())
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn acquisitions(&self) -> usize {
        self.state.lock().unwrap().acquisitions
    }
}

#[async_trait]
impl ConnectionSupplier for FakeDatabase {
    async fn acquire(&self) -> Result<Box<dyn MetadataConnection>> {
        self.state.lock().unwrap().acquisitions += 1;
        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeConnection {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl MetadataConnection for FakeConnection {
    async fn table_names(&mut self, database: &str, table: Option<&str>) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .iter()
            .filter(|t| t.database == database)
            .filter(|t| table.map_or(true, |name| t.name.eq_ignore_ascii_case(name)))
            .map(|t| t.name.clone())
            .collect())
    }

    async fn columns(
        &mut self,
        database: &str,
        table: &str,
        column: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .table(database, table)
            .map(|t| {
                t.columns
                    .iter()
                    .filter(|c| column.map_or(true, |name| c.name.eq_ignore_ascii_case(name)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn primary_keys(&mut self, database: &str, table: &str) -> Result<Vec<PrimaryKeyDescriptor>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .table(database, table)
            .map(|t| t.primary_keys.clone())
            .unwrap_or_default())
    }

    async fn indexes(&mut self, database: &str, table: &str) -> Result<Vec<IndexDescriptor>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .table(database, table)
            .map(|t| t.indexes.clone())
            .unwrap_or_default())
    }

    async fn query_string(&mut self, sql: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(sql.to_string());
        Ok(state
            .answers
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, value)| value.clone()))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some((_, message)) = state
            .failures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
        {
            return Err(Error::DatabaseError(message.clone()));
        }
        state.executed.push(sql.to_string());
        Ok(())
    }
}

/// A NOT NULL column descriptor without default
pub fn column(name: &str, wire_type: WireType, size: u32, type_name: &str) -> ColumnDescriptor {
    ColumnDescriptor {
        name: name.to_string(),
        wire_code: wire_type.code(),
        size,
        decimal_digits: 0,
        nullable: false,
        auto_increment: false,
        type_name: type_name.to_string(),
        default: None,
    }
}

/// `id INTEGER PRIMARY KEY AUTO_INCREMENT` as MySQL reports it
pub fn mysql_id() -> ColumnDescriptor {
    ColumnDescriptor {
        auto_increment: true,
        ..column("id", WireType::Integer, 10, "INT")
    }
}
