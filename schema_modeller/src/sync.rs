//! Schema synchronization
//!
//! A [`Synchronizer`] brings one live table in line with a wanted [`Table`] by
//! issuing the minimal sequence of modeller operations, and reports each step it
//! took as an [`Action`]. Columns are reconciled before indexes, and every
//! statement completes before the next is issued.

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::modeller::Modeller;
use crate::schema::diff::{compare_with, defaults_equivalent, Diff};
use crate::schema::types::{Column, Index, Table};

/// Kind of remediation step taken by the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateTable,
    AddColumn,
    DeleteColumn,
    ModifyColumn,
    RenameColumn,
    AddIndex,
    ModifyIndex,
    DeleteIndex,
}

/// An executed remediation step with a human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    action_type: ActionType,
    message: String,
}

impl Action {
    pub fn new(action_type: ActionType, message: impl Into<String>) -> Self {
        Self {
            action_type,
            message: message.into(),
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn create_table(table: &Table) -> Self {
        Self::new(
            ActionType::CreateTable,
            format!("Created table {} in database {}", table.name(), table.database()),
        )
    }

    fn add_column(table: &Table, column: &Column) -> Self {
        Self::new(
            ActionType::AddColumn,
            format!(
                "Added column {} to table {} in database {}",
                column.name(),
                table.name(),
                table.database()
            ),
        )
    }

    fn rename_column(table: &Table, current: &str, changed: &str) -> Self {
        Self::new(
            ActionType::RenameColumn,
            format!(
                "Renamed column {} to {} in table {} in database {}",
                current,
                changed,
                table.name(),
                table.database()
            ),
        )
    }

    fn modify_column(table: &Table, column: &Column) -> Self {
        Self::new(
            ActionType::ModifyColumn,
            format!(
                "Modified column {} in table {} in database {}",
                column.name(),
                table.name(),
                table.database()
            ),
        )
    }

    fn delete_column(table: &Table, column: &Column) -> Self {
        Self::new(
            ActionType::DeleteColumn,
            format!(
                "Deleted column {} from table {} in database {}",
                column.name(),
                table.name(),
                table.database()
            ),
        )
    }

    fn add_index(table: &Table, index: &Index) -> Self {
        Self::new(
            ActionType::AddIndex,
            format!(
                "Created index {} on table {} in database {}",
                index.name(),
                table.name(),
                table.database()
            ),
        )
    }

    fn modify_index(table: &Table, index: &Index) -> Self {
        Self::new(
            ActionType::ModifyIndex,
            format!(
                "Modified index {} in table {} in database {}",
                index.name(),
                table.name(),
                table.database()
            ),
        )
    }

    fn delete_index(table: &Table, index: &Index) -> Self {
        Self::new(
            ActionType::DeleteIndex,
            format!(
                "Deleted index {} from table {} in database {}",
                index.name(),
                table.name(),
                table.database()
            ),
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Reconciles live tables with wanted tables
pub struct Synchronizer {
    modeller: Modeller,
    delete_missing_columns: bool,
    delete_missing_indexes: bool,
}

impl Synchronizer {
    pub fn new(modeller: Modeller) -> Self {
        Self {
            modeller,
            delete_missing_columns: false,
            delete_missing_indexes: false,
        }
    }

    pub fn from_config(modeller: Modeller, config: &SyncConfig) -> Self {
        Self::new(modeller)
            .delete_missing_columns(config.delete_missing_columns)
            .delete_missing_indexes(config.delete_missing_indexes)
    }

    /// Drop live columns the wanted table does not have, instead of widening them to nullable
    pub fn delete_missing_columns(mut self, delete: bool) -> Self {
        self.delete_missing_columns = delete;
        self
    }

    /// Drop live indexes the wanted table does not have
    pub fn delete_missing_indexes(mut self, delete: bool) -> Self {
        self.delete_missing_indexes = delete;
        self
    }

    pub fn modeller(&self) -> &Modeller {
        &self.modeller
    }

    /// Bring the live table in line with `want`, returning the steps taken in order
    pub async fn synchronize(&self, want: &Table) -> Result<Vec<Action>> {
        if !self.modeller.table_exists(want).await? {
            self.modeller.create_table(want).await?;
            let action = Action::create_table(want);
            info!("{}", action);
            return Ok(vec![action]);
        }

        let mut actions = self.synchronize_columns(want).await?;
        actions.extend(self.synchronize_indexes(want).await?);
        Ok(actions)
    }

    /// Report the differences between the live table and `want` without changing anything
    pub async fn plan(&self, want: &Table) -> Result<Vec<Diff>> {
        if !self.modeller.table_exists(want).await? {
            return Ok(want
                .columns()
                .map(|column| Diff::MissColumn {
                    column: column.name().to_string(),
                })
                .collect());
        }

        let live = self.modeller.read_table(want.database(), want.name()).await?;
        Ok(compare_with(self.modeller.dialect(), &live, want))
    }

    async fn synchronize_columns(&self, want: &Table) -> Result<Vec<Action>> {
        let live = self.modeller.read_table(want.database(), want.name()).await?;
        let mut actions = Vec::new();

        for column in want.columns() {
            if live.column(column.name()).is_none() {
                self.modeller.add_column(want, column).await?;
                self.record(&mut actions, Action::add_column(want, column));
            }
        }

        for column in want.columns() {
            let Some(current) = live.column(column.name()) else {
                continue;
            };
            if current.name() != column.name() {
                self.modeller
                    .rename_column(want, current.name(), column.name())
                    .await?;
                self.record(
                    &mut actions,
                    Action::rename_column(want, current.name(), column.name()),
                );
            }
            if !self.is_same_column(current, column) {
                self.modeller.modify_column_from(want, current, column).await?;
                self.record(&mut actions, Action::modify_column(want, column));
            }
        }

        for current in live.columns() {
            if want.column(current.name()).is_some() {
                continue;
            }
            if self.delete_missing_columns {
                self.modeller.delete_column(want, current.name()).await?;
                self.record(&mut actions, Action::delete_column(want, current));
            } else if !current.is_nullable() {
                warn!(
                    table = %want.name(),
                    column = %current.name(),
                    "Column is not wanted; making it nullable instead of deleting it"
                );
                let widened = current.to_builder().nullable(true).build();
                self.modeller.modify_column_from(want, current, &widened).await?;
                self.record(&mut actions, Action::modify_column(want, &widened));
            }
        }

        Ok(actions)
    }

    async fn synchronize_indexes(&self, want: &Table) -> Result<Vec<Action>> {
        let live = self.modeller.read_table(want.database(), want.name()).await?;
        let mut actions = Vec::new();

        for index in want.indexes() {
            match live.index(index.name()) {
                None => {
                    self.modeller.add_index(want, index).await?;
                    self.record(&mut actions, Action::add_index(want, index));
                }
                Some(current) if !self.is_same_index(want, index, &live, current) => {
                    self.modeller.modify_index(want, current, index).await?;
                    self.record(&mut actions, Action::modify_index(want, index));
                }
                Some(_) => {}
            }
        }

        if self.delete_missing_indexes {
            for current in live.indexes() {
                if want.index(current.name()).is_none() {
                    self.modeller.remove_index(&live, current).await?;
                    self.record(&mut actions, Action::delete_index(want, current));
                }
            }
        }

        Ok(actions)
    }

    /// Columns are the same when the engine would store them identically.
    /// Names are handled by renaming, so they are not compared here.
    fn is_same_column(&self, one: &Column, other: &Column) -> bool {
        one.is_auto_increment() == other.is_auto_increment()
            && one.is_nullable() == other.is_nullable()
            && one.is_key() == other.is_key()
            && self.modeller.dialect().types_are_compatible(one, other)
            && defaults_equivalent(one, other)
    }

    fn is_same_index(&self, want: &Table, index: &Index, live: &Table, current: &Index) -> bool {
        index.name() == current.name()
            && index.is_unique() == current.is_unique()
            && index.same_columns(current)
            && index.columns().all(|name| {
                match (want.column(name), live.column(name)) {
                    (Some(wanted), Some(existing)) => self.is_same_column(existing, wanted),
                    _ => false,
                }
            })
    }

    fn record(&self, actions: &mut Vec<Action>, action: Action) {
        info!("{}", action);
        actions.push(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_name_table_and_database() {
        let table = Table::new("shop", "users");
        let column = Column::string("email", 255).build();
        assert_eq!(
            Action::add_column(&table, &column).message(),
            "Added column email to table users in database shop"
        );
        assert_eq!(
            Action::rename_column(&table, "Email", "email").to_string(),
            "Renamed column Email to email in table users in database shop"
        );
    }

    #[test]
    fn action_types_serialize_upper_case() {
        let action = Action::new(ActionType::ModifyIndex, "Modified index ix in table t in database d");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action_type"], "MODIFY_INDEX");
    }
}
