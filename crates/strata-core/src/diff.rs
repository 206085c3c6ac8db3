//! Forward and backward DDL between two schema snapshots.
//!
//! Tables are matched across snapshots by `_fid`, so a table whose name
//! changed is renamed rather than dropped and recreated. Statements are
//! emitted in a fixed order: previous tables in their listed order, then
//! tables only present in the current snapshot in their listed order.
//!
//! `down` is meant to be replayed front to back, like `up`. For a renamed
//! table it starts with the reverse rename, so later statements address the
//! table by its previous name.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::log::LogRecord;
use crate::schema::{IndexSpec, TableSpec};
use crate::sql;

/// Serialized form of a diff: statements joined by newlines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationData {
    pub up: String,
    pub down: String,
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    up: Vec<String>,
    down: Vec<String>,
    logs: Vec<LogRecord>,
}

impl Diff {
    /// Compares the `previous` snapshot against `current`.
    ///
    /// # Errors
    ///
    /// Fails when a column names an unregistered datatype.
    pub fn new(previous: &[TableSpec], current: &[TableSpec]) -> Result<Self> {
        let mut diff = Self::default();
        for old in previous {
            match current.iter().find(|table| table.fid == old.fid) {
                Some(new) => diff.diff_tables(old, new)?,
                None => diff.dropped_table(old)?,
            }
        }
        for new in current {
            if !previous.iter().any(|table| table.fid == new.fid) {
                diff.created_table(new)?;
            }
        }
        debug!(up = diff.up.len(), down = diff.down.len(), "Computed schema diff");
        Ok(diff)
    }

    /// Forward statements.
    #[must_use]
    pub fn up(&self) -> &[String] {
        &self.up
    }

    /// Backward statements.
    #[must_use]
    pub fn down(&self) -> &[String] {
        &self.down
    }

    /// Narration of table and index changes.
    #[must_use]
    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    #[must_use]
    pub fn has_changed(&self) -> bool {
        !self.up.is_empty() || !self.down.is_empty()
    }

    #[must_use]
    pub fn migration_data(&self) -> MigrationData {
        MigrationData {
            up: self.up.join("\n"),
            down: self.down.join("\n"),
        }
    }

    // ================================================================
    // Table level
    // ================================================================

    fn created_table(&mut self, table: &TableSpec) -> Result<()> {
        self.up.extend(sql::create_table_lines(table)?);
        self.logs
            .push(LogRecord::info(format!("Creates table \"{}\".", table.table_name)));
        for index in &table.schema.indexes {
            self.up.push(sql::create_index(&table.table_name, index));
            self.log_created_index(&table.table_name, index);
        }
        self.down.push(sql::drop_table(&table.table_name));
        Ok(())
    }

    fn dropped_table(&mut self, table: &TableSpec) -> Result<()> {
        self.up.push(sql::drop_table(&table.table_name));
        self.logs
            .push(LogRecord::warn(format!("Drops table \"{}\".", table.table_name)));
        self.down.extend(sql::create_table_lines(table)?);
        for index in &table.schema.indexes {
            self.down.push(sql::create_index(&table.table_name, index));
        }
        Ok(())
    }

    fn diff_tables(&mut self, old: &TableSpec, new: &TableSpec) -> Result<()> {
        let old_name = old.table_name.as_str();
        let new_name = new.table_name.as_str();
        let renamed = old_name != new_name;

        if renamed {
            self.up.push(sql::rename_table(old_name, new_name));
            self.down.push(sql::rename_table(new_name, old_name));
            self.logs.push(LogRecord::info(format!(
                "Renames table \"{old_name}\" to \"{new_name}\"."
            )));
            // Index names carry the table name.
            for index in retained_indexes(old, new) {
                self.up.push(sql::rename_index(old_name, new_name, index));
                self.down.push(sql::rename_index(new_name, old_name, index));
            }
        }

        if old.schema.charset != new.schema.charset || old.schema.collation != new.schema.collation
        {
            self.up.push(sql::change_table_charset(
                new_name,
                &new.schema.charset,
                &new.schema.collation,
            ));
            self.down.push(sql::change_table_charset(
                old_name,
                &old.schema.charset,
                &old.schema.collation,
            ));
        }

        self.diff_columns(old, new)?;
        self.diff_indexes(old, new);
        Ok(())
    }

    // ================================================================
    // Columns and indexes
    // ================================================================

    fn diff_columns(&mut self, old: &TableSpec, new: &TableSpec) -> Result<()> {
        let old_name = old.table_name.as_str();
        let new_name = new.table_name.as_str();
        let new_columns = &new.schema.columns;
        for (name, old_column) in &old.schema.columns {
            match new_columns.get(name) {
                Some(new_column) if new_column == old_column => {}
                Some(new_column) => {
                    self.up.push(sql::alter_column(new_name, name, new_column)?);
                    self.down.push(sql::alter_column(old_name, name, old_column)?);
                }
                None => {
                    self.up.push(sql::drop_column(new_name, name));
                    self.down.push(sql::add_column(old_name, name, old_column)?);
                }
            }
        }
        for (name, new_column) in new_columns {
            if !old.schema.columns.contains_key(name) {
                self.up.push(sql::add_column(new_name, name, new_column)?);
                self.down.push(sql::drop_column(old_name, name));
            }
        }
        Ok(())
    }

    fn diff_indexes(&mut self, old: &TableSpec, new: &TableSpec) {
        let old_name = old.table_name.as_str();
        let new_name = new.table_name.as_str();
        for index in &old.schema.indexes {
            if !new.schema.indexes.contains(index) {
                self.up.push(sql::drop_index_named(
                    new_name,
                    &sql::index_name(old_name, index),
                ));
                self.down.push(sql::create_index(old_name, index));
                self.logs.push(LogRecord::warn(format!(
                    "Drops \"{}\" index on table \"{new_name}\".",
                    index.kind
                )));
            }
        }
        for index in &new.schema.indexes {
            if !old.schema.indexes.contains(index) {
                self.up.push(sql::create_index(new_name, index));
                self.down.push(sql::drop_index_named(
                    old_name,
                    &sql::index_name(new_name, index),
                ));
                self.log_created_index(new_name, index);
            }
        }
    }

    fn log_created_index(&mut self, table: &str, index: &IndexSpec) {
        self.logs.push(LogRecord::info(format!(
            "Creates \"{}\" index on table \"{table}\".",
            index.kind
        )));
    }
}

fn retained_indexes<'a>(old: &'a TableSpec, new: &'a TableSpec) -> impl Iterator<Item = &'a IndexSpec> {
    old.schema
        .indexes
        .iter()
        .filter(|index| new.schema.indexes.contains(index))
}
