//! Migration lifecycle.
//!
//! Three independent operations:
//!
//! - **make** diffs the models against the specs recorded by the latest
//!   migration file and writes a new file when anything changed
//! - **latest** applies every file not yet recorded, as one new batch
//! - **rollback** reverts the most recent batch, newest file first
//!
//! `latest` and `rollback` run on a single store connection that is closed
//! whether or not the operation succeeds. Statements are not wrapped in a
//! transaction: when a statement fails, the ones before it stay applied and
//! the failing file is not recorded.

use std::path::Path;

use strata_core::diff::Diff;
use strata_core::log::LogRecord;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{listify, MigrateError, Result};
use crate::file::{MigrationContents, MigrationDir, MigrationFile, MIGRATION_EXTENSION};
use crate::history::{MigrationHistory, MigrationRow, MigrationStore, MySqlStore};
use crate::model::{get_models, DirectoryModelSource, ModelSource};

/// A lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Make,
    Latest,
    Rollback,
}

/// Checks that recorded migrations and migration files agree.
///
/// Every row must name an existing file, and the n-th row must name the
/// n-th file.
pub fn validate_migration_data(rows: &[MigrationRow], files: &[MigrationFile]) -> Result<()> {
    let file_names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();
    let file_label = |name: &str| format!("{name}.{MIGRATION_EXTENSION}");

    let missing: Vec<String> = rows
        .iter()
        .filter(|row| !file_names.contains(&row.name.as_str()))
        .map(|row| file_label(&row.name))
        .collect();
    if !missing.is_empty() {
        return Err(MigrateError::DirectoryCorruption { missing });
    }

    let unordered: Vec<String> = rows
        .iter()
        .enumerate()
        .filter(|(i, row)| file_names.iter().position(|name| *name == row.name) != Some(*i))
        .map(|(_, row)| file_label(&row.name))
        .collect();
    if !unordered.is_empty() {
        return Err(MigrateError::UnorderedMigrations { unordered });
    }
    Ok(())
}

/// Runs lifecycle operations for one project.
pub struct Migrator {
    config: Config,
    models: Box<dyn ModelSource>,
    dry_run: bool,
    verbose: bool,
}

impl Migrator {
    /// Creates a migrator reading models from the project's `models/`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let models = Box::new(DirectoryModelSource::new(config.models_dir()));
        Self {
            config,
            models,
            dry_run: false,
            verbose: false,
        }
    }

    /// Replaces the model source.
    #[must_use]
    pub fn with_models(mut self, source: impl ModelSource + 'static) -> Self {
        self.models = Box::new(source);
        self
    }

    /// Enables dry-run mode (SQL is reported but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables extra narration.
    #[must_use]
    pub const fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn migrations(&self) -> MigrationDir {
        MigrationDir::new(self.config.migrations_dir())
    }

    /// Runs a command, connecting to the configured database when needed.
    pub async fn run(&self, command: Command) -> Result<Vec<LogRecord>> {
        match command {
            Command::Make => self.make().await,
            Command::Latest => self.latest(self.connect().await?).await,
            Command::Rollback => self.rollback(self.connect().await?).await,
        }
    }

    /// Opens the configured database connection.
    pub async fn connect(&self) -> Result<MySqlStore> {
        let options = self.config.connection()?.connect_options();
        MySqlStore::connect(&options).await
    }

    // ================================================================
    // make
    // ================================================================

    /// Writes a migration file for the changes since the latest one.
    pub async fn make(&self) -> Result<Vec<LogRecord>> {
        let defaults = self.config.schema_defaults();
        let models = get_models(self.models.as_ref(), &defaults).await?;
        let migrations = self.migrations();
        let previous = migrations.last_specs(&defaults).await?;

        let diff = Diff::new(&previous, &models.parsed)?;
        let mut logs = diff.logs().to_vec();
        if !diff.has_changed() {
            logs.push(LogRecord::info(
                "No schema change detected. No migration file was created.",
            ));
            return Ok(logs);
        }

        let contents = MigrationContents::new(diff.migration_data(), &models.original)?;
        if self.dry_run {
            logs.push(LogRecord::info(format!(
                "Dry run, no migration file written. Up:\n{}",
                contents.up
            )));
            return Ok(logs);
        }
        let path = migrations.create(&contents).await?;
        info!(path = %path.display(), "Created migration file");
        logs.push(LogRecord::success(format!(
            "Created migration file \"{}\".",
            self.display_path(&path)
        )));
        Ok(logs)
    }

    // ================================================================
    // latest / rollback
    // ================================================================

    /// Applies every pending migration file as one batch.
    pub async fn latest<S: MigrationStore>(&self, store: S) -> Result<Vec<LogRecord>> {
        let mut history = MigrationHistory::new(store, self.config.migrations_table());
        let result = self.apply_pending(&mut history).await;
        close(history, result).await
    }

    /// Reverts the most recent batch.
    pub async fn rollback<S: MigrationStore>(&self, store: S) -> Result<Vec<LogRecord>> {
        let mut history = MigrationHistory::new(store, self.config.migrations_table());
        let result = self.revert_last_batch(&mut history).await;
        close(history, result).await
    }

    /// Ensures the migrations table, then loads and cross-checks rows and
    /// files.
    async fn prepare<S: MigrationStore>(
        &self,
        history: &mut MigrationHistory<S>,
        logs: &mut Vec<LogRecord>,
    ) -> Result<(Vec<MigrationRow>, Vec<MigrationFile>)> {
        let rows = if self.dry_run {
            if history.has_table().await? {
                history.rows().await?
            } else {
                logs.push(LogRecord::info(format!(
                    "Dry run: the \"{}\" table would be created.",
                    history.table()
                )));
                Vec::new()
            }
        } else {
            logs.extend(history.ensure_table().await?);
            history.rows().await?
        };
        let files = self.migrations().files().await?;
        validate_migration_data(&rows, &files)?;
        Ok((rows, files))
    }

    async fn apply_pending<S: MigrationStore>(
        &self,
        history: &mut MigrationHistory<S>,
    ) -> Result<Vec<LogRecord>> {
        let mut logs = Vec::new();
        let (rows, files) = self.prepare(history, &mut logs).await?;
        let batch = rows.last().map_or(0, |row| row.batch) + 1;
        let pending = files.get(rows.len()..).unwrap_or_default();
        if pending.is_empty() {
            logs.push(LogRecord::info("Already up to date."));
            return Ok(logs);
        }

        for file in pending {
            let contents = file.read().await?;
            info!(name = %file.name, batch, "Applying migration");
            if self.dry_run {
                logs.push(LogRecord::info(format!("-- {}\n{}", file.name, contents.up)));
                continue;
            }
            history.execute(&contents.up).await?;
            history.record_applied(&file.name, batch).await?;
        }

        let verb = if self.dry_run { "Would migrate" } else { "Migrated" };
        logs.push(LogRecord::success(format!(
            "{verb} {} migration file(s) to the latest version. Batch number: {batch}.",
            pending.len()
        )));
        Ok(logs)
    }

    async fn revert_last_batch<S: MigrationStore>(
        &self,
        history: &mut MigrationHistory<S>,
    ) -> Result<Vec<LogRecord>> {
        let mut logs = Vec::new();
        let (rows, files) = self.prepare(history, &mut logs).await?;
        let Some(last_batch) = rows.last().map(|row| row.batch) else {
            logs.push(LogRecord::info("Nothing to roll back."));
            return Ok(logs);
        };

        let names: Vec<&str> = rows
            .iter()
            .filter(|row| row.batch == last_batch)
            .map(|row| row.name.as_str())
            .collect();
        let batch_files: Vec<&MigrationFile> = files
            .iter()
            .filter(|file| names.contains(&file.name.as_str()))
            .collect();

        if self.verbose {
            let paths: Vec<String> = batch_files
                .iter()
                .map(|file| self.display_path(&file.path))
                .collect();
            logs.push(LogRecord::info(format!(
                "Rolling back {} migration(s) of batch {last_batch}:\n{}",
                batch_files.len(),
                listify(&paths)
            )));
        }

        for file in batch_files.iter().rev() {
            let contents = file.read().await?;
            warn!(name = %file.name, batch = last_batch, "Rolling back migration");
            if self.dry_run {
                logs.push(LogRecord::info(format!("-- {}\n{}", file.name, contents.down)));
                continue;
            }
            history.execute(&contents.down).await?;
            history.record_unapplied(&file.name).await?;
        }

        let verb = if self.dry_run { "Would roll back" } else { "Rolled back" };
        logs.push(LogRecord::success(format!(
            "{verb} {} migration file(s). Batch number: {last_batch}.",
            batch_files.len()
        )));
        Ok(logs)
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(self.config.base_dir())
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Closes the store, then returns the operation's outcome.
///
/// The operation's error wins over a failure to close.
async fn close<S: MigrationStore, T>(mut history: MigrationHistory<S>, result: Result<T>) -> Result<T> {
    let closed = history.close().await;
    let value = result?;
    closed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn files(names: &[&str]) -> Vec<MigrationFile> {
        names
            .iter()
            .map(|name| MigrationFile {
                name: (*name).to_string(),
                path: PathBuf::from(format!("migrations/{name}.yml")),
            })
            .collect()
    }

    fn rows(names: &[(&str, i64)]) -> Vec<MigrationRow> {
        names
            .iter()
            .map(|(name, batch)| MigrationRow::new(*name, *batch))
            .collect()
    }

    #[test]
    fn test_consistent_data_passes() {
        let files = files(&["2018_12_01", "2018_12_02", "2018_12_03"]);
        assert!(validate_migration_data(&[], &files).is_ok());
        assert!(validate_migration_data(&rows(&[("2018_12_01", 1), ("2018_12_02", 2)]), &files).is_ok());
    }

    #[test]
    fn test_missing_file_is_corruption() {
        let err = validate_migration_data(
            &rows(&[("2018_12_01", 1), ("2018_12_05", 1)]),
            &files(&["2018_12_01", "2018_12_02"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::DirectoryCorruption { missing } if missing == ["2018_12_05.yml"]
        ));
    }

    #[test]
    fn test_out_of_band_file_is_unordered() {
        let err = validate_migration_data(
            &rows(&[("2018_12_01", 1), ("2018_12_03", 1)]),
            &files(&["2018_12_01", "2018_12_02", "2018_12_03"]),
        )
        .unwrap_err();
        assert!(matches!(
            &err,
            MigrateError::UnorderedMigrations { unordered } if unordered == &["2018_12_03.yml"]
        ));
        assert!(err.to_string().contains("2018_12_03.yml"));
    }
}
