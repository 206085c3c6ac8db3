//! Lifecycle scenarios against an in-memory migrations store.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;
use strata_migrate::config::EnvironmentConfig;
use strata_migrate::prelude::*;
use tempfile::TempDir;

// ================================================================
// In-memory store
// ================================================================

#[derive(Debug, Default)]
struct State {
    has_table: bool,
    rows: Vec<MigrationRow>,
    executed: Vec<String>,
    fail_on: Option<String>,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryStore(Arc<Mutex<State>>);

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    fn row_names(&self) -> Vec<(String, i64)> {
        self.state()
            .rows
            .iter()
            .map(|row| (row.name.clone(), row.batch))
            .collect()
    }
}

#[async_trait]
impl MigrationStore for MemoryStore {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_on.as_deref().is_some_and(|needle| sql.contains(needle)) {
            return Err(MigrateError::Database(sqlx::Error::Protocol(
                "statement failed".into(),
            )));
        }
        if sql.contains("`strata_migrations`") {
            state.has_table = true;
        }
        state.executed.push(sql.to_string());
        Ok(())
    }

    async fn has_table(&mut self, _table: &str) -> Result<bool> {
        Ok(self.state().has_table)
    }

    async fn rows(&mut self, _table: &str) -> Result<Vec<MigrationRow>> {
        let mut rows = self.state().rows.clone();
        rows.sort_by(|a, b| a.batch.cmp(&b.batch).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    async fn insert_row(&mut self, _table: &str, name: &str, batch: i64) -> Result<()> {
        self.state().rows.push(MigrationRow::new(name, batch));
        Ok(())
    }

    async fn delete_row(&mut self, _table: &str, name: &str) -> Result<u64> {
        let mut state = self.state();
        let before = state.rows.len();
        state.rows.retain(|row| row.name != name);
        Ok((before - state.rows.len()) as u64)
    }

    async fn close(&mut self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }
}

// ================================================================
// Helpers
// ================================================================

fn project() -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), "test", EnvironmentConfig::default());
    (dir, config)
}

fn users_model(columns: serde_json::Value) -> ModelFile {
    ModelFile::new(
        "users",
        "models/users.yml",
        json!({ "tableName": "users", "_fid": "Zq0xK2pLm1", "schema": { "columns": columns } }),
    )
}

async fn write_migration(config: &Config, name: &str, table: &str) {
    let contents = MigrationContents {
        up: format!("CREATE TABLE `{table}` (\n  PRIMARY KEY (`id`)\n);"),
        down: format!("DROP TABLE `{table}`;"),
        specs: "[]".into(),
    };
    MigrationDir::new(config.migrations_dir())
        .write(name, &contents)
        .await
        .unwrap();
}

fn messages(records: &[LogRecord]) -> String {
    records
        .iter()
        .map(|record| record.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

// ================================================================
// make
// ================================================================

#[tokio::test]
async fn test_make_writes_once_per_change() {
    let (_dir, config) = project();
    let migrator = Migrator::new(config)
        .with_models(StaticModelSource::new(vec![users_model(json!({ "email": "varchar" }))]));

    let records = migrator.make().await.unwrap();
    assert_eq!(records.last().unwrap().level, LogLevel::Success);
    assert!(messages(&records).contains("Creates table \"users\"."));

    let files = migrator.migrations().files().await.unwrap();
    assert_eq!(files.len(), 1);
    let contents = files[0].read().await.unwrap();
    assert!(contents.up.starts_with("CREATE TABLE `users` ("));
    assert_eq!(contents.down, "DROP TABLE `users`;");
    assert_eq!(contents.specs().unwrap()[0]["tableName"], json!("users"));

    let records = migrator.make().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, LogLevel::Info);
    assert_eq!(migrator.migrations().files().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_make_dry_run_writes_nothing() {
    let (_dir, config) = project();
    let migrator = Migrator::new(config)
        .with_models(StaticModelSource::new(vec![users_model(json!({ "email": "varchar" }))]))
        .dry_run(true);

    let records = migrator.make().await.unwrap();
    assert!(messages(&records).contains("CREATE TABLE `users`"));
    assert!(migrator.migrations().files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_make_rejects_invalid_models() {
    let (_dir, config) = project();
    let migrator = Migrator::new(config)
        .with_models(StaticModelSource::new(vec![users_model(json!({ "age": "number" }))]));

    let err = migrator.make().await.unwrap_err();
    assert!(matches!(err, MigrateError::Validation(_)));
    assert!(migrator.migrations().files().await.unwrap().is_empty());
}

// ================================================================
// latest / rollback
// ================================================================

#[tokio::test]
async fn test_latest_applies_pending_files_as_one_batch() {
    let (_dir, config) = project();
    write_migration(&config, "2018_12_01_00_00_00", "users").await;
    write_migration(&config, "2018_12_02_00_00_00", "posts").await;
    let migrator = Migrator::new(config.clone());
    let store = MemoryStore::default();

    let records = migrator.latest(store.clone()).await.unwrap();
    assert!(messages(&records).contains("\"strata_migrations\""));
    assert_eq!(
        store.row_names(),
        [
            ("2018_12_01_00_00_00".to_string(), 1),
            ("2018_12_02_00_00_00".to_string(), 1)
        ]
    );
    let executed = store.state().executed.clone();
    assert_eq!(executed.len(), 3);
    assert!(executed[1].starts_with("CREATE TABLE `users`"));
    assert!(executed[2].starts_with("CREATE TABLE `posts`"));
    assert!(store.state().closed);

    let records = migrator.latest(store.clone()).await.unwrap();
    assert_eq!(messages(&records), "Already up to date.");

    write_migration(&config, "2018_12_03_00_00_00", "tags").await;
    migrator.latest(store.clone()).await.unwrap();
    assert_eq!(store.row_names()[2], ("2018_12_03_00_00_00".to_string(), 2));
}

#[tokio::test]
async fn test_rollback_reverts_last_batch_only() {
    let (_dir, config) = project();
    write_migration(&config, "2018_12_01_00_00_00", "users").await;
    let migrator = Migrator::new(config.clone()).verbose(true);
    let store = MemoryStore::default();
    migrator.latest(store.clone()).await.unwrap();

    write_migration(&config, "2018_12_02_00_00_00", "posts").await;
    write_migration(&config, "2018_12_03_00_00_00", "tags").await;
    migrator.latest(store.clone()).await.unwrap();
    store.state().executed.clear();

    let records = migrator.rollback(store.clone()).await.unwrap();
    assert!(messages(&records).contains("2018_12_03_00_00_00.yml"));
    assert_eq!(
        store.state().executed,
        ["DROP TABLE `tags`;", "DROP TABLE `posts`;"]
    );
    assert_eq!(store.row_names(), [("2018_12_01_00_00_00".to_string(), 1)]);

    migrator.rollback(store.clone()).await.unwrap();
    assert!(store.row_names().is_empty());
    let records = migrator.rollback(store.clone()).await.unwrap();
    assert_eq!(messages(&records), "Nothing to roll back.");
}

#[tokio::test]
async fn test_missing_file_refuses_to_run() {
    let (_dir, config) = project();
    write_migration(&config, "2018_12_01_00_00_00", "users").await;
    let store = MemoryStore::default();
    {
        let mut state = store.state();
        state.has_table = true;
        state.rows.push(MigrationRow::new("2018_12_01_00_00_00", 1));
        state.rows.push(MigrationRow::new("2018_12_02_00_00_00", 1));
    }

    let err = Migrator::new(config).rollback(store.clone()).await.unwrap_err();
    assert!(matches!(err, MigrateError::DirectoryCorruption { .. }));
    assert!(store.state().executed.is_empty());
    assert!(store.state().closed);
}

#[tokio::test]
async fn test_out_of_band_file_refuses_to_run() {
    let (_dir, config) = project();
    write_migration(&config, "2018_12_01_00_00_00", "users").await;
    write_migration(&config, "2018_12_03_00_00_00", "tags").await;
    let migrator = Migrator::new(config.clone());
    let store = MemoryStore::default();
    migrator.latest(store.clone()).await.unwrap();

    write_migration(&config, "2018_12_02_00_00_00", "posts").await;
    let err = migrator.latest(store.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrateError::UnorderedMigrations { unordered } if unordered == ["2018_12_03_00_00_00.yml"]
    ));
}

#[tokio::test]
async fn test_failed_statement_stops_the_run() {
    let (_dir, config) = project();
    write_migration(&config, "2018_12_01_00_00_00", "users").await;
    write_migration(&config, "2018_12_02_00_00_00", "posts").await;
    let store = MemoryStore::default();
    store.state().fail_on = Some("`posts`".into());

    let err = Migrator::new(config).latest(store.clone()).await.unwrap_err();
    assert!(matches!(err, MigrateError::Database(_)));
    assert_eq!(store.row_names(), [("2018_12_01_00_00_00".to_string(), 1)]);
    assert!(store.state().closed);
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let (_dir, config) = project();
    write_migration(&config, "2018_12_01_00_00_00", "users").await;
    let store = MemoryStore::default();

    let records = Migrator::new(config)
        .dry_run(true)
        .latest(store.clone())
        .await
        .unwrap();
    let text = messages(&records);
    assert!(text.contains("CREATE TABLE `users`"));
    assert!(text.contains("Would migrate 1"));
    assert!(store.state().executed.is_empty());
    assert!(store.row_names().is_empty());
}

#[tokio::test]
async fn test_missing_connection_config() {
    let (_dir, config) = project();
    let err = Migrator::new(config).run(Command::Latest).await.unwrap_err();
    assert!(matches!(
        &err,
        MigrateError::MissingConnectionConfig { env } if env == "test"
    ));
}
