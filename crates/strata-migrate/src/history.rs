//! Migration history tracking.
//!
//! This module manages the migrations table that records which migration
//! files have been applied, and in which batch. The table has three columns:
//! `name` (migration file stem), `batch` and `date`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::json;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use strata_core::log::LogRecord;
use strata_core::sql;
use strata_core::table::{normalize_spec, SchemaDefaults};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// A recorded migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRow {
    /// Migration file stem.
    pub name: String,
    pub batch: i64,
    /// When the migration was applied.
    pub date: Option<NaiveDateTime>,
}

impl MigrationRow {
    #[must_use]
    pub fn new(name: impl Into<String>, batch: i64) -> Self {
        Self {
            name: name.into(),
            batch,
            date: None,
        }
    }
}

/// SQL creating the migrations table.
///
/// Built from a regular table model, so the table carries the same
/// synthesized `id` key as any model table.
pub fn create_migrations_table_sql(table: &str) -> Result<String> {
    let spec = normalize_spec(
        &json!({
            "tableName": table,
            "schema": {
                "columns": {
                    "name": "varchar",
                    "batch": "int",
                    "date": "timestamp"
                }
            }
        }),
        &SchemaDefaults::default(),
    )?;
    Ok(sql::create_table_lines(&spec)?.join(""))
}

fn insert_row_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (`name`, `batch`, `date`) VALUES (?, ?, CURRENT_TIMESTAMP)",
        sql::ident(table)
    )
}

fn delete_row_sql(table: &str) -> String {
    format!("DELETE FROM {} WHERE `name` = ?", sql::ident(table))
}

/// Database operations the lifecycle needs.
///
/// Implementations own a single connection; every call runs on it in
/// order.
#[async_trait]
pub trait MigrationStore: Send {
    /// Runs raw SQL, possibly several `;`-separated statements.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Checks whether a table exists.
    async fn has_table(&mut self, table: &str) -> Result<bool>;

    /// Reads every row of the migrations table, by batch then name.
    async fn rows(&mut self, table: &str) -> Result<Vec<MigrationRow>>;

    /// Records an applied migration.
    async fn insert_row(&mut self, table: &str, name: &str, batch: i64) -> Result<()>;

    /// Removes a migration record, returning the number of rows removed.
    async fn delete_row(&mut self, table: &str, name: &str) -> Result<u64>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<()>;
}

/// [`MigrationStore`] over one MySQL connection.
#[derive(Debug)]
pub struct MySqlStore {
    conn: Option<MySqlConnection>,
}

impl MySqlStore {
    /// Opens a connection.
    pub async fn connect(options: &MySqlConnectOptions) -> Result<Self> {
        let conn = options.connect().await.map_err(MigrateError::Connection)?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.conn.as_mut().ok_or(MigrateError::ConnectionClosed)
    }
}

#[async_trait]
impl MigrationStore for MySqlStore {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn()?;
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql)).await?;
        Ok(())
    }

    async fn has_table(&mut self, table: &str) -> Result<bool> {
        let query = format!("SHOW TABLES LIKE {}", sql::quote_literal(table));
        let row: Option<(String,)> = sqlx::query_as(&query)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.is_some())
    }

    async fn rows(&mut self, table: &str) -> Result<Vec<MigrationRow>> {
        let query = format!(
            "SELECT `name`, `batch`, `date` FROM {} ORDER BY `batch` ASC, `name` ASC",
            sql::ident(table)
        );
        let rows: Vec<(String, i64, Option<NaiveDateTime>)> =
            sqlx::query_as(&query).fetch_all(self.conn()?).await?;
        Ok(rows
            .into_iter()
            .map(|(name, batch, date)| MigrationRow { name, batch, date })
            .collect())
    }

    async fn insert_row(&mut self, table: &str, name: &str, batch: i64) -> Result<()> {
        let query = insert_row_sql(table);
        sqlx::query(&query)
            .bind(name)
            .bind(batch)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn delete_row(&mut self, table: &str, name: &str) -> Result<u64> {
        let query = delete_row_sql(table);
        let result = sqlx::query(&query)
            .bind(name)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

/// Manages the migrations table through a store.
pub struct MigrationHistory<S> {
    store: S,
    table: String,
}

impl<S: MigrationStore> MigrationHistory<S> {
    /// Creates a history manager for `table`.
    pub fn new(store: S, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub async fn has_table(&mut self) -> Result<bool> {
        self.store.has_table(&self.table).await
    }

    /// Ensures the migrations table exists, narrating its creation.
    pub async fn ensure_table(&mut self) -> Result<Vec<LogRecord>> {
        if self.has_table().await? {
            return Ok(Vec::new());
        }
        let mut logs = vec![
            LogRecord::warn(format!("Missing \"{}\" table detected!", self.table)),
            LogRecord::info(format!("Creating \"{}\" table ...", self.table)),
        ];
        let sql = create_migrations_table_sql(&self.table)?;
        self.execute(&sql).await?;
        logs.push(LogRecord::success(format!(
            "Required migrations table (`{}`) successfully created!",
            self.table
        )));
        Ok(logs)
    }

    /// Gets every recorded migration, by batch then name.
    pub async fn rows(&mut self) -> Result<Vec<MigrationRow>> {
        self.store.rows(&self.table).await
    }

    /// Runs migration SQL.
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        if sql.trim().is_empty() {
            return Ok(());
        }
        debug!(sql = %sql, "Executing SQL");
        self.store.execute(sql).await
    }

    /// Records a migration as applied in `batch`.
    pub async fn record_applied(&mut self, name: &str, batch: i64) -> Result<()> {
        self.store.insert_row(&self.table, name, batch).await
    }

    /// Removes a migration record (for rollback).
    pub async fn record_unapplied(&mut self, name: &str) -> Result<()> {
        if self.store.delete_row(&self.table, name).await? == 0 {
            return Err(MigrateError::MigrationNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Closes the store.
    pub async fn close(&mut self) -> Result<()> {
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_migrations_table_sql() {
        assert_eq!(
            create_migrations_table_sql("strata_migrations").unwrap(),
            "CREATE TABLE `strata_migrations` (  \
             `id` INT(11) UNSIGNED NOT NULL AUTO_INCREMENT,  \
             `name` VARCHAR(255),  \
             `batch` INT(11),  \
             `date` TIMESTAMP,  \
             PRIMARY KEY (`id`)\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;"
        );
    }

    #[test]
    fn test_row_statements_quote_table_name() {
        assert_eq!(
            insert_row_sql("odd`table"),
            "INSERT INTO `odd``table` (`name`, `batch`, `date`) VALUES (?, ?, CURRENT_TIMESTAMP)"
        );
        assert_eq!(
            delete_row_sql("strata_migrations"),
            "DELETE FROM `strata_migrations` WHERE `name` = ?"
        );
    }

    #[derive(Default)]
    struct Recorder {
        executed: Vec<String>,
        rows: Vec<MigrationRow>,
        has_table: bool,
    }

    #[async_trait]
    impl MigrationStore for Recorder {
        async fn execute(&mut self, sql: &str) -> Result<()> {
            self.executed.push(sql.to_string());
            self.has_table = true;
            Ok(())
        }

        async fn has_table(&mut self, _table: &str) -> Result<bool> {
            Ok(self.has_table)
        }

        async fn rows(&mut self, _table: &str) -> Result<Vec<MigrationRow>> {
            Ok(self.rows.clone())
        }

        async fn insert_row(&mut self, _table: &str, name: &str, batch: i64) -> Result<()> {
            self.rows.push(MigrationRow::new(name, batch));
            Ok(())
        }

        async fn delete_row(&mut self, _table: &str, name: &str) -> Result<u64> {
            let before = self.rows.len();
            self.rows.retain(|row| row.name != name);
            Ok((before - self.rows.len()) as u64)
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let mut history = MigrationHistory::new(Recorder::default(), "strata_migrations");
        let logs = history.ensure_table().await.unwrap();
        assert_eq!(logs.len(), 3);
        assert!(history.ensure_table().await.unwrap().is_empty());
        assert_eq!(history.store_mut().executed.len(), 1);
    }

    #[tokio::test]
    async fn test_record_and_unrecord() {
        let mut history = MigrationHistory::new(Recorder::default(), "strata_migrations");
        history.record_applied("2018_12_01_00_00_00", 1).await.unwrap();
        assert_eq!(history.rows().await.unwrap().len(), 1);
        history.record_unapplied("2018_12_01_00_00_00").await.unwrap();
        assert!(matches!(
            history.record_unapplied("2018_12_01_00_00_00").await,
            Err(MigrateError::MigrationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_sql_is_skipped() {
        let mut history = MigrationHistory::new(Recorder::default(), "strata_migrations");
        history.execute("  \n").await.unwrap();
        assert!(history.store_mut().executed.is_empty());
    }
}
