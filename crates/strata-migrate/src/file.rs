//! Migration files.
//!
//! A migration file is a YAML document with three string fields: `up` and
//! `down` hold newline-joined SQL, `specs` holds the JSON-encoded authored
//! models the migration was generated from. Files are named after their
//! creation time (`YYYY_MM_DD_HH_mm_ss.yml`) so name order is creation order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_core::diff::MigrationData;
use strata_core::schema::TableSpec;
use strata_core::table::{normalize_specs, SchemaDefaults};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Extension of migration files.
pub const MIGRATION_EXTENSION: &str = "yml";

/// Contents of a migration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationContents {
    pub up: String,
    pub down: String,
    pub specs: String,
}

impl MigrationContents {
    /// Bundles a diff with the authored models it was computed from.
    pub fn new(data: MigrationData, specs: &[Value]) -> Result<Self> {
        Ok(Self {
            up: data.up,
            down: data.down,
            specs: serde_json::to_string(specs)?,
        })
    }

    /// Decodes the recorded authored models.
    pub fn specs(&self) -> Result<Vec<Value>> {
        Ok(serde_json::from_str(&self.specs)?)
    }
}

/// Name of a migration created at `at`.
#[must_use]
pub fn migration_file_name(at: &DateTime<Local>) -> String {
    at.format("%Y_%m_%d_%H_%M_%S").to_string()
}

/// A migration file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// File stem, also the name recorded in the migrations table.
    pub name: String,
    pub path: PathBuf,
}

impl MigrationFile {
    /// Reads and parses the file.
    pub async fn read(&self) -> Result<MigrationContents> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        serde_yaml::from_str(&text).map_err(|err| MigrateError::ParseError {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }
}

/// The project's migrations directory.
#[derive(Debug, Clone)]
pub struct MigrationDir {
    dir: PathBuf,
}

impl MigrationDir {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Lists migration files sorted by name.
    pub async fn files(&self) -> Result<Vec<MigrationFile>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(MIGRATION_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            files.push(MigrationFile {
                name: name.to_string(),
                path: path.clone(),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Writes a new migration file named after the current local time.
    pub async fn create(&self, contents: &MigrationContents) -> Result<PathBuf> {
        self.write(&migration_file_name(&Local::now()), contents).await
    }

    /// Writes a new migration file with the given name.
    ///
    /// Refuses to overwrite an existing file.
    pub async fn write(&self, name: &str, contents: &MigrationContents) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{name}.{MIGRATION_EXTENSION}"));
        let yaml = serde_yaml::to_string(contents)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(yaml.as_bytes()).await?;
        file.flush().await?;
        debug!(path = %path.display(), "Wrote migration file");
        Ok(path)
    }

    /// Normalized specs recorded by the most recent migration file, or an
    /// empty snapshot when there is none.
    ///
    /// Recorded specs were validated when the file was made and are not
    /// validated again.
    pub async fn last_specs(&self, defaults: &SchemaDefaults) -> Result<Vec<TableSpec>> {
        let Some(latest) = self.files().await?.pop() else {
            return Ok(Vec::new());
        };
        let specs = latest.read().await?.specs()?;
        Ok(normalize_specs(&specs, defaults)?)
    }
}
