//! Loading of authored models.
//!
//! A model is any unit that yields a raw table specification
//! (`tableName`, `schema`, `_fid`). [`DirectoryModelSource`] reads them from
//! `models/*.yml`, `*.yaml` and `*.json`; other sources can be plugged in
//! through [`ModelSource`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use strata_core::schema::TableSpec;
use strata_core::table::{parse_and_validate, SchemaDefaults};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// A loaded model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFile {
    /// File stem.
    pub name: String,
    pub path: PathBuf,
    /// Raw authored specification.
    pub spec: Value,
}

impl ModelFile {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, spec: Value) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            spec,
        }
    }

    /// The `tableName` the model declares, if any.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.spec.get("tableName").and_then(Value::as_str)
    }
}

/// Provides the authored models of a project.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Loads every model, ordered by name.
    async fn load(&self) -> Result<Vec<ModelFile>>;
}

/// Reads models from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryModelSource {
    dir: PathBuf,
}

impl DirectoryModelSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[derive(Clone, Copy)]
enum Format {
    Yaml,
    Json,
}

fn model_format(path: &Path) -> Option<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yml" | "yaml") => Some(Format::Yaml),
        Some("json") => Some(Format::Json),
        _ => None,
    }
}

#[async_trait]
impl ModelSource for DirectoryModelSource {
    async fn load(&self) -> Result<Vec<ModelFile>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(format) = model_format(&path) {
                paths.push((path, format));
            }
        }
        paths.sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()));

        let mut models = Vec::with_capacity(paths.len());
        for (path, format) in paths {
            debug!(path = %path.display(), "Loading model");
            let text = tokio::fs::read_to_string(&path).await?;
            let parsed: std::result::Result<Value, String> = match format {
                Format::Yaml => serde_yaml::from_str(&text).map_err(|err| err.to_string()),
                Format::Json => serde_json::from_str(&text).map_err(|err| err.to_string()),
            };
            let spec = parsed.map_err(|message| MigrateError::ParseError {
                path: path.clone(),
                message,
            })?;
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            models.push(ModelFile::new(name, path, spec));
        }
        Ok(models)
    }
}

/// Serves a fixed list of models.
#[derive(Debug, Clone, Default)]
pub struct StaticModelSource {
    models: Vec<ModelFile>,
}

impl StaticModelSource {
    #[must_use]
    pub fn new(models: Vec<ModelFile>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl ModelSource for StaticModelSource {
    async fn load(&self) -> Result<Vec<ModelFile>> {
        Ok(self.models.clone())
    }
}

/// The current schema as authored and as normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Models {
    /// Canonical specifications, in model order.
    pub parsed: Vec<TableSpec>,
    /// Authored specifications restricted to the persisted keys, with table
    /// charset and collation resolved.
    pub original: Vec<Value>,
}

/// Loads, validates and normalizes every model.
///
/// Fails on the first invalid model, with the model's path attached to the
/// validation error.
pub async fn get_models(source: &dyn ModelSource, defaults: &SchemaDefaults) -> Result<Models> {
    let mut models = Models::default();
    for file in source.load().await? {
        let parsed =
            parse_and_validate(&file.spec, defaults).map_err(|err| err.with_file(&file.path))?;
        models.parsed.push(parsed.spec);
        models.original.push(parsed.original);
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_directory_source_reads_sorted_models() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("users.yml"),
            "tableName: users\nschema:\n  columns:\n    email: varchar\n_fid: uuuuuu\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("posts.json"),
            r#"{"tableName":"posts","schema":{"columns":{"title":"varchar"}},"_fid":"pppppp"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let models = DirectoryModelSource::new(dir.path()).load().await.unwrap();
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["posts", "users"]);
        assert_eq!(models[1].table_name(), Some("users"));
    }

    #[tokio::test]
    async fn test_missing_directory_has_no_models() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryModelSource::new(dir.path().join("models"));
        assert!(source.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_models_attaches_file_to_validation_errors() {
        let source = StaticModelSource::new(vec![ModelFile::new(
            "users",
            "models/users.yml",
            json!({ "tableName": "users", "_fid": "u", "schema": { "columns": { "id": "int" } } }),
        )]);
        let err = get_models(&source, &SchemaDefaults::default())
            .await
            .unwrap_err();
        let MigrateError::Validation(validation) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(validation.file(), Some(Path::new("models/users.yml")));
        assert!(validation.field("schema.columns.id").is_some());
    }

    #[tokio::test]
    async fn test_get_models_returns_both_views() {
        let source = StaticModelSource::new(vec![ModelFile::new(
            "users",
            "models/users.yml",
            json!({ "tableName": "users", "_fid": "u", "schema": { "columns": { "admin": "bool" } } }),
        )]);
        let models = get_models(&source, &SchemaDefaults::default()).await.unwrap();
        assert_eq!(models.parsed[0].schema.columns["admin"].type_name(), Some("tinyint"));
        assert_eq!(models.original[0]["schema"]["columns"]["admin"], json!("bool"));
        assert_eq!(models.original[0]["schema"]["charset"], json!("utf8mb4"));
    }
}
