//! Project scaffolding: `init` and `model:generate`.

use std::path::{Path, PathBuf};

use serde_json::json;
use strata_core::log::LogRecord;
use strata_core::table::is_valid_name;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::CONFIG_FILE;
use crate::error::{MigrateError, Result};
use crate::model::{DirectoryModelSource, ModelSource};

/// Configuration written by `init`.
pub const STARTER_CONFIG: &str = r#"development:
  connection:
    host: 127.0.0.1
    port: 3306
    user: root
    password: ""
    database: app_development
  migrations_table: strata_migrations
  charset: utf8mb4
  collation: utf8mb4_unicode_ci

production:
  connection:
    host: 127.0.0.1
    port: 3306
    user: app
    password: ""
    database: app_production
"#;

const FID_LENGTH: usize = 10;
const FID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random model file id.
#[must_use]
pub fn generate_fid() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    let mut bytes = [0u8; FID_LENGTH];
    rng.fill(&mut bytes);
    bytes
        .iter()
        .map(|b| char::from(FID_ALPHABET[usize::from(*b) % FID_ALPHABET.len()]))
        .collect()
}

/// Creates the project layout under `base_dir`.
///
/// Existing directories and an existing configuration file are left alone.
pub async fn init(base_dir: &Path) -> Result<Vec<LogRecord>> {
    let mut logs = Vec::new();
    for name in ["models", "migrations"] {
        let dir = base_dir.join(name);
        if tokio::fs::try_exists(&dir).await? {
            logs.push(LogRecord::warn(format!("\"{name}\" directory already exists.")));
        } else {
            tokio::fs::create_dir_all(&dir).await?;
            logs.push(LogRecord::success(format!("Created \"{name}\" directory.")));
        }
    }

    let config = base_dir.join(CONFIG_FILE);
    if tokio::fs::try_exists(&config).await? {
        logs.push(LogRecord::warn(format!("\"{CONFIG_FILE}\" already exists.")));
    } else {
        write_new(&config, STARTER_CONFIG).await?;
        logs.push(LogRecord::success(format!("Created \"{CONFIG_FILE}\".")));
    }
    Ok(logs)
}

/// Writes an empty model for each table name.
///
/// Nothing is written unless every name is valid and unused.
pub async fn generate_models(
    models_dir: &Path,
    names: &[String],
    verbose: bool,
) -> Result<Vec<LogRecord>> {
    let invalid: Vec<String> = names
        .iter()
        .filter(|name| !is_valid_name(name))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(MigrateError::InvalidTableNames(invalid));
    }

    let mut logs = Vec::new();
    let existing = DirectoryModelSource::new(models_dir).load().await?;
    if verbose {
        for model in &existing {
            if let Some(table) = model.table_name().filter(|table| *table != model.name) {
                logs.push(LogRecord::warn(format!(
                    "Model file \"{}\" declares table \"{table}\".",
                    model.path.display()
                )));
            }
        }
    }

    let mut wanted: Vec<&String> = Vec::with_capacity(names.len());
    for name in names {
        if !wanted.contains(&name) {
            wanted.push(name);
        }
    }
    let taken: Vec<String> = wanted
        .iter()
        .filter(|name| {
            existing
                .iter()
                .any(|model| model.name == name.as_str() || model.table_name() == Some(name.as_str()))
        })
        .map(|name| name.to_string())
        .collect();
    if !taken.is_empty() {
        return Err(MigrateError::ModelExists(taken));
    }

    tokio::fs::create_dir_all(models_dir).await?;
    for name in wanted {
        let path = model_path(models_dir, name);
        let model = json!({
            "tableName": name,
            "schema": { "columns": {} },
            "_fid": generate_fid(),
        });
        write_new(&path, &serde_yaml::to_string(&model)?).await?;
        logs.push(LogRecord::success(format!(
            "Created model file \"{}\".",
            path.display()
        )));
    }
    Ok(logs)
}

fn model_path(models_dir: &Path, name: &str) -> PathBuf {
    models_dir.join(format!("{name}.yml"))
}

async fn write_new(path: &Path, text: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await?;
    debug!(path = %path.display(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use strata_core::log::LogLevel;
    use strata_core::table::{parse_and_validate, SchemaDefaults};

    use super::*;
    use crate::config::Config;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn test_fid_shape() {
        let fid = generate_fid();
        assert_eq!(fid.len(), FID_LENGTH);
        assert!(fid.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_starter_config_parses() {
        let config = Config::from_yaml(STARTER_CONFIG, Path::new(CONFIG_FILE), "/p", "development")
            .unwrap();
        assert_eq!(config.connection().unwrap().database, "app_development");
    }

    #[tokio::test]
    async fn test_init_twice_warns() {
        let dir = tempfile::tempdir().unwrap();
        let first = init(dir.path()).await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|log| log.level == LogLevel::Success));
        assert!(dir.path().join("models").is_dir());
        assert!(dir.path().join(CONFIG_FILE).is_file());

        let second = init(dir.path()).await.unwrap();
        assert!(second.iter().all(|log| log.level == LogLevel::Warn));
    }

    #[tokio::test]
    async fn test_generated_model_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let logs = generate_models(dir.path(), &names(&["users", "blog_posts"]), false)
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);

        let models = DirectoryModelSource::new(dir.path()).load().await.unwrap();
        assert_eq!(models.len(), 2);
        let users = &models[1];
        assert_eq!(users.table_name(), Some("users"));
        assert!(parse_and_validate(&users.spec, &SchemaDefaults::default()).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_names_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_models(dir.path(), &names(&["users", "Posts", "a__b"]), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::InvalidTableNames(invalid) if invalid == ["Posts", "a__b"]
        ));
        assert!(!dir.path().join("users.yml").exists());
    }

    #[tokio::test]
    async fn test_existing_table_name_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("accounts.yml"),
            "tableName: users\nschema:\n  columns: {}\n_fid: aaaaaaaaaa\n",
        )
        .unwrap();

        let err = generate_models(dir.path(), &names(&["users", "posts"]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::ModelExists(taken) if taken == ["users"]));
        assert!(!dir.path().join("posts.yml").exists());

        let logs = generate_models(dir.path(), &names(&["posts"]), true)
            .await
            .unwrap();
        assert_eq!(logs[0].level, LogLevel::Warn);
        assert_eq!(logs[1].level, LogLevel::Success);
    }
}
