//! Project configuration.
//!
//! Configuration lives in `strata.yml` at the project root, one section per
//! environment:
//!
//! ```yaml
//! development:
//!   connection:
//!     host: 127.0.0.1
//!     port: 3306
//!     user: root
//!     password: ""
//!     database: app
//!   migrations_table: strata_migrations
//!   charset: utf8mb4
//!   collation: utf8mb4_unicode_ci
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use strata_core::table::SchemaDefaults;

use crate::error::{MigrateError, Result};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "strata.yml";

/// Default name of the migrations table.
pub const DEFAULT_MIGRATIONS_TABLE: &str = "strata_migrations";

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3306
}

fn default_migrations_table() -> String {
    DEFAULT_MIGRATIONS_TABLE.to_string()
}

impl ConnectionConfig {
    /// Builds sqlx connect options for these settings.
    #[must_use]
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Settings of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub connection: Option<ConnectionConfig>,
    #[serde(default = "default_migrations_table")]
    pub migrations_table: String,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            connection: None,
            migrations_table: default_migrations_table(),
            charset: None,
            collation: None,
        }
    }
}

/// Resolved configuration for the active environment.
#[derive(Debug, Clone)]
pub struct Config {
    env: String,
    base_dir: PathBuf,
    settings: EnvironmentConfig,
}

impl Config {
    /// Creates a configuration from already resolved settings.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, env: impl Into<String>, settings: EnvironmentConfig) -> Self {
        Self {
            env: env.into(),
            base_dir: base_dir.into(),
            settings,
        }
    }

    /// Reads `path` and selects the `env` section.
    pub fn load(path: &Path, base_dir: impl Into<PathBuf>, env: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text, path, base_dir, env)
    }

    /// Parses configuration text and selects the `env` section.
    pub fn from_yaml(text: &str, path: &Path, base_dir: impl Into<PathBuf>, env: &str) -> Result<Self> {
        let mut environments: BTreeMap<String, EnvironmentConfig> = serde_yaml::from_str(text)
            .map_err(|err| MigrateError::ParseError {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        let settings = environments
            .remove(env)
            .ok_or_else(|| MigrateError::MissingEnvironment {
                env: env.to_string(),
                path: path.to_path_buf(),
            })?;
        Ok(Self::new(base_dir, env, settings))
    }

    /// Active environment name.
    #[must_use]
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Project base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.base_dir.join("models")
    }

    #[must_use]
    pub fn migrations_dir(&self) -> PathBuf {
        self.base_dir.join("migrations")
    }

    #[must_use]
    pub fn migrations_table(&self) -> &str {
        &self.settings.migrations_table
    }

    /// Table options used when a model leaves them out.
    ///
    /// A configured charset without a collation gets a collation of that
    /// charset.
    #[must_use]
    pub fn schema_defaults(&self) -> SchemaDefaults {
        let (charset, collation) = SchemaDefaults::default().resolve(
            self.settings.charset.as_deref().filter(|s| !s.is_empty()),
            self.settings.collation.as_deref().filter(|s| !s.is_empty()),
        );
        SchemaDefaults::new(charset, collation)
    }

    /// Connection settings of the active environment.
    pub fn connection(&self) -> Result<&ConnectionConfig> {
        self.settings
            .connection
            .as_ref()
            .ok_or_else(|| MigrateError::MissingConnectionConfig {
                env: self.env.clone(),
            })
    }
}
