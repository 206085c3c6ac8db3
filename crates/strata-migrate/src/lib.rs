//! Declarative MySQL migrations.
//!
//! `strata-migrate` drives the schema model of `strata-core` against a
//! project on disk and a MySQL database:
//!
//! - **Config** - `strata.yml`, one section per environment
//! - **Models** - authored table specifications under `models/`
//! - **Migration files** - timestamped `{up, down, specs}` YAML documents
//!   under `migrations/`
//! - **History** - the migrations table recording applied files by batch
//! - **Migrator** - `make`, `latest` and `rollback`
//! - **Scaffold** - `init` and `model:generate`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use strata_migrate::prelude::*;
//!
//! # async fn run() -> strata_migrate::error::Result<()> {
//! let config = Config::load(Path::new("strata.yml"), ".", "development")?;
//! let migrator = Migrator::new(config);
//! for record in migrator.run(Command::Make).await? {
//!     println!("[{}] {}", record.level, record.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! strata init
//! strata model:generate users posts
//! strata migrate:make
//! strata migrate:latest
//! strata migrate:rollback
//! strata datatype varchar int
//! ```

pub mod config;
pub mod error;
pub mod file;
pub mod history;
pub mod migrator;
pub mod model;
pub mod scaffold;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{Config, ConnectionConfig, EnvironmentConfig, CONFIG_FILE};
    pub use crate::error::{MigrateError, Result};
    pub use crate::file::{MigrationContents, MigrationDir, MigrationFile};
    pub use crate::history::{MigrationHistory, MigrationRow, MigrationStore, MySqlStore};
    pub use crate::migrator::{validate_migration_data, Command, Migrator};
    pub use crate::model::{
        get_models, DirectoryModelSource, ModelFile, ModelSource, Models, StaticModelSource,
    };
    pub use crate::scaffold::{generate_models, init};
    pub use strata_core::log::{LogLevel, LogRecord};
}
