//! Error types for the migration lifecycle.

use std::path::PathBuf;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Error raised by the schema model.
    #[error(transparent)]
    Core(#[from] strata_core::error::Error),

    /// A model failed validation.
    #[error(transparent)]
    Validation(#[from] strata_core::error::ValidationError),

    /// The configuration file has no section for the active environment.
    #[error("No configuration found for environment \"{env}\" in {path}")]
    MissingEnvironment {
        /// Active environment.
        env: String,
        /// Configuration file that was read.
        path: PathBuf,
    },

    /// The active environment defines no database connection.
    #[error("Missing database connection config for the \"{env}\" environment!")]
    MissingConnectionConfig {
        /// Active environment.
        env: String,
    },

    /// Recorded migrations reference files that no longer exist.
    #[error(
        "Corrupt migrations directory: {} recorded migration file(s) are missing:\n{}",
        .missing.len(),
        listify(.missing)
    )]
    DirectoryCorruption {
        /// Missing file names.
        missing: Vec<String>,
    },

    /// Recorded migrations and files have diverged in order.
    #[error(
        "Migration files are out of order: {} recorded migration(s) do not match the file order:\n{}",
        .unordered.len(),
        listify(.unordered)
    )]
    UnorderedMigrations {
        /// File names whose position differs from their row.
        unordered: Vec<String>,
    },

    /// Could not connect to the database.
    #[error("Failed to connect to the database: {0}")]
    Connection(#[source] sqlx::Error),

    /// The store was used after it was closed.
    #[error("Database connection is already closed")]
    ConnectionClosed,

    /// Database error during migration execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading/writing project files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a project file.
    #[error("Failed to parse '{path}': {message}")]
    ParseError {
        /// Path to the file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model names that do not match the naming pattern.
    #[error(
        "There {} {} invalid table name(s):\n{}\nTable names should match {}. Aborting!",
        if .0.len() == 1 { "is" } else { "are" },
        .0.len(),
        listify(.0),
        strata_core::table::NAME_PATTERN
    )]
    InvalidTableNames(Vec<String>),

    /// Models already exist for these tables.
    #[error("There are existing model files for the following table names: {}", .0.join(", "))]
    ModelExists(Vec<String>),

    /// A migration row could not be found.
    #[error("Migration not found: {0}")]
    MigrationNotFound(String),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Renders a list as indented bullet lines.
pub(crate) fn listify(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_lists_missing_files() {
        let err = MigrateError::DirectoryCorruption {
            missing: vec!["2018_12_02_00_00_00.yml".into()],
        };
        assert_eq!(
            err.to_string(),
            "Corrupt migrations directory: 1 recorded migration file(s) are missing:\n  \
             - 2018_12_02_00_00_00.yml"
        );
    }

    #[test]
    fn test_invalid_table_names_message() {
        let err = MigrateError::InvalidTableNames(vec!["Users".into(), "a__b".into()]);
        let message = err.to_string();
        assert!(message.starts_with("There are 2 invalid table name(s):\n  - Users\n  - a__b"));
    }
}
