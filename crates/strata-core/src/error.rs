//! Error types for the schema model.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::validate::index::IndexError;

/// Errors raised while normalizing or rendering table specifications.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A column references a datatype that is not registered.
    #[error("Unknown datatype \"{0}\"")]
    UnknownDatatype(String),

    /// A specification could not be read into the table model.
    #[error("Malformed table specification: {0}")]
    MalformedSpec(String),

    /// One or more fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result type for schema model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single defect found on one field of a table specification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// A required field is missing.
    #[error("field is required")]
    Required,

    /// The field must hold a string.
    #[error("value must be a string")]
    NotString,

    /// The field must hold an object.
    #[error("value must be an object")]
    NotObject,

    /// A table or column name does not match the naming pattern.
    #[error("invalid name \"{0}\"! names must match {pattern}", pattern = crate::table::NAME_PATTERN)]
    InvalidName(String),

    /// The user declared a column named `id`.
    #[error("column name \"id\" is reserved! an auto-increment \"id\" column is created for each table")]
    ReservedId,

    /// A column definition is neither a type name nor an object.
    #[error("invalid datatype definition! columns must have either a string or an object value")]
    InvalidColumnSpec,

    /// The column's datatype is not registered.
    #[error("datatype \"{0}\" is not supported")]
    UnknownDatatype(String),

    /// The column carries properties its datatype does not define.
    #[error("unknown datatype propert{}: {}", if .0.len() == 1 { "y" } else { "ies" }, .0.join(", "))]
    UnknownDatatypeProperty(Vec<String>),

    /// The index list is invalid.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A property rule or validator rejected the value.
    #[error("{0}")]
    Rule(String),
}

/// Aggregated validation failure for one table specification.
///
/// Errors are keyed by field path (`tableName`, `schema.columns.age`,
/// `schema.columns.age.default`, ...) in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    file: Option<PathBuf>,
    fields: IndexMap<String, Vec<FieldError>>,
}

impl ValidationError {
    /// Creates an empty validation error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a defect for a field path.
    pub fn push(&mut self, field: impl Into<String>, error: FieldError) {
        self.fields.entry(field.into()).or_default().push(error);
    }

    /// Attaches the file the specification was loaded from.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Returns the originating file, when known.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Returns the per-field errors.
    #[must_use]
    pub const fn fields(&self) -> &IndexMap<String, Vec<FieldError>> {
        &self.fields
    }

    /// Returns the errors recorded for one field path.
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&[FieldError]> {
        self.fields.get(path).map(Vec::as_slice)
    }

    /// Returns `true` when no defect was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts into `Err(self)` when any defect was recorded.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error")?;
        if let Some(file) = &self.file {
            write!(f, " in {}", file.display())?;
        }
        write!(f, ":")?;
        for (field, errors) in &self.fields {
            for error in errors {
                write!(f, "\n  {field}: {error}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
