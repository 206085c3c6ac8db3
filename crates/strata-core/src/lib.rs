//! Declarative MySQL schema model for strata.
//!
//! `strata-core` holds everything that can be computed without touching a
//! database or the filesystem:
//!
//! - **Datatypes** - the registry of supported column types, their defaults,
//!   validation rules and DDL rendering
//! - **Validators** - named checks for charsets, collations, literal values
//!   and index definitions
//! - **Table model** - validation and normalization of authored table
//!   specifications into their canonical form
//! - **SQL** - MySQL DDL statement generation
//! - **Diff** - forward/backward DDL between two schema snapshots
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use strata_core::prelude::*;
//!
//! let defaults = SchemaDefaults::default();
//! let parsed = parse_and_validate(
//!     &json!({
//!         "tableName": "users",
//!         "_fid": "Zq0xK2pLm1",
//!         "schema": { "columns": { "email": "varchar" } }
//!     }),
//!     &defaults,
//! )
//! .unwrap();
//!
//! let diff = Diff::new(&[], &[parsed.spec]).unwrap();
//! assert!(diff.has_changed());
//! assert_eq!(diff.down(), ["DROP TABLE `users`;"]);
//! ```

pub mod charset;
pub mod datatype;
pub mod diff;
pub mod error;
pub mod log;
pub mod schema;
pub mod sql;
pub mod table;
pub mod validate;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::datatype::{lookup, registry, Category, Descriptor};
    pub use crate::diff::{Diff, MigrationData};
    pub use crate::error::{Error, FieldError, Result, ValidationError};
    pub use crate::log::{LogLevel, LogRecord};
    pub use crate::schema::{ColumnSpec, IndexKind, IndexSpec, TableSchema, TableSpec};
    pub use crate::table::{
        is_valid_name, normalize_spec, normalize_specs, parse_and_validate, ParsedTable,
        SchemaDefaults,
    };
}
