//! Validation and normalization of authored table specifications.
//!
//! An authored table looks like:
//!
//! ```yaml
//! tableName: users
//! schema:
//!   columns:
//!     email: varchar
//!     age: { type: int, unsigned: true }
//!   indexes:
//!     - { type: unique, columns: [email] }
//! _fid: Zq0xK2pLm1
//! ```
//!
//! [`parse_and_validate`] checks every field and aggregates the defects
//! into one [`ValidationError`]. [`normalize_spec`] skips validation and is
//! used for specifications that were already validated when they were
//! recorded in a migration file.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

use crate::charset;
use crate::datatype::{lookup, Descriptor};
use crate::error::{Error, FieldError, Result, ValidationError};
use crate::schema::{ColumnSpec, IndexSpec, TableSchema, TableSpec};
use crate::validate::{check_rules, index::validate_indexes, validators};

/// Pattern every table and column name must match.
pub const NAME_PATTERN: &str = r"^[a-z]([_]?[a-z]+)*$";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("name pattern compiles"));

/// Returns `true` when `name` is a legal table or column name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Table options applied when a specification leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefaults {
    pub charset: String,
    pub collation: String,
}

impl SchemaDefaults {
    #[must_use]
    pub fn new(charset: impl Into<String>, collation: impl Into<String>) -> Self {
        Self {
            charset: charset.into(),
            collation: collation.into(),
        }
    }

    /// Resolves a table's charset and collation against these defaults.
    ///
    /// A charset given without a collation keeps the default collation only
    /// when that collation belongs to the charset, otherwise it gets the
    /// charset's own default collation.
    #[must_use]
    pub fn resolve(&self, charset: Option<&str>, collation: Option<&str>) -> (String, String) {
        match (charset, collation) {
            (Some(charset), Some(collation)) => (charset.to_string(), collation.to_string()),
            (Some(charset), None) => {
                let collation = match charset::lookup(charset) {
                    Some(known) if !known.supports(&self.collation) => known.default_collation(),
                    _ => self.collation.as_str(),
                };
                (charset.to_string(), collation.to_string())
            }
            (None, collation) => (
                self.charset.clone(),
                collation.unwrap_or(self.collation.as_str()).to_string(),
            ),
        }
    }
}

/// Reads a table option, treating null and empty strings as absent.
fn table_option<'a>(schema: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    schema.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

impl Default for SchemaDefaults {
    fn default() -> Self {
        Self::new("utf8mb4", "utf8mb4_unicode_ci")
    }
}

/// A validated table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    /// The canonical form.
    pub spec: TableSpec,
    /// The authored form, restricted to `tableName`, `schema` and `_fid`,
    /// with the table charset and collation filled in.
    pub original: Value,
}

/// Expands one authored column definition into its full property set.
///
/// A string is a bare type name. An object overrides the type's defaults.
/// In both cases `type` ends up as the descriptor's SQL type.
pub fn expand_column(
    definition: &Value,
) -> std::result::Result<(ColumnSpec, &'static Descriptor), FieldError> {
    match definition {
        Value::String(type_name) => {
            let descriptor =
                lookup(type_name).ok_or_else(|| FieldError::UnknownDatatype(type_name.clone()))?;
            Ok((descriptor.defaults(), descriptor))
        }
        Value::Object(overrides) => {
            let type_name = overrides
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let descriptor = lookup(type_name)
                .ok_or_else(|| FieldError::UnknownDatatype(type_name.to_string()))?;
            let mut column = descriptor.defaults();
            for (key, value) in overrides {
                column.set(key.clone(), value.clone());
            }
            column.set("type", Value::String(descriptor.sql_type().to_string()));
            Ok((column, descriptor))
        }
        _ => Err(FieldError::InvalidColumnSpec),
    }
}

/// Validates an authored table and returns its canonical form.
///
/// Every defect is collected before returning; the error is keyed by
/// field path.
pub fn parse_and_validate(
    raw: &Value,
    defaults: &SchemaDefaults,
) -> std::result::Result<ParsedTable, ValidationError> {
    let mut errors = ValidationError::new();
    let Some(table) = raw.as_object() else {
        errors.push("model", FieldError::NotObject);
        return Err(errors);
    };

    match table.get("tableName") {
        None | Some(Value::Null) => errors.push("tableName", FieldError::Required),
        Some(Value::String(name)) if !is_valid_name(name) => {
            errors.push("tableName", FieldError::InvalidName(name.clone()));
        }
        Some(Value::String(_)) => {}
        Some(_) => errors.push("tableName", FieldError::NotString),
    }

    match table.get("_fid") {
        None | Some(Value::Null) => errors.push("_fid", FieldError::Required),
        Some(Value::String(_)) => {}
        Some(_) => errors.push("_fid", FieldError::NotString),
    }

    match table.get("schema") {
        None | Some(Value::Null) => errors.push("schema", FieldError::Required),
        Some(Value::Object(schema)) => validate_schema(schema, table, &mut errors),
        Some(_) => errors.push("schema", FieldError::NotObject),
    }

    errors.into_result()?;

    let original = fill_table_options(table, defaults);
    let spec = normalize_spec(&original, defaults).map_err(|err| {
        let mut errors = ValidationError::new();
        errors.push("model", FieldError::Rule(err.to_string()));
        errors
    })?;
    Ok(ParsedTable { spec, original })
}

fn validate_schema(schema: &Map<String, Value>, table: &Map<String, Value>, errors: &mut ValidationError) {
    let mut expanded = IndexMap::new();
    match schema.get("columns") {
        None | Some(Value::Null) => errors.push("schema.columns", FieldError::Required),
        Some(Value::Object(columns)) => {
            for (name, definition) in columns {
                if let Some(column) = validate_column(name, definition, errors) {
                    expanded.insert(name.clone(), column);
                }
            }
        }
        Some(_) => errors.push("schema.columns", FieldError::NotObject),
    }

    if let Err(err) = validate_indexes(schema.get("indexes"), &expanded) {
        errors.push("schema.indexes", FieldError::Index(err));
    }
    if let Err(msg) = validators::charset(schema.get("charset"), "schema.charset", table) {
        errors.push("schema.charset", FieldError::Rule(msg));
    }
    if let Err(msg) = validators::collation(schema.get("collation"), "schema.collation", table) {
        errors.push("schema.collation", FieldError::Rule(msg));
    }
}

/// Validates one column, returning its expanded form when the datatype is
/// known. Rule failures are recorded but still yield the column so index
/// validation can see it.
fn validate_column(
    name: &str,
    definition: &Value,
    errors: &mut ValidationError,
) -> Option<ColumnSpec> {
    let path = format!("schema.columns.{name}");
    if name == "id" {
        errors.push(path, FieldError::ReservedId);
        return None;
    }
    if !is_valid_name(name) {
        errors.push(path, FieldError::InvalidName(name.to_string()));
        return None;
    }
    let (column, descriptor) = match expand_column(definition) {
        Ok(expanded) => expanded,
        Err(err) => {
            errors.push(path, err);
            return None;
        }
    };
    if let Value::Object(overrides) = definition {
        let unknown: Vec<String> = overrides
            .keys()
            .filter(|key| !descriptor.is_valid_property(key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            errors.push(path, FieldError::UnknownDatatypeProperty(unknown));
            return None;
        }
    }
    for (property, rules) in descriptor.rules() {
        if let Err(msg) = check_rules(column.get(property), property, column.properties(), rules) {
            errors.push(format!("{path}.{property}"), FieldError::Rule(msg));
        }
    }
    Some(column)
}

/// Copies the persisted keys of a table and fills in missing table options.
fn fill_table_options(table: &Map<String, Value>, defaults: &SchemaDefaults) -> Value {
    let mut original = Map::new();
    for key in ["tableName", "schema", "_fid"] {
        if let Some(value) = table.get(key) {
            original.insert(key.to_string(), value.clone());
        }
    }
    if let Some(Value::Object(schema)) = original.get_mut("schema") {
        let (charset, collation) =
            defaults.resolve(table_option(schema, "charset"), table_option(schema, "collation"));
        for (key, resolved) in [("charset", charset), ("collation", collation)] {
            let missing = match schema.get(key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if missing {
                schema.insert(key.to_string(), Value::String(resolved));
            }
        }
    }
    Value::Object(original)
}

/// Normalizes a table specification without validating it.
///
/// Columns are expanded to their full property set and a missing table
/// charset or collation is taken from `defaults`.
///
/// # Errors
///
/// [`Error::UnknownDatatype`] when a column names an unregistered type,
/// [`Error::MalformedSpec`] when the shape cannot be read at all.
pub fn normalize_spec(raw: &Value, defaults: &SchemaDefaults) -> Result<TableSpec> {
    let table_name = raw
        .get("tableName")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedSpec("missing \"tableName\"".into()))?;
    let schema = raw
        .get("schema")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::MalformedSpec(format!("table \"{table_name}\" has no schema")))?;

    let mut columns = IndexMap::new();
    match schema.get("columns") {
        None | Some(Value::Null) => {}
        Some(Value::Object(authored)) => {
            for (name, definition) in authored {
                let (column, _) = expand_column(definition).map_err(|err| match err {
                    FieldError::UnknownDatatype(type_name) => Error::UnknownDatatype(type_name),
                    other => Error::MalformedSpec(format!(
                        "column \"{name}\" of table \"{table_name}\": {other}"
                    )),
                })?;
                columns.insert(name.clone(), column);
            }
        }
        Some(_) => {
            return Err(Error::MalformedSpec(format!(
                "columns of table \"{table_name}\" must be an object"
            )))
        }
    }

    let indexes: Vec<IndexSpec> = match schema.get("indexes") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
            Error::MalformedSpec(format!("indexes of table \"{table_name}\": {err}"))
        })?,
    };

    let (charset, collation) =
        defaults.resolve(table_option(schema, "charset"), table_option(schema, "collation"));

    Ok(TableSpec {
        table_name: table_name.to_string(),
        schema: TableSchema {
            columns,
            indexes,
            charset,
            collation,
        },
        fid: raw
            .get("_fid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Normalizes a list of specifications, preserving order.
pub fn normalize_specs(raw: &[Value], defaults: &SchemaDefaults) -> Result<Vec<TableSpec>> {
    raw.iter().map(|spec| normalize_spec(spec, defaults)).collect()
}
