//! Validation of a table's index list.
//!
//! Unlike column validation this is fail-fast: the first defect found in
//! the list is returned.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::schema::{ColumnSpec, IndexKind};

/// Column types that need a prefix length when indexed.
const PREFIX_REQUIRED_TYPES: &[&str] = &[
    "blob",
    "tinyblob",
    "mediumblob",
    "longblob",
    "text",
    "tinytext",
    "mediumtext",
    "longtext",
];

/// Column types a `fulltext` index may cover.
const FULLTEXT_TYPES: &[&str] = &[
    "char",
    "varchar",
    "text",
    "tinytext",
    "mediumtext",
    "longtext",
];

static COLUMN_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z](?:_?[a-z]+)*)(?:\((\d+)\))?$").expect("index column pattern compiles")
});

/// Reasons an index list is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("\"indexes\" property must be an array of object(s)!")]
    NotArray,

    #[error("An index must be defined as an object!")]
    NotObject,

    #[error("\"columns\" property of an index must be an array!")]
    ColumnsNotArray,

    #[error("Invalid index type. \"type\" property must be one of these values: {}", IndexKind::ALL.join(", "))]
    InvalidType,

    #[error("An index must cover at least one column!")]
    EmptyColumns,

    #[error("Invalid index column name: {0}! The column should match \"name\" or \"name(length)\".")]
    InvalidColumnName(String),

    #[error("Index has duplicate column: \"{0}\"")]
    DuplicateColumn(String),

    #[error("Column name specified for indexing doesn't exist: \"{0}\"")]
    ColumnNotFound(String),

    #[error("When you index a BLOB or TEXT column, you must specify a prefix length for the index: \"{0}\"")]
    MissingPrefixLength(String),

    #[error("FULLTEXT indexes are supported only for CHAR, VARCHAR, and TEXT columns: \"{column}\" is {column_type}")]
    UnsupportedFulltextType { column: String, column_type: String },
}

/// A parsed `name` / `name(length)` column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef<'a> {
    pub name: &'a str,
    pub prefix_length: Option<&'a str>,
}

/// Parses an index column reference.
#[must_use]
pub fn parse_column_ref(reference: &str) -> Option<ColumnRef<'_>> {
    let captures = COLUMN_REF_RE.captures(reference)?;
    Some(ColumnRef {
        name: captures.get(1)?.as_str(),
        prefix_length: captures.get(2).map(|m| m.as_str()),
    })
}

/// Validates the `schema.indexes` value against the table's columns.
///
/// An undefined index list is valid.
pub fn validate_indexes(
    value: Option<&Value>,
    columns: &IndexMap<String, ColumnSpec>,
) -> Result<(), IndexError> {
    let indexes = match value {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Array(indexes)) => indexes,
        Some(_) => return Err(IndexError::NotArray),
    };
    for index in indexes {
        let Value::Object(index) = index else {
            return Err(IndexError::NotObject);
        };
        let Some(Value::Array(references)) = index.get("columns") else {
            return Err(IndexError::ColumnsNotArray);
        };
        let kind = index
            .get("type")
            .and_then(Value::as_str)
            .and_then(IndexKind::parse)
            .ok_or(IndexError::InvalidType)?;
        if references.is_empty() {
            return Err(IndexError::EmptyColumns);
        }
        for (i, reference) in references.iter().enumerate() {
            let Some(text) = reference.as_str() else {
                return Err(IndexError::InvalidColumnName(reference.to_string()));
            };
            let Some(column_ref) = parse_column_ref(text) else {
                return Err(IndexError::InvalidColumnName(format!("\"{text}\"")));
            };
            if references[i + 1..].contains(reference) {
                return Err(IndexError::DuplicateColumn(text.to_string()));
            }
            let Some(column) = columns.get(column_ref.name) else {
                return Err(IndexError::ColumnNotFound(text.to_string()));
            };
            let column_type = column.type_name().unwrap_or_default();
            if kind == IndexKind::Fulltext {
                if !FULLTEXT_TYPES.contains(&column_type) {
                    return Err(IndexError::UnsupportedFulltextType {
                        column: text.to_string(),
                        column_type: column_type.to_string(),
                    });
                }
            } else if PREFIX_REQUIRED_TYPES.contains(&column_type)
                && column_ref.prefix_length.is_none()
            {
                return Err(IndexError::MissingPrefixLength(text.to_string()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::datatype::lookup;

    fn columns(types: &[(&str, &str)]) -> IndexMap<String, ColumnSpec> {
        types
            .iter()
            .map(|(name, ty)| ((*name).to_string(), lookup(ty).unwrap().defaults()))
            .collect()
    }

    #[test]
    fn test_valid_indexes() {
        let cols = columns(&[("foo", "varchar"), ("bar", "char"), ("body", "text")]);
        let indexes = json!([
            { "type": "index", "columns": ["foo", "bar"] },
            { "type": "fulltext", "columns": ["foo", "body"] },
            { "type": "unique", "columns": ["body(10)"] }
        ]);
        assert_eq!(validate_indexes(Some(&indexes), &cols), Ok(()));
        assert_eq!(validate_indexes(None, &cols), Ok(()));
    }

    #[test]
    fn test_each_failure_kind() {
        let cols = columns(&[("foo", "varchar"), ("baz", "int"), ("body", "blob")]);
        let cases = [
            (json!({}), IndexError::NotArray),
            (json!(["index"]), IndexError::NotObject),
            (json!([{ "type": "index", "columns": "foo" }]), IndexError::ColumnsNotArray),
            (json!([{ "type": "primary", "columns": ["foo"] }]), IndexError::InvalidType),
            (json!([{ "type": "index", "columns": [] }]), IndexError::EmptyColumns),
            (
                json!([{ "type": "index", "columns": ["Foo"] }]),
                IndexError::InvalidColumnName("\"Foo\"".into()),
            ),
            (
                json!([{ "type": "index", "columns": ["foo", "foo"] }]),
                IndexError::DuplicateColumn("foo".into()),
            ),
            (
                json!([{ "type": "index", "columns": ["doesnotexist"] }]),
                IndexError::ColumnNotFound("doesnotexist".into()),
            ),
            (
                json!([{ "type": "unique", "columns": ["body"] }]),
                IndexError::MissingPrefixLength("body".into()),
            ),
            (
                json!([{ "type": "fulltext", "columns": ["baz"] }]),
                IndexError::UnsupportedFulltextType {
                    column: "baz".into(),
                    column_type: "int".into(),
                },
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(validate_indexes(Some(&value), &cols), Err(expected), "{value}");
        }
    }

    #[test]
    fn test_fail_fast_returns_first_violation() {
        let cols = columns(&[("foo", "varchar"), ("baz", "int")]);
        let indexes = json!([
            { "type": "index", "columns": ["doesnotexist"] },
            { "type": "fulltext", "columns": ["baz"] }
        ]);
        assert_eq!(
            validate_indexes(Some(&indexes), &cols),
            Err(IndexError::ColumnNotFound("doesnotexist".into()))
        );
    }

    #[test]
    fn test_parse_column_ref() {
        assert_eq!(
            parse_column_ref("body(255)"),
            Some(ColumnRef {
                name: "body",
                prefix_length: Some("255"),
            })
        );
        assert_eq!(parse_column_ref("t").map(|r| r.name), Some("t"));
        assert!(parse_column_ref("").is_none());
        assert!(parse_column_ref("(10)").is_none());
        assert!(parse_column_ref("a__b").is_none());
    }
}
