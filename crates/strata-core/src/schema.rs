//! Canonical table specification types.
//!
//! These types describe a table after normalization: every column carries
//! its datatype's full property set, and the table charset/collation are
//! resolved. They serialize to the same shape users author
//! (`tableName`, `schema`, `_fid`).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property bag of a column (`type` plus type-specific properties).
///
/// An undefined property is simply absent from the map.
pub type Properties = Map<String, Value>;

/// A column definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSpec(Properties);

impl ColumnSpec {
    /// Creates a column spec from a property bag.
    #[must_use]
    pub const fn new(properties: Properties) -> Self {
        Self(properties)
    }

    /// Returns the column's datatype name.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.text("type")
    }

    /// Returns a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a string property.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns `true` only when the property is the boolean `true`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Value::Bool(true)))
    }

    /// Returns `true` when the column is declared `nullable: false`.
    #[must_use]
    pub fn is_not_null(&self) -> bool {
        matches!(self.0.get("nullable"), Some(Value::Bool(false)))
    }

    /// Sets a property, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Returns the underlying properties.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.0
    }

    /// Consumes the spec and returns its properties.
    #[must_use]
    pub fn into_properties(self) -> Properties {
        self.0
    }
}

/// Kind of a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Index,
    Unique,
    Fulltext,
}

impl IndexKind {
    /// All accepted index kinds, as authored.
    pub const ALL: [&'static str; 3] = ["index", "unique", "fulltext"];

    /// Parses an authored index type.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "index" => Some(Self::Index),
            "unique" => Some(Self::Unique),
            "fulltext" => Some(Self::Fulltext),
            _ => None,
        }
    }

    /// Returns the authored name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Unique => "unique",
            Self::Fulltext => "fulltext",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secondary index over one or more columns.
///
/// Column references are `name` or `name(length)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    #[serde(rename = "type")]
    pub kind: IndexKind,
    pub columns: Vec<String>,
}

impl IndexSpec {
    #[must_use]
    pub fn new<I, S>(kind: IndexKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Columns, indexes and table options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: IndexMap<String, ColumnSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSpec>,
    pub charset: String,
    pub collation: String,
}

/// A canonical table specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    #[serde(rename = "tableName")]
    pub table_name: String,
    pub schema: TableSchema,
    /// Stable identity of the table across renames.
    #[serde(rename = "_fid", default)]
    pub fid: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_column_accessors() {
        let Value::Object(props) = json!({
            "type": "int",
            "nullable": false,
            "unsigned": true,
            "zerofill": "yes"
        }) else {
            unreachable!()
        };
        let col = ColumnSpec::new(props);
        assert_eq!(col.type_name(), Some("int"));
        assert!(col.is_not_null());
        assert!(col.flag("unsigned"));
        assert!(!col.flag("zerofill"));
        assert!(!col.flag("missing"));
    }

    #[test]
    fn test_table_spec_serializes_authored_shape() {
        let spec = TableSpec {
            table_name: "users".into(),
            schema: TableSchema {
                columns: IndexMap::new(),
                indexes: vec![IndexSpec::new(IndexKind::Unique, ["email"])],
                charset: "utf8mb4".into(),
                collation: "utf8mb4_unicode_ci".into(),
            },
            fid: "abc".into(),
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({
                "tableName": "users",
                "schema": {
                    "columns": {},
                    "indexes": [{ "type": "unique", "columns": ["email"] }],
                    "charset": "utf8mb4",
                    "collation": "utf8mb4_unicode_ci"
                },
                "_fid": "abc"
            })
        );
    }

    #[test]
    fn test_index_kind_parse() {
        assert_eq!(IndexKind::parse("fulltext"), Some(IndexKind::Fulltext));
        assert_eq!(IndexKind::parse("primary"), None);
        assert_eq!(IndexKind::Unique.to_string(), "unique");
    }
}
