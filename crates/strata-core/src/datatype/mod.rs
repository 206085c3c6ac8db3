//! Registry of supported MySQL column datatypes.
//!
//! Each [`Descriptor`] defines a datatype's default properties (which also
//! define the full legal property set), its per-property validation rules,
//! and how a conforming column renders to a DDL fragment.

mod numeric;
mod string;
mod temporal;

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde_json::Value;

use crate::schema::{ColumnSpec, Properties};
use crate::validate::Rule;

/// Broad family of a datatype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Numeric,
    String,
    DateAndTime,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::DateAndTime => "date and time",
        })
    }
}

/// Renders a normalized column to its DDL fragment.
pub type Render = fn(&ColumnSpec) -> String;

/// Definition of one datatype.
#[derive(Clone)]
pub struct Descriptor {
    key: &'static str,
    category: Category,
    sub_category: &'static str,
    defaults: Vec<(&'static str, Option<Value>)>,
    rules: Vec<(&'static str, Vec<Rule>)>,
    render: Render,
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("key", &self.key)
            .field("category", &self.category)
            .field("sub_category", &self.sub_category)
            .field("defaults", &self.defaults)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl Descriptor {
    pub(crate) fn new(
        key: &'static str,
        category: Category,
        sub_category: &'static str,
        defaults: Vec<(&'static str, Option<Value>)>,
        rules: Vec<(&'static str, Vec<Rule>)>,
        render: Render,
    ) -> Self {
        Self {
            key,
            category,
            sub_category,
            defaults,
            rules,
            render,
        }
    }

    /// Registry key, as authored in models (`varchar`, `bool`, ...).
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub const fn sub_category(&self) -> &'static str {
        self.sub_category
    }

    /// SQL type written into normalized columns.
    ///
    /// Differs from [`key`](Self::key) for aliases such as `bool`.
    #[must_use]
    pub fn sql_type(&self) -> &str {
        self.defaults
            .iter()
            .find(|(name, _)| *name == "type")
            .and_then(|(_, value)| value.as_ref())
            .and_then(Value::as_str)
            .unwrap_or(self.key)
    }

    /// Default column: every defined default, undefined ones left out.
    #[must_use]
    pub fn defaults(&self) -> ColumnSpec {
        let properties = self
            .defaults
            .iter()
            .filter_map(|(name, value)| value.clone().map(|v| ((*name).to_string(), v)))
            .collect();
        ColumnSpec::new(properties)
    }

    /// Every legal property with its default, `null` for undefined ones.
    #[must_use]
    pub fn describe(&self) -> Properties {
        self.defaults
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone().unwrap_or(Value::Null)))
            .collect()
    }

    /// Names of the legal properties.
    pub fn valid_properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.defaults.iter().map(|(name, _)| *name)
    }

    #[must_use]
    pub fn is_valid_property(&self, name: &str) -> bool {
        self.defaults.iter().any(|(prop, _)| *prop == name)
    }

    /// Per-property rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[(&'static str, Vec<Rule>)] {
        &self.rules
    }

    /// Renders a conforming column.
    #[must_use]
    pub fn generate_sql(&self, column: &ColumnSpec) -> String {
        (self.render)(column)
    }
}

/// The set of registered datatypes, in registration order.
#[derive(Debug)]
pub struct Registry {
    descriptors: IndexMap<&'static str, Descriptor>,
}

impl Registry {
    fn new() -> Self {
        let descriptors = string::descriptors()
            .into_iter()
            .chain(numeric::descriptors())
            .chain(temporal::descriptors())
            .map(|descriptor| (descriptor.key, descriptor))
            .collect();
        Self { descriptors }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.descriptors.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Returns the process-wide registry.
#[must_use]
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Looks up a datatype by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Descriptor> {
    REGISTRY.get(name)
}

// ================================================================
// Rendering helpers shared by the datatype families
// ================================================================

/// Accumulates the clauses of a column definition.
pub(crate) struct Clauses(Vec<String>);

impl Clauses {
    pub(crate) fn new(head: String) -> Self {
        Self(vec![head])
    }

    pub(crate) fn push(&mut self, clause: String) {
        self.0.push(clause);
    }

    pub(crate) fn push_if(&mut self, condition: bool, clause: &str) {
        if condition {
            self.0.push(clause.to_string());
        }
    }

    /// `DEFAULT v`, with strings quoted when `quote_strings` is set.
    pub(crate) fn default_value(&mut self, column: &ColumnSpec, quote_strings: bool) {
        if let Some(value) = column.get("default").filter(|v| !v.is_null()) {
            let rendered = match value {
                Value::String(s) if quote_strings => crate::sql::quote_literal(s),
                other => crate::sql::literal(other),
            };
            self.0.push(format!("DEFAULT {rendered}"));
        }
    }

    pub(crate) fn not_null(&mut self, column: &ColumnSpec) {
        self.push_if(column.is_not_null(), "NOT NULL");
    }

    /// `CHARACTER SET c` and `COLLATE co`.
    pub(crate) fn charset(&mut self, column: &ColumnSpec) {
        if let Some(charset) = column.text("charset") {
            self.0.push(format!("CHARACTER SET {charset}"));
        }
        if let Some(collate) = column.text("collate") {
            self.0.push(format!("COLLATE {collate}"));
        }
    }

    pub(crate) fn comment(&mut self, column: &ColumnSpec) {
        if let Some(comment) = column.text("comment") {
            self.0
                .push(format!("COMMENT {}", crate::sql::quote_literal(comment)));
        }
    }

    pub(crate) fn finish(self) -> String {
        self.0.join(" ")
    }
}

/// Upper-cased SQL type of a column.
pub(crate) fn type_head(column: &ColumnSpec) -> String {
    column.type_name().unwrap_or_default().to_uppercase()
}

/// Renders a numeric property, or an empty string when undefined.
pub(crate) fn number(column: &ColumnSpec, key: &str) -> String {
    column
        .get(key)
        .map(crate::sql::literal)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validate::check_rules;

    #[test]
    fn test_registry_contains_every_family() {
        let expected = [
            "varchar", "char", "varbinary", "binary", "text", "tinytext", "mediumtext",
            "longtext", "blob", "tinyblob", "mediumblob", "longblob", "enum", "set", "int",
            "integer", "tinyint", "smallint", "mediumint", "bigint", "boolean", "bool", "bit",
            "dec", "decimal", "fixed", "numeric", "float", "double", "real",
            "double precision", "date", "time", "datetime", "timestamp", "year",
        ];
        for name in expected {
            assert!(lookup(name).is_some(), "missing datatype {name}");
        }
        assert_eq!(registry().len(), expected.len());
        assert!(lookup("d2").is_none());
    }

    #[test]
    fn test_defaults_pass_their_own_rules() {
        for descriptor in registry().iter() {
            let mut column = descriptor.defaults();
            if matches!(descriptor.key(), "enum" | "set") {
                column.set("options", json!(["one"]));
            }
            for (property, rules) in descriptor.rules() {
                let result = check_rules(
                    column.get(property),
                    property,
                    column.properties(),
                    rules,
                );
                assert!(
                    result.is_ok(),
                    "{}.{property}: {}",
                    descriptor.key(),
                    result.unwrap_err()
                );
            }
        }
    }

    #[test]
    fn test_rules_only_reference_valid_properties() {
        for descriptor in registry().iter() {
            for (property, _) in descriptor.rules() {
                assert!(
                    descriptor.is_valid_property(property),
                    "{} has a rule for unknown property {property}",
                    descriptor.key()
                );
            }
        }
    }

    #[test]
    fn test_aliases_normalize_to_sql_type() {
        let bool_type = lookup("bool").unwrap();
        assert_eq!(bool_type.sql_type(), "tinyint");
        assert_eq!(bool_type.defaults().get("width"), Some(&json!(1)));
        assert_eq!(lookup("varchar").unwrap().sql_type(), "varchar");
    }

    #[test]
    fn test_describe_lists_undefined_properties_as_null() {
        let described = lookup("varchar").unwrap().describe();
        assert_eq!(described.get("length"), Some(&json!(255)));
        assert_eq!(described.get("default"), Some(&Value::Null));
        assert!(lookup("varchar").unwrap().defaults().get("default").is_none());
    }
}
