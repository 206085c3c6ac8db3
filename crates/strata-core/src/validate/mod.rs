//! Declarative per-property validation rules.
//!
//! Each datatype lists, for every property it validates, an ordered list of
//! [`Rule`]s. [`check_rules`] runs them in order against one property value
//! and stops at the first failure. An absent (undefined) value always
//! passes: every property has a default, and the named validators accept
//! undefined values.

pub mod index;
pub mod validators;

use serde_json::Value;

use crate::schema::Properties;

pub use validators::Validator;

/// A single constraint on a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Value must be a boolean.
    Boolean,
    /// Value must be a number.
    Number,
    /// Value must be an integral number.
    Integer,
    /// Numeric value must lie in the inclusive range.
    Range(i64, i64),
    /// Value must be a string.
    String,
    /// String value must not be longer than this many characters.
    MaxLength(usize),
    /// Numeric value must not exceed the named sibling property.
    NotAbove(&'static str),
    /// Delegates to a named validator.
    Check(Check),
}

/// Named validators usable from rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Charset,
    Collation,
    IntValue,
    StringLength,
    StringDefault,
    EnumSetOptions,
    Date,
    Datetime,
    Timestamp,
    Time,
    Year,
    OnUpdate,
}

impl Check {
    /// Returns the validator's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Charset => "sql_charset",
            Self::Collation => "sql_collation",
            Self::IntValue => "sql_int_value",
            Self::StringLength => "sql_string_length",
            Self::StringDefault => "sql_string_default_value",
            Self::EnumSetOptions => "sql_enum_set_options",
            Self::Date => "sql_date_value",
            Self::Datetime => "sql_datetime_value",
            Self::Timestamp => "sql_timestamp_value",
            Self::Time => "sql_time_value",
            Self::Year => "sql_year_value",
            Self::OnUpdate => "sql_on_update",
        }
    }

    /// Returns the validator function.
    #[must_use]
    pub fn validator(self) -> Validator {
        match self {
            Self::Charset => validators::charset,
            Self::Collation => validators::collation,
            Self::IntValue => validators::int_value,
            Self::StringLength => validators::string_length,
            Self::StringDefault => validators::string_default_value,
            Self::EnumSetOptions => validators::enum_set_options,
            Self::Date => validators::date_value,
            Self::Datetime => validators::datetime_value,
            Self::Timestamp => validators::timestamp_value,
            Self::Time => validators::time_value,
            Self::Year => validators::year_value,
            Self::OnUpdate => validators::on_update,
        }
    }

    /// Looks up a validator by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_CHECKS.iter().copied().find(|check| check.name() == name)
    }
}

const ALL_CHECKS: [Check; 12] = [
    Check::Charset,
    Check::Collation,
    Check::IntValue,
    Check::StringLength,
    Check::StringDefault,
    Check::EnumSetOptions,
    Check::Date,
    Check::Datetime,
    Check::Timestamp,
    Check::Time,
    Check::Year,
    Check::OnUpdate,
];

// ================================================================
// Rule aliases
// ================================================================

/// Optional comment of at most 64 characters.
#[must_use]
pub fn comment() -> Vec<Rule> {
    vec![Rule::String, Rule::MaxLength(64)]
}

/// Fractional seconds precision.
#[must_use]
pub fn fsp() -> Vec<Rule> {
    vec![Rule::Number, Rule::Integer, Rule::Range(0, 6)]
}

/// Fixed/floating point precision.
#[must_use]
pub fn precision() -> Vec<Rule> {
    vec![Rule::Number, Rule::Integer, Rule::Range(0, 65)]
}

/// Fixed/floating point scale, never above the precision.
#[must_use]
pub fn scale() -> Vec<Rule> {
    vec![
        Rule::Number,
        Rule::Integer,
        Rule::Range(0, 30),
        Rule::NotAbove("precision"),
    ]
}

/// Integer display width.
#[must_use]
pub fn int_display_width() -> Vec<Rule> {
    vec![Rule::Number, Rule::Integer, Rule::Range(0, 255)]
}

// ================================================================
// Interpreter
// ================================================================

/// Runs `rules` against the value of property `key`.
///
/// `attributes` are the sibling properties of the value (the whole column
/// for column properties).
pub fn check_rules(
    value: Option<&Value>,
    key: &str,
    attributes: &Properties,
    rules: &[Rule],
) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    for rule in rules {
        check_rule(value, key, attributes, *rule)?;
    }
    Ok(())
}

fn check_rule(value: &Value, key: &str, attributes: &Properties, rule: Rule) -> Result<(), String> {
    match rule {
        Rule::Boolean => {
            if !value.is_boolean() {
                return Err(format!("\"{key}\" must be a boolean"));
            }
        }
        Rule::Number => {
            if !value.is_number() {
                return Err(format!("\"{key}\" must be a number"));
            }
        }
        Rule::Integer => {
            if !is_integral(value) {
                return Err(format!("\"{key}\" must be an integer"));
            }
        }
        Rule::Range(min, max) => {
            let in_range = value
                .as_f64()
                .is_some_and(|n| n >= min as f64 && n <= max as f64);
            if !in_range {
                return Err(format!("\"{key}\" must be between {min} and {max}"));
            }
        }
        Rule::String => {
            if !value.is_string() {
                return Err(format!("\"{key}\" must be a string"));
            }
        }
        Rule::MaxLength(max) => {
            if value.as_str().is_some_and(|s| s.chars().count() > max) {
                return Err(format!("\"{key}\" must be at most {max} characters long"));
            }
        }
        Rule::NotAbove(sibling) => {
            let limit = attributes.get(sibling).and_then(Value::as_f64);
            if let (Some(n), Some(limit)) = (value.as_f64(), limit) {
                if n > limit {
                    return Err(format!("\"{key}\" must not be greater than \"{sibling}\""));
                }
            }
        }
        Rule::Check(check) => (check.validator())(Some(value), key, attributes)?,
    }
    Ok(())
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}
