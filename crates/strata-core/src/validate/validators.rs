//! Named value validators.
//!
//! Every validator has the shape `(value, key, siblings) -> Result<(), message>`
//! where `value` is `None` when the property is undefined.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde_json::{Number, Value};

use crate::charset;
use crate::schema::Properties;
use crate::table::is_valid_name;

/// A named validator.
pub type Validator = fn(Option<&Value>, &str, &Properties) -> Result<(), String>;

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^-?(\d{1,3}:)?(\d\d:)\d\d)$|(^\d+$)").expect("time literal pattern compiles")
});
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));
static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("datetime pattern compiles")
});

// ================================================================
// Charset and collation
// ================================================================

pub fn charset(value: Option<&Value>, _key: &str, _attributes: &Properties) -> Result<(), String> {
    match value {
        None => Ok(()),
        Some(Value::String(name)) if charset::is_charset(name) => Ok(()),
        Some(other) => Err(format!(
            "The charset {} is not supported!",
            display(other)
        )),
    }
}

pub fn collation(value: Option<&Value>, key: &str, attributes: &Properties) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let charset_value = if key == "schema.collation" {
        attributes.get("schema").and_then(|schema| schema.get("charset"))
    } else {
        attributes.get("charset")
    };
    let Some(charset_name) = charset_value.filter(|v| !v.is_null()) else {
        return Err(
            "Missing charset detected. `charset` must be specified for the specified collation!"
                .into(),
        );
    };
    let Some(charset) = charset_name.as_str().and_then(charset::lookup) else {
        return Err("The specified mysql `charset` is invalid!".into());
    };
    match value.as_str() {
        Some(collation) if charset.supports(collation) => Ok(()),
        _ => Err("The specified mysql `collation` is invalid!".into()),
    }
}

// ================================================================
// Names
// ================================================================

pub fn table_name(value: Option<&Value>, _key: &str, _attributes: &Properties) -> Result<(), String> {
    match value.and_then(Value::as_str) {
        Some(name) if is_valid_name(name) => Ok(()),
        _ => Err(format!(
            "invalid name! names must be strings matching {}",
            crate::table::NAME_PATTERN
        )),
    }
}

// ================================================================
// Date and time literals
// ================================================================

pub fn date_value(value: Option<&Value>, _key: &str, _attributes: &Properties) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err("Invalid value for the \"date\" field. Type of value must be a string!".into());
    };
    if !DATE_RE.is_match(text) || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
        return Err(
            "Invalid value for the \"date\" field. Value must be a valid date matching \"YYYY-MM-DD\" format!"
                .into(),
        );
    }
    // Zero-padded literals order the same way as the dates they denote.
    if !("1000-01-01"..="9999-12-31").contains(&text) {
        return Err(
            "Invalid value for the \"date\" field. Value must be a valid date between \"1000-01-01\" and \"9999-12-31\"!"
                .into(),
        );
    }
    Ok(())
}

pub fn datetime_value(
    value: Option<&Value>,
    _key: &str,
    _attributes: &Properties,
) -> Result<(), String> {
    check_datetime(
        value,
        "datetime",
        ("1000-01-01 00:00:00", "9999-12-31 23:59:59"),
    )
}

pub fn timestamp_value(
    value: Option<&Value>,
    _key: &str,
    _attributes: &Properties,
) -> Result<(), String> {
    check_datetime(
        value,
        "timestamp",
        ("1970-01-01 00:00:01", "2038-01-19 03:14:07"),
    )
}

fn check_datetime(
    value: Option<&Value>,
    field: &str,
    (min, max): (&str, &str),
) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(format!(
            "Invalid value for the \"{field}\" field. Type of value must be a string!"
        ));
    };
    // chrono reads a leap second as second 59 with an overflowing fraction.
    let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S");
    if !DATETIME_RE.is_match(text)
        || !parsed.is_ok_and(|moment| moment.nanosecond() < 1_000_000_000)
    {
        return Err(format!(
            "Invalid value for the \"{field}\" field. Value must be a valid date matching \"YYYY-MM-DD HH:mm:ss\" format!"
        ));
    }
    if !(min..=max).contains(&text) {
        return Err(format!(
            "Invalid value for the \"{field}\" field. Value must be a valid date between \"{min}\" and \"{max}\"!"
        ));
    }
    Ok(())
}

pub fn time_value(value: Option<&Value>, _key: &str, _attributes: &Properties) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    if TIME_RE.is_match(&text) {
        Ok(())
    } else {
        Err(format!(
            "Invalid value for the \"time\" field: {text}! Value should match {}",
            TIME_RE.as_str()
        ))
    }
}

pub fn year_value(value: Option<&Value>, _key: &str, _attributes: &Properties) -> Result<(), String> {
    let text = match value {
        None => return Ok(()),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err("Value for the \"year\" column must be a string or a number!".into()),
    };
    let in_range = text.len() == 4
        && text.bytes().all(|b| b.is_ascii_digit())
        && text.parse::<u16>().is_ok_and(|year| (1901..=2155).contains(&year));
    if in_range {
        Ok(())
    } else {
        Err(format!(
            "Invalid value for \"year\" column: {text}. Value must be a 4-digit number in the range 1901 to 2155!"
        ))
    }
}

pub fn on_update(value: Option<&Value>, key: &str, attributes: &Properties) -> Result<(), String> {
    match value {
        None => Ok(()),
        Some(Value::String(s)) if s == "CURRENT_TIMESTAMP" => Ok(()),
        Some(_) if attributes.get("type").and_then(Value::as_str) == Some("timestamp") => {
            timestamp_value(value, key, attributes)
        }
        Some(_) => datetime_value(value, key, attributes),
    }
}

// ================================================================
// Strings, enums and sets
// ================================================================

pub fn enum_set_options(
    value: Option<&Value>,
    _key: &str,
    _attributes: &Properties,
) -> Result<(), String> {
    let Some(Value::Array(options)) = value else {
        return Err("\"options\" property must be an array!".into());
    };
    if options.is_empty() {
        return Err(
            "\"enum\"/\"set\" field's \"options\" property must have at least one value!".into(),
        );
    }
    if options.iter().any(|option| !option.is_string()) {
        return Err(
            "\"enum\"/\"set\" field's \"options\" property must be an array of strings".into(),
        );
    }
    let has_duplicates = options
        .iter()
        .enumerate()
        .any(|(i, option)| options[i + 1..].contains(option));
    if has_duplicates {
        return Err("\"enum\"/\"set\" field's \"options\" must have unique items.".into());
    }
    Ok(())
}

pub fn string_default_value(
    value: Option<&Value>,
    _key: &str,
    attributes: &Properties,
) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err("Invalid default value! Value must only be a string!".into());
    };
    let options = || {
        attributes
            .get("options")
            .and_then(Value::as_array)
            .map(|options| options.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_default()
    };
    match attributes.get("type").and_then(Value::as_str) {
        Some("enum") => {
            if options().contains(&text) {
                Ok(())
            } else {
                Err("Invalid default value for the \"enum\" field. The specified value must exist in the specified \"options\" property!".into())
            }
        }
        Some("set") => {
            let options = options();
            if text.split(',').all(|item| options.contains(&item)) {
                Ok(())
            } else {
                Err("Invalid default value for the \"set\" field. The specified items do not exist in the column options!".into())
            }
        }
        _ => {
            let too_long = attributes
                .get("length")
                .and_then(Value::as_u64)
                .is_some_and(|length| text.chars().count() as u64 > length);
            if too_long {
                Err("The length of default value for the column is bigger than the specified column \"length\"!".into())
            } else {
                Ok(())
            }
        }
    }
}

pub fn string_length(
    value: Option<&Value>,
    _key: &str,
    attributes: &Properties,
) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let column_type = attributes.get("type").and_then(Value::as_str).unwrap_or_default();
    let (min, max): (u32, u32) = match column_type {
        "char" | "binary" => (0, 255),
        "varchar" | "varbinary" => (0, 65_535),
        other => return Err(format!("Unknown string type: {other}")),
    };
    let in_range = value
        .as_f64()
        .is_some_and(|length| length >= f64::from(min) && length <= f64::from(max));
    if in_range {
        Ok(())
    } else {
        Err(format!(
            "Length of the \"{column_type}\" type must be a value between {min} and {max}. The specified length is: {}.",
            display(value)
        ))
    }
}

// ================================================================
// Integers
// ================================================================

/// Signed and unsigned default-value ranges for an integer type.
#[must_use]
pub fn int_range(column_type: &str, unsigned: bool) -> Option<(i128, i128)> {
    let (signed, unsigned_range) = match column_type {
        "int" | "integer" => (
            (i128::from(i32::MIN), i128::from(i32::MAX)),
            (0, i128::from(u32::MAX)),
        ),
        "tinyint" | "bool" | "boolean" => (
            (i128::from(i8::MIN), i128::from(i8::MAX)),
            (0, i128::from(u8::MAX)),
        ),
        "smallint" => (
            (i128::from(i16::MIN), i128::from(i16::MAX)),
            (0, i128::from(u16::MAX)),
        ),
        "mediumint" => ((-8_388_608, 8_388_607), (0, 16_777_215)),
        "bigint" => (
            (i128::from(i64::MIN), i128::from(i64::MAX)),
            (0, i128::from(u64::MAX)),
        ),
        _ => return None,
    };
    Some(if unsigned { unsigned_range } else { signed })
}

pub fn int_value(value: Option<&Value>, _key: &str, attributes: &Properties) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let column_type = attributes.get("type").and_then(Value::as_str).unwrap_or_default();
    let Value::Number(number) = value else {
        return Err(format!("Invalid value for the \"{column_type}\" column!"));
    };
    let unsigned = matches!(attributes.get("unsigned"), Some(Value::Bool(true)));
    let Some((min, max)) = int_range(column_type, unsigned) else {
        return Err(format!("Unknown type: {column_type}"));
    };
    let in_range = match as_i128(number) {
        Some(n) => n >= min && n <= max,
        None => number
            .as_f64()
            .is_some_and(|n| n >= min as f64 && n <= max as f64),
    };
    if in_range {
        Ok(())
    } else {
        Err(format!(
            "The default value for the {} {column_type} must be between {min} and {max}",
            if unsigned { "unsigned" } else { "signed" }
        ))
    }
}

fn as_i128(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}
