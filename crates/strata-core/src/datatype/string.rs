//! Character, binary, text/blob and enum/set datatypes.

use serde_json::{json, Value};

use super::{number, type_head, Category, Clauses, Descriptor};
use crate::schema::ColumnSpec;
use crate::sql::quote_literal;
use crate::validate::{self, Check, Rule};

pub(super) fn descriptors() -> Vec<Descriptor> {
    let mut all: Vec<Descriptor> = ["varchar", "char", "varbinary", "binary"]
        .into_iter()
        .map(var_char)
        .collect();
    all.extend(
        [
            "text",
            "tinytext",
            "mediumtext",
            "longtext",
            "blob",
            "tinyblob",
            "mediumblob",
            "longblob",
        ]
        .into_iter()
        .map(text),
    );
    all.extend(["enum", "set"].into_iter().map(enum_set));
    all
}

fn common_rules() -> Vec<(&'static str, Vec<Rule>)> {
    vec![
        ("collate", vec![Rule::Check(Check::Collation)]),
        ("nullable", vec![Rule::Boolean]),
        ("charset", vec![Rule::Check(Check::Charset)]),
        ("comment", validate::comment()),
    ]
}

fn var_char(key: &'static str) -> Descriptor {
    let length = if key == "varchar" { 255 } else { 1 };
    let defaults = vec![
        ("type", Some(json!(key))),
        ("length", Some(json!(length))),
        ("default", None),
        ("nullable", Some(Value::Bool(true))),
        ("collate", None),
        ("charset", None),
        ("comment", None),
    ];
    let mut rules = vec![
        ("default", vec![Rule::Check(Check::StringDefault)]),
        (
            "length",
            vec![Rule::Number, Rule::Integer, Rule::Check(Check::StringLength)],
        ),
    ];
    rules.extend(common_rules());
    Descriptor::new(key, Category::String, "Character", defaults, rules, render_var_char)
}

fn render_var_char(column: &ColumnSpec) -> String {
    let mut sql = Clauses::new(format!("{}({})", type_head(column), number(column, "length")));
    sql.default_value(column, true);
    sql.not_null(column);
    sql.charset(column);
    sql.comment(column);
    sql.finish()
}

fn text(key: &'static str) -> Descriptor {
    let defaults = vec![
        ("type", Some(json!(key))),
        ("nullable", Some(Value::Bool(true))),
        ("collate", None),
        ("charset", None),
        ("comment", None),
    ];
    let sub_category = if key.ends_with("blob") { "Blob" } else { "Text" };
    Descriptor::new(
        key,
        Category::String,
        sub_category,
        defaults,
        common_rules(),
        render_text,
    )
}

fn render_text(column: &ColumnSpec) -> String {
    let mut sql = Clauses::new(type_head(column));
    sql.not_null(column);
    sql.charset(column);
    sql.comment(column);
    sql.finish()
}

fn enum_set(key: &'static str) -> Descriptor {
    let defaults = vec![
        ("type", Some(json!(key))),
        ("nullable", Some(Value::Bool(true))),
        ("default", None),
        ("collate", None),
        ("charset", None),
        ("comment", None),
        ("options", Some(json!([]))),
    ];
    let mut rules = vec![
        ("options", vec![Rule::Check(Check::EnumSetOptions)]),
        ("default", vec![Rule::Check(Check::StringDefault)]),
    ];
    rules.extend(common_rules());
    Descriptor::new(key, Category::String, "Enum/Set", defaults, rules, render_enum_set)
}

fn render_enum_set(column: &ColumnSpec) -> String {
    let options = column
        .get("options")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(Value::as_str)
                .map(quote_literal)
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    let mut sql = Clauses::new(format!("{}({options})", type_head(column)));
    sql.not_null(column);
    sql.default_value(column, true);
    sql.charset(column);
    sql.comment(column);
    sql.finish()
}
