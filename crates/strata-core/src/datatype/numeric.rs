//! Integer, fixed/floating point and bit datatypes.

use serde_json::{json, Value};

use super::{number, type_head, Category, Clauses, Descriptor};
use crate::schema::ColumnSpec;
use crate::validate::{self, Check, Rule};

pub(super) fn descriptors() -> Vec<Descriptor> {
    vec![
        integer("int", "int", 11),
        integer("integer", "integer", 11),
        integer("tinyint", "tinyint", 3),
        integer("smallint", "smallint", 6),
        integer("mediumint", "mediumint", 9),
        integer("bigint", "bigint", 20),
        integer("boolean", "tinyint", 1),
        integer("bool", "tinyint", 1),
        bit(),
        fixed_floating("dec", 10, "Fixed-Point"),
        fixed_floating("decimal", 10, "Fixed-Point"),
        fixed_floating("fixed", 10, "Fixed-Point"),
        fixed_floating("numeric", 10, "Fixed-Point"),
        fixed_floating("float", 12, "Floating-Point"),
        fixed_floating("double", 22, "Floating-Point"),
        fixed_floating("real", 22, "Floating-Point"),
        fixed_floating("double precision", 22, "Floating-Point"),
    ]
}

fn integer(key: &'static str, sql_type: &'static str, width: u32) -> Descriptor {
    let defaults = vec![
        ("type", Some(json!(sql_type))),
        ("width", Some(json!(width))),
        ("default", None),
        ("nullable", Some(Value::Bool(true))),
        ("unsigned", Some(Value::Bool(false))),
        ("zerofill", Some(Value::Bool(false))),
        ("comment", None),
    ];
    let rules = vec![
        ("width", validate::int_display_width()),
        ("nullable", vec![Rule::Boolean]),
        ("default", vec![Rule::Number, Rule::Check(Check::IntValue)]),
        ("unsigned", vec![Rule::Boolean]),
        ("zerofill", vec![Rule::Boolean]),
        ("comment", validate::comment()),
    ];
    Descriptor::new(
        key,
        Category::Numeric,
        "Integer",
        defaults,
        rules,
        render_integer,
    )
}

fn render_integer(column: &ColumnSpec) -> String {
    let mut sql = Clauses::new(format!("{}({})", type_head(column), number(column, "width")));
    sql.push_if(column.flag("unsigned"), "UNSIGNED");
    sql.default_value(column, false);
    sql.not_null(column);
    sql.push_if(column.flag("zerofill"), "ZEROFILL");
    sql.comment(column);
    sql.finish()
}

fn fixed_floating(key: &'static str, precision: u32, sub_category: &'static str) -> Descriptor {
    let defaults = vec![
        ("type", Some(json!(key))),
        ("precision", Some(json!(precision))),
        ("scale", Some(json!(0))),
        ("unsigned", Some(Value::Bool(false))),
        ("zerofill", Some(Value::Bool(false))),
        ("nullable", Some(Value::Bool(true))),
        ("default", None),
        ("comment", None),
    ];
    let rules = vec![
        ("precision", validate::precision()),
        ("scale", validate::scale()),
        ("nullable", vec![Rule::Boolean]),
        ("unsigned", vec![Rule::Boolean]),
        ("default", vec![Rule::Number]),
        ("zerofill", vec![Rule::Boolean]),
        ("comment", validate::comment()),
    ];
    Descriptor::new(
        key,
        Category::Numeric,
        sub_category,
        defaults,
        rules,
        render_fixed_floating,
    )
}

fn render_fixed_floating(column: &ColumnSpec) -> String {
    let mut sql = Clauses::new(format!(
        "{}({}, {})",
        type_head(column),
        number(column, "precision"),
        number(column, "scale")
    ));
    sql.push_if(column.flag("unsigned"), "UNSIGNED");
    sql.default_value(column, false);
    sql.not_null(column);
    sql.push_if(column.flag("zerofill"), "ZEROFILL");
    sql.comment(column);
    sql.finish()
}

fn bit() -> Descriptor {
    let defaults = vec![
        ("type", Some(json!("bit"))),
        ("length", Some(json!(1))),
        ("nullable", Some(Value::Bool(true))),
        ("default", None),
        ("comment", None),
    ];
    let rules = vec![
        ("length", vec![Rule::Number, Rule::Integer, Rule::Range(1, 64)]),
        ("nullable", vec![Rule::Boolean]),
        ("comment", validate::comment()),
    ];
    Descriptor::new("bit", Category::Numeric, "Bit", defaults, rules, render_bit)
}

fn render_bit(column: &ColumnSpec) -> String {
    let mut sql = Clauses::new(format!("BIT({})", number(column, "length")));
    sql.not_null(column);
    sql.default_value(column, false);
    sql.comment(column);
    sql.finish()
}
