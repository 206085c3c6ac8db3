//! Date and time datatypes.

use serde_json::{json, Value};

use super::{type_head, Category, Clauses, Descriptor};
use crate::schema::ColumnSpec;
use crate::validate::{self, Check, Rule};

pub(super) fn descriptors() -> Vec<Descriptor> {
    vec![
        temporal("date", Check::Date, false, false),
        temporal("time", Check::Time, true, false),
        temporal("datetime", Check::Datetime, true, true),
        temporal("timestamp", Check::Timestamp, true, true),
        temporal("year", Check::Year, false, false),
    ]
}

fn temporal(key: &'static str, default_check: Check, fsp: bool, on_update: bool) -> Descriptor {
    let mut defaults = vec![
        ("type", Some(json!(key))),
        ("default", None),
        ("nullable", Some(Value::Bool(true))),
        ("comment", None),
    ];
    let mut rules = vec![
        ("nullable", vec![Rule::Boolean]),
        ("default", vec![Rule::Check(default_check)]),
        ("comment", validate::comment()),
    ];
    if on_update {
        defaults.push(("on_update", None));
        rules.push(("on_update", vec![Rule::Check(Check::OnUpdate)]));
    }
    if fsp {
        defaults.push(("fsp", Some(json!(0))));
        rules.push(("fsp", validate::fsp()));
    }
    Descriptor::new(
        key,
        Category::DateAndTime,
        "Date and Time",
        defaults,
        rules,
        render_temporal,
    )
}

fn render_temporal(column: &ColumnSpec) -> String {
    let fsp = column
        .get("fsp")
        .and_then(Value::as_u64)
        .filter(|fsp| *fsp > 0);
    let head = match fsp {
        Some(fsp) => format!("{}({fsp})", type_head(column)),
        None => type_head(column),
    };
    let mut sql = Clauses::new(head);
    sql.not_null(column);
    // YEAR literals are plain numbers.
    sql.default_value(column, column.type_name() != Some("year"));
    if let Some(expr) = column.text("on_update") {
        sql.push(format!("ON UPDATE {expr}"));
    }
    sql.comment(column);
    sql.finish()
}
