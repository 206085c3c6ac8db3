//! MySQL DDL statement generation.
//!
//! Every statement ends with `;`. Identifiers are backtick-quoted and
//! string literals single-quoted with embedded quotes doubled.

use serde_json::Value;

use crate::datatype::lookup;
use crate::error::{Error, Result};
use crate::schema::{ColumnSpec, IndexKind, IndexSpec, TableSpec};
use crate::validate::index::parse_column_ref;

/// Column definition of the implicit primary key.
pub const PRIMARY_KEY_COLUMN: &str = "`id` INT(11) UNSIGNED NOT NULL AUTO_INCREMENT";

/// Single-quotes a string literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders a scalar without quoting it.
#[must_use]
pub fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quotes an identifier with backticks.
#[must_use]
pub fn ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Renders a column's DDL fragment.
pub fn column_sql(column: &ColumnSpec) -> Result<String> {
    let type_name = column.type_name().unwrap_or_default();
    let descriptor =
        lookup(type_name).ok_or_else(|| Error::UnknownDatatype(type_name.to_string()))?;
    Ok(descriptor.generate_sql(column))
}

/// `CREATE TABLE` for a table, as one line per element.
///
/// Indexes are not included; see [`create_index`].
pub fn create_table_lines(spec: &TableSpec) -> Result<Vec<String>> {
    let mut lines = vec![
        format!("CREATE TABLE {} (", ident(&spec.table_name)),
        format!("  {PRIMARY_KEY_COLUMN},"),
    ];
    for (name, column) in &spec.schema.columns {
        lines.push(format!("  {} {},", ident(name), column_sql(column)?));
    }
    lines.push("  PRIMARY KEY (`id`)".to_string());
    lines.push(format!(
        ") ENGINE=InnoDB DEFAULT CHARSET={} COLLATE={};",
        spec.schema.charset, spec.schema.collation
    ));
    Ok(lines)
}

/// `CREATE TABLE` for a table, lines joined with `\n`.
pub fn create_table(spec: &TableSpec) -> Result<String> {
    Ok(create_table_lines(spec)?.join("\n"))
}

#[must_use]
pub fn rename_table(from: &str, to: &str) -> String {
    format!("RENAME TABLE {} TO {};", ident(from), ident(to))
}

#[must_use]
pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE {};", ident(table))
}

pub fn add_column(table: &str, name: &str, column: &ColumnSpec) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD {} {};",
        ident(table),
        ident(name),
        column_sql(column)?
    ))
}

/// Redefines a column in place.
pub fn alter_column(table: &str, name: &str, column: &ColumnSpec) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} CHANGE COLUMN {} {} {};",
        ident(table),
        ident(name),
        ident(name),
        column_sql(column)?
    ))
}

#[must_use]
pub fn drop_column(table: &str, name: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {};", ident(table), ident(name))
}

#[must_use]
pub fn change_table_charset(table: &str, charset: &str, collation: &str) -> String {
    format!(
        "ALTER TABLE {} CONVERT TO CHARACTER SET {charset} COLLATE {collation};",
        ident(table)
    )
}

/// Derived index name: the table name and column references joined by `_`.
#[must_use]
pub fn index_name(table: &str, index: &IndexSpec) -> String {
    let mut name = table.to_string();
    for column in &index.columns {
        name.push('_');
        name.push_str(column);
    }
    name
}

fn index_keyword(kind: IndexKind) -> &'static str {
    match kind {
        IndexKind::Index => "INDEX",
        IndexKind::Unique => "UNIQUE INDEX",
        IndexKind::Fulltext => "FULLTEXT INDEX",
    }
}

fn index_column(reference: &str) -> String {
    match parse_column_ref(reference) {
        Some(column) => match column.prefix_length {
            Some(length) => format!("{}({length})", ident(column.name)),
            None => ident(column.name),
        },
        None => ident(reference),
    }
}

#[must_use]
pub fn create_index(table: &str, index: &IndexSpec) -> String {
    let columns: Vec<String> = index.columns.iter().map(|c| index_column(c)).collect();
    format!(
        "ALTER TABLE {} ADD {} {} ({});",
        ident(table),
        index_keyword(index.kind),
        ident(&index_name(table, index)),
        columns.join(",")
    )
}

/// Renames an index that was created while the table had another name.
#[must_use]
pub fn rename_index(old_table: &str, new_table: &str, index: &IndexSpec) -> String {
    format!(
        "ALTER TABLE {} RENAME INDEX {} TO {};",
        ident(new_table),
        ident(&index_name(old_table, index)),
        ident(&index_name(new_table, index))
    )
}

#[must_use]
pub fn drop_index(table: &str, index: &IndexSpec) -> String {
    drop_index_named(table, &index_name(table, index))
}

#[must_use]
pub fn drop_index_named(table: &str, index_name: &str) -> String {
    format!("ALTER TABLE {} DROP INDEX {};", ident(table), ident(index_name))
}
