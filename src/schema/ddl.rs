//! Render a `SchemaDefinition` to SQLite DDL. Every statement is idempotent (`IF NOT EXISTS`).

use crate::schema::types::{ColumnDefinition, IndexDefinition, SchemaDefinition, TriggerDefinition};
use crate::sql::quoted;

fn column_def(c: &ColumnDefinition) -> String {
    let mut def = format!("{} {}", quoted(&c.name), c.sql_type);
    if c.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if c.not_null {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = &c.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(d);
    }
    def
}

pub fn create_table(schema: &SchemaDefinition) -> String {
    let mut parts: Vec<String> = schema.columns.values().map(column_def).collect();
    for fk in &schema.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quoted(&fk.column),
            quoted(&fk.table),
            quoted(&fk.references),
            fk.on_delete,
            fk.on_update
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&schema.table_name),
        parts.join(",\n  ")
    )
}

pub fn create_index(table: &str, idx: &IndexDefinition) -> String {
    let cols: Vec<String> = idx.columns.iter().map(|c| quoted(c)).collect();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if idx.unique { "UNIQUE " } else { "" },
        quoted(&idx.name),
        quoted(table),
        cols.join(", ")
    )
}

pub fn create_trigger(table: &str, trg: &TriggerDefinition) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS {} {} {} ON {}\nFOR EACH ROW\nBEGIN\n  {}\nEND",
        quoted(&trg.name),
        trg.when.as_str(),
        trg.event,
        quoted(table),
        trg.body
    )
}

/// Statements in execution order: table, indexes, triggers.
pub fn render_statements(schema: &SchemaDefinition) -> Vec<String> {
    let mut out = vec![create_table(schema)];
    out.extend(schema.indexes.iter().map(|i| create_index(&schema.table_name, i)));
    out.extend(schema.triggers.iter().map(|t| create_trigger(&schema.table_name, t)));
    out
}

/// Full DDL script for one table.
pub fn render_ddl(schema: &SchemaDefinition) -> String {
    let mut script = render_statements(schema).join(";\n\n");
    script.push(';');
    script
}
