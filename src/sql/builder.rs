//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE for a generated schema.
//! Identifiers only ever come from the schema; values only ever travel as `?` parameters.

use crate::schema::{SchemaDefinition, ID_COLUMN, SYSTEM_COLUMNS};
use crate::sql::filter::{OrderBy, Predicate};
use crate::sql::params::encode_value;
use serde_json::{Map, Value};

/// Quote an identifier (safe: names only come from validated definitions).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> &'static str {
        self.params.push(v);
        "?"
    }
}

fn select_column_list(schema: &SchemaDefinition) -> String {
    schema.column_names().map(quoted).collect::<Vec<_>>().join(", ")
}

fn render_predicate(q: &mut QueryBuf, schema: &SchemaDefinition, p: &Predicate) -> String {
    let col = quoted(&p.column);
    if p.value.is_null() {
        return if p.op.is_negated() {
            format!("{} IS NOT NULL", col)
        } else {
            format!("{} IS NULL", col)
        };
    }
    let column = schema.column(&p.column);
    if p.op.is_in() {
        let items = p.value.as_array().map(Vec::as_slice).unwrap_or(&[]);
        if items.is_empty() {
            return "1 = 0".into();
        }
        let placeholders: Vec<&str> = items
            .iter()
            .map(|v| q.push_param(encode_value(column, v)))
            .collect();
        return format!("{} IN ({})", col, placeholders.join(", "));
    }
    let ph = q.push_param(encode_value(column, &p.value));
    format!("{} {} {}", col, p.op.sql(), ph)
}

fn where_clause(q: &mut QueryBuf, schema: &SchemaDefinition, predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = predicates
        .iter()
        .map(|p| render_predicate(q, schema, p))
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

fn order_clause(order: &[OrderBy]) -> String {
    if order.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = order
        .iter()
        .map(|o| format!("{} {}", quoted(&o.column), if o.descending { "DESC" } else { "ASC" }))
        .collect();
    format!(" ORDER BY {}", parts.join(", "))
}

fn limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
    match (limit, offset) {
        (Some(l), Some(o)) => format!(" LIMIT {} OFFSET {}", l, o),
        (Some(l), None) => format!(" LIMIT {}", l),
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
        (None, Some(o)) => format!(" LIMIT -1 OFFSET {}", o),
        (None, None) => String::new(),
    }
}

/// SELECT with ANDed predicates, optional ORDER BY and LIMIT/OFFSET. No implicit ordering.
pub fn select_list(
    schema: &SchemaDefinition,
    predicates: &[Predicate],
    order: &[OrderBy],
    limit: Option<u64>,
    offset: Option<u64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, schema, predicates);
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}",
        select_column_list(schema),
        quoted(&schema.table_name),
        where_sql,
        order_clause(order),
        limit_clause(limit, offset)
    );
    q
}

/// SELECT COUNT(*) with the same predicates as `select_list`.
pub fn count(schema: &SchemaDefinition, predicates: &[Predicate]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, schema, predicates);
    q.sql = format!(
        "SELECT COUNT(*) AS \"count\" FROM {}{}",
        quoted(&schema.table_name),
        where_sql
    );
    q
}

/// SELECT one row by id.
pub fn select_by_id(schema: &SchemaDefinition, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} LIMIT 1",
        select_column_list(schema),
        quoted(&schema.table_name),
        quoted(ID_COLUMN),
        ph
    );
    q
}

/// SELECT one row whose id or slug equals `key`, preferring the id match.
/// Falls back to id only when there is no slug column.
pub fn select_by_key(schema: &SchemaDefinition, key: &str) -> QueryBuf {
    if !schema.has_column("slug") {
        return select_by_id(schema, &Value::String(key.to_string()));
    }
    let mut q = QueryBuf::new();
    for _ in 0..3 {
        q.push_param(Value::String(key.to_string()));
    }
    q.sql = format!(
        "SELECT {cols} FROM {t} WHERE {id} = ? OR {slug} = ? ORDER BY ({id} = ?) DESC LIMIT 1",
        cols = select_column_list(schema),
        t = quoted(&schema.table_name),
        id = quoted(ID_COLUMN),
        slug = quoted("slug")
    );
    q
}

/// SELECT rows WHERE column IN (...). Used for batch-fetching related rows.
/// An empty value list still yields one (empty) statement: `WHERE 1 = 0`.
pub fn select_by_column_in(schema: &SchemaDefinition, column: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&schema.table_name);
    let cols = select_column_list(schema);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let target = schema.column(column);
    let placeholders: Vec<&str> = values
        .iter()
        .map(|v| q.push_param(encode_value(target, v)))
        .collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({})",
        cols,
        table,
        quoted(column),
        placeholders.join(", ")
    );
    q
}

/// INSERT the schema columns present in `row`, in schema order. Omitted columns take their
/// database default.
pub fn insert(schema: &SchemaDefinition, row: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for column in schema.columns.values() {
        let Some(v) = row.get(&column.name) else { continue };
        placeholders.push(q.push_param(encode_value(Some(column), v)));
        cols.push(quoted(&column.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&schema.table_name),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(schema)
    );
    q
}

/// UPDATE by id, setting exactly the schema columns present in `changes`. System columns are
/// never written; `updated_at` is left to the table trigger. Returns None when nothing would be written.
pub fn update(schema: &SchemaDefinition, id: &Value, changes: &Map<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in changes {
        if SYSTEM_COLUMNS.contains(&k.as_str()) {
            continue;
        }
        let Some(column) = schema.column(k) else { continue };
        let ph = q.push_param(encode_value(Some(column), v));
        sets.push(format!("{} = {}", quoted(k), ph));
    }
    if sets.is_empty() {
        return None;
    }
    q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ? RETURNING {}",
        quoted(&schema.table_name),
        sets.join(", "),
        quoted(ID_COLUMN),
        select_column_list(schema)
    );
    Some(q)
}

/// DELETE by id, returning the removed row.
pub fn delete(schema: &SchemaDefinition, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ? RETURNING {}",
        quoted(&schema.table_name),
        quoted(ID_COLUMN),
        select_column_list(schema)
    );
    q
}
