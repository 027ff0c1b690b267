//! Convert serde_json::Value to values sqlx can bind for SQLite.

use crate::schema::{ColumnDefinition, SqlType};
use serde_json::Value;

/// A value that can be bound to a SQLite query.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    BindValue::F64(f)
                } else {
                    BindValue::Text(n.to_string())
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Text(v.to_string()),
        }
    }
}

/// Write-side boundary: JSON columns are stored as serialized text, everything else as-is.
pub fn encode_value(column: Option<&ColumnDefinition>, v: &Value) -> Value {
    match (column.map(|c| c.sql_type), v) {
        (_, Value::Null) => Value::Null,
        (Some(SqlType::Json), v) => Value::String(v.to_string()),
        (_, Value::Array(_) | Value::Object(_)) => Value::String(v.to_string()),
        (_, v) => v.clone(),
    }
}
