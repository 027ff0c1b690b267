//! Loaded objects and the read-side hydration boundary.

use crate::schema::{ColumnDefinition, SchemaDefinition, SqlType};
use crate::service::executor::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

/// Eager-loaded relationship data attached to an instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Related {
    /// Many-to-one (foreign key). None when the key is null or points nowhere.
    One(Option<Box<Instance>>),
    /// One-to-many.
    Many(Vec<Instance>),
}

impl Related {
    pub fn as_one(&self) -> Option<&Instance> {
        match self {
            Related::One(one) => one.as_deref(),
            Related::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> &[Instance] {
        match self {
            Related::Many(many) => many,
            Related::One(_) => &[],
        }
    }
}

/// One row of a collection, hydrated, plus whatever relationships were loaded for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    class_name: String,
    data: Map<String, Value>,
    related: IndexMap<String, Related>,
}

/// Flat object: columns first, then relationships. A relationship loaded under a column's own
/// name (`include: ["author"]` on an `author` foreign key) replaces the raw key in the output.
impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let shadowed = self.data.keys().filter(|k| self.related.contains_key(*k)).count();
        let mut map = serializer.serialize_map(Some(self.data.len() - shadowed + self.related.len()))?;
        for (k, v) in &self.data {
            if !self.related.contains_key(k) {
                map.serialize_entry(k, v)?;
            }
        }
        for (k, v) in &self.related {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Instance {
    pub fn new(class_name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            class_name: class_name.into(),
            data,
            related: IndexMap::new(),
        }
    }

    pub(crate) fn from_row(schema: &SchemaDefinition, row: Row) -> Self {
        Self::new(schema.class_name.clone(), hydrate_row(schema, row))
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }

    pub fn is_related_loaded(&self, name: &str) -> bool {
        self.related.contains_key(name)
    }

    pub fn get_related(&self, name: &str) -> Option<&Related> {
        self.related.get(name)
    }

    pub(crate) fn set_related(&mut self, name: impl Into<String>, related: Related) {
        self.related.insert(name.into(), related);
    }
}

/// Convert a stored row to its typed JSON form. Columns the schema does not know pass through.
pub fn hydrate_row(schema: &SchemaDefinition, row: Row) -> Map<String, Value> {
    row.into_iter()
        .map(|(k, v)| {
            let v = match schema.column(&k) {
                Some(col) => hydrate_value(col, v),
                None => v,
            };
            (k, v)
        })
        .collect()
}

/// Read-side boundary: JSON text is parsed, 0/1 become booleans, datetimes become RFC 3339.
pub fn hydrate_value(column: &ColumnDefinition, v: Value) -> Value {
    match (column.sql_type, v) {
        (_, Value::Null) => Value::Null,
        (SqlType::Json, Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        (SqlType::Boolean, Value::Number(n)) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        (SqlType::Datetime, Value::String(s)) => Value::String(normalize_datetime(&s).unwrap_or(s)),
        (_, v) => v,
    }
}

/// Normalise the datetime spellings SQLite and clients produce to RFC 3339 (UTC when no offset).
pub fn normalize_datetime(s: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_rfc3339());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().to_rfc3339());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().to_rfc3339())
}
