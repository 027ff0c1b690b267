//! Derived schema model: one `SchemaDefinition` per object definition.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Boolean,
    Datetime,
    Json,
}

impl SqlType {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Datetime => "DATETIME",
            SqlType::Json => "JSON",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDefinition {
    pub column: String,
    pub table: String,
    pub references: String,
    pub on_delete: String,
    pub on_update: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub not_null: bool,
    /// Rendered SQL default expression (`''`, `CURRENT_TIMESTAMP`, `0`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyDefinition>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerTiming {
    Before,
    After,
}

impl TriggerTiming {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDefinition {
    pub name: String,
    pub when: TriggerTiming,
    pub event: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    pub table_name: String,
    pub class_name: String,
    /// Keyed by column name; a name can only ever appear once.
    pub columns: IndexMap<String, ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
    pub triggers: Vec<TriggerDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    /// Tables that must exist before this one (FK targets, parent class table). Sorted.
    pub dependencies: Vec<String>,
    /// Content hash over class name, resolved fields and inheritance chain.
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_class: Option<String>,
}

impl SchemaDefinition {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Non-primary unique columns (slug, email, declared unique).
    pub fn unique_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.values().filter(|c| c.unique && !c.primary_key)
    }
}
