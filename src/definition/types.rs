//! Object definition data model, matching the manifest JSON produced by the source scanner.

use crate::case::table_name_for;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name-keyed map that keeps declaration order.
pub type OrderedMap<V> = IndexMap<String, V>;

/// Parent class name meaning "no persistent parent".
pub const BASE_CLASS: &str = "BaseObject";

pub fn is_base_class(name: &str) -> bool {
    name.trim().is_empty() || name == BASE_CLASS
}

/// Declared field type. Unrecognised names are kept verbatim so the schema layer can log and fall back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Datetime,
    Json,
    ForeignKey,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
            FieldType::Json => "json",
            FieldType::ForeignKey => "foreignKey",
            FieldType::Other(s) => s,
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => FieldType::Text,
            "integer" => FieldType::Integer,
            "decimal" => FieldType::Decimal,
            "boolean" => FieldType::Boolean,
            "datetime" => FieldType::Datetime,
            "json" => FieldType::Json,
            "foreignKey" => FieldType::ForeignKey,
            _ => FieldType::Other(s),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Filled from the map key when the manifest omits it.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `table.column` target of a foreignKey field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            unique: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            description: None,
            related: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn foreign_key(name: impl Into<String>, related: impl Into<String>) -> Self {
        let mut f = Self::new(name, FieldType::ForeignKey);
        f.related = Some(related.into());
        f
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_length(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Parse `related` as `(table, column)`. A bare table name targets `id`.
    /// Returns None when absent or malformed (empty parts, more than one dot).
    pub fn related_target(&self) -> Option<(String, String)> {
        let related = self.related.as_deref()?.trim();
        let mut parts = related.split('.');
        let table = parts.next().filter(|t| !t.is_empty())?;
        let column = match parts.next() {
            Some(c) if !c.is_empty() => c,
            Some(_) => return None,
            None => "id",
        };
        if parts.next().is_some() {
            return None;
        }
        Some((table.to_string(), column.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub name: String,
    /// Source-level type string, e.g. `string`, `number[]`, `'draft' | 'published'`.
    #[serde(rename = "type", default = "any_type")]
    pub type_string: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn any_type() -> String {
    "any".into()
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, type_string: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_string: type_string.into(),
            optional: false,
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDefinition {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default, rename = "async")]
    pub is_async: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

impl MethodDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            is_async: false,
            visibility: Visibility::Public,
            is_static: false,
            description: None,
            return_type: None,
        }
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_parameter(mut self, p: ParameterDefinition) -> Self {
        self.parameters.push(p);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Generated CRUD operations per object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudOperation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl CrudOperation {
    pub const ALL: [CrudOperation; 5] = [
        CrudOperation::List,
        CrudOperation::Get,
        CrudOperation::Create,
        CrudOperation::Update,
        CrudOperation::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CrudOperation::List => "list",
            CrudOperation::Get => "get",
            CrudOperation::Create => "create",
            CrudOperation::Update => "update",
            CrudOperation::Delete => "delete",
        }
    }
}

/// Which methods become callable on a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Callable {
    All,
    PublicAsync,
    #[default]
    None,
}

/// Inclusion policy for one generated surface (REST, MCP, CLI).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub callable: Callable,
    /// Method allow-list.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Method deny-list; always wins.
    #[serde(default)]
    pub exclude_methods: Vec<String>,
    /// CRUD operations to expose; None means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<CrudOperation>>,
    /// CRUD operations to hide; always wins over `include`.
    #[serde(default)]
    pub exclude: Vec<CrudOperation>,
}

fn default_true() -> bool {
    true
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            callable: Callable::None,
            methods: Vec::new(),
            exclude_methods: Vec::new(),
            include: None,
            exclude: Vec::new(),
        }
    }
}

impl SurfaceConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// CRUD operations exposed on this surface, in canonical order.
    pub fn operations(&self) -> Vec<CrudOperation> {
        if !self.enabled {
            return Vec::new();
        }
        CrudOperation::ALL
            .into_iter()
            .filter(|op| self.include.as_ref().map(|inc| inc.contains(op)).unwrap_or(true))
            .filter(|op| !self.exclude.contains(op))
            .collect()
    }

    pub fn allows(&self, op: CrudOperation) -> bool {
        self.operations().contains(&op)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    OneToMany,
    ManyToMany,
}

/// A relationship not backed by a column on this table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDefinition {
    pub kind: RelationKind,
    /// Target class name.
    pub target: String,
    /// Column on the target table pointing back at our id (oneToMany).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    /// Join table (manyToMany).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
}

impl RelationDefinition {
    pub fn one_to_many(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::OneToMany,
            target: target.into(),
            foreign_key: Some(foreign_key.into()),
            through: None,
        }
    }

    pub fn many_to_many(target: impl Into<String>, through: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::ManyToMany,
            target: target.into(),
            foreign_key: None,
            through: Some(through.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    pub class_name: String,
    /// Explicit table/collection name; derived from the class name when absent.
    #[serde(default, rename = "tableName", skip_serializing_if = "Option::is_none")]
    pub table_override: Option<String>,
    #[serde(default)]
    pub fields: OrderedMap<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodDefinition>,
    #[serde(default)]
    pub relations: OrderedMap<RelationDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<SurfaceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config: Option<SurfaceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_config: Option<SurfaceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ObjectDefinition {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            table_override: None,
            fields: OrderedMap::new(),
            extends: None,
            methods: Vec::new(),
            relations: OrderedMap::new(),
            api_config: None,
            mcp_config: None,
            cli_config: None,
            package_name: None,
            description: None,
        }
    }

    /// Insert or replace a field by name.
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_override = Some(table.into());
        self
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn with_method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: RelationDefinition) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    pub fn with_api_config(mut self, config: SurfaceConfig) -> Self {
        self.api_config = Some(config);
        self
    }

    pub fn with_mcp_config(mut self, config: SurfaceConfig) -> Self {
        self.mcp_config = Some(config);
        self
    }

    pub fn with_cli_config(mut self, config: SurfaceConfig) -> Self {
        self.cli_config = Some(config);
        self
    }

    pub fn table_name(&self) -> String {
        table_name_for(&self.class_name, self.table_override.as_deref())
    }

    /// Parent class when it is a persistent class rather than the base object.
    pub fn parent_class(&self) -> Option<&str> {
        self.extends.as_deref().filter(|p| !is_base_class(p))
    }

    pub fn api_surface(&self) -> SurfaceConfig {
        self.api_config.clone().unwrap_or_default()
    }

    pub fn mcp_surface(&self) -> SurfaceConfig {
        self.mcp_config.clone().unwrap_or_default()
    }

    pub fn cli_surface(&self) -> SurfaceConfig {
        self.cli_config.clone().unwrap_or_default()
    }

    /// Fill field names from map keys.
    pub(crate) fn normalize(&mut self) {
        for (key, field) in self.fields.iter_mut() {
            if field.name.is_empty() {
                field.name = key.clone();
            }
        }
    }
}

/// The versioned manifest file produced by the source-scanning step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default = "default_manifest_version")]
    pub version: u32,
    #[serde(default)]
    pub objects: Vec<ObjectDefinition>,
}

fn default_manifest_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_type_keeps_unknown_names() {
        let f: FieldDefinition = serde_json::from_value(json!({"type": "geopoint"})).unwrap();
        assert_eq!(f.field_type, FieldType::Other("geopoint".into()));
        assert_eq!(serde_json::to_value(&f.field_type).unwrap(), json!("geopoint"));

        let f: FieldDefinition = serde_json::from_value(json!({"type": "foreignKey", "related": "users.id"})).unwrap();
        assert_eq!(f.field_type, FieldType::ForeignKey);
    }

    #[test]
    fn related_target_parsing() {
        let f = FieldDefinition::foreign_key("author_id", "users.id");
        assert_eq!(f.related_target(), Some(("users".into(), "id".into())));

        let f = FieldDefinition::foreign_key("author_id", "users");
        assert_eq!(f.related_target(), Some(("users".into(), "id".into())));

        let f = FieldDefinition::foreign_key("author_id", "users.");
        assert_eq!(f.related_target(), None);

        let f = FieldDefinition::foreign_key("author_id", "a.b.c");
        assert_eq!(f.related_target(), None);
    }

    #[test]
    fn surface_operations_exclude_wins() {
        let cfg = SurfaceConfig {
            include: Some(vec![CrudOperation::List, CrudOperation::Delete]),
            exclude: vec![CrudOperation::Delete],
            ..SurfaceConfig::default()
        };
        assert_eq!(cfg.operations(), vec![CrudOperation::List]);
        assert!(SurfaceConfig::disabled().operations().is_empty());
        assert_eq!(SurfaceConfig::default().operations().len(), 5);
    }

    #[test]
    fn object_definition_from_manifest_json() {
        let mut def: ObjectDefinition = serde_json::from_value(json!({
            "className": "Article",
            "fields": {
                "title": {"type": "text", "required": true, "maxLength": 200},
                "body": {"type": "text"}
            },
            "extends": "BaseObject",
            "methods": [{"name": "publish", "async": true, "parameters": [{"name": "at", "type": "string", "optional": true}]}],
            "apiConfig": {"callable": "public-async"}
        }))
        .unwrap();
        def.normalize();

        assert_eq!(def.table_name(), "articles");
        assert_eq!(def.parent_class(), None);
        assert_eq!(def.fields["title"].name, "title");
        assert_eq!(def.fields["title"].max_length, Some(200));
        assert!(def.methods[0].is_async);
        assert_eq!(def.api_surface().callable, Callable::PublicAsync);
        assert!(def.mcp_surface().enabled);
    }
}
