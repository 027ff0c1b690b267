//! AI function-calling tool descriptors for CRUD operations and exposed methods.

use crate::case::{singular_name, to_snake_case};
use crate::definition::{CrudOperation, FieldDefinition, FieldType, MethodDefinition, ObjectDefinition, OrderedMap};
use crate::manifest::json_schema::convert_type_to_json_schema;
use crate::schema::SYSTEM_COLUMNS;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// `{ "type": "function", "function": { name, description, parameters } }`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDescriptor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDescriptor,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: "function",
            function: FunctionDescriptor {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

fn object_schema(properties: Map<String, Value>, required: Vec<String>) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn id_property(class_name: &str) -> Value {
    json!({ "type": "string", "description": format!("Id of the {}", class_name) })
}

/// Tool name for a CRUD operation: `list_{collection}`, `{op}_{name}` otherwise.
pub fn crud_tool_name(def: &ObjectDefinition, op: CrudOperation) -> String {
    match op {
        CrudOperation::List => format!("list_{}", def.table_name()),
        _ => format!("{}_{}", op.as_str(), singular_name(&def.class_name)),
    }
}

/// Tool name for a method: `{class}_{method}` in snake_case.
pub fn method_tool_name(def: &ObjectDefinition, method: &MethodDefinition) -> String {
    format!("{}_{}", singular_name(&def.class_name), to_snake_case(&method.name))
}

/// Parameters without a default (and not optional) are required; types go through the
/// type-string converter.
pub fn generate_tool_from_method(def: &ObjectDefinition, method: &MethodDefinition) -> ToolDescriptor {
    let mut properties = Map::new();
    let mut required = Vec::new();
    if !method.is_static {
        properties.insert("id".into(), id_property(&def.class_name));
        required.push("id".to_string());
    }
    for p in &method.parameters {
        let mut schema = convert_type_to_json_schema(&p.type_string);
        if let Some(obj) = schema.as_object_mut() {
            if let Some(desc) = &p.description {
                obj.insert("description".into(), Value::String(desc.clone()));
            }
            if let Some(default) = &p.default {
                obj.insert("default".into(), default.clone());
            }
        }
        if !p.optional && p.default.is_none() {
            required.push(p.name.clone());
        }
        properties.insert(p.name.clone(), schema);
    }
    let description = method
        .description
        .clone()
        .unwrap_or_else(|| format!("Call {} on a {}", method.name, def.class_name));
    ToolDescriptor::function(method_tool_name(def, method), description, object_schema(properties, required))
}

/// JSON Schema for one declared field.
pub fn field_json_schema(field: &FieldDefinition) -> Value {
    let mut schema = match &field.field_type {
        FieldType::Text => json!({ "type": "string" }),
        FieldType::Integer => json!({ "type": "integer" }),
        FieldType::Decimal => json!({ "type": "number" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Datetime => json!({ "type": "string", "format": "date-time" }),
        FieldType::Json => json!({ "type": "object" }),
        FieldType::ForeignKey => {
            let target = field.related_target().map(|(t, _)| t).unwrap_or_default();
            json!({ "type": "string", "description": format!("Id of the related {} row", target) })
        }
        FieldType::Other(raw) => convert_type_to_json_schema(raw),
    };
    if let Some(obj) = schema.as_object_mut() {
        if let Some(n) = field.min_length {
            obj.insert("minLength".into(), json!(n));
        }
        if let Some(n) = field.max_length {
            obj.insert("maxLength".into(), json!(n));
        }
        if let Some(n) = field.min {
            obj.insert("minimum".into(), json!(n));
        }
        if let Some(n) = field.max {
            obj.insert("maximum".into(), json!(n));
        }
        if let Some(desc) = &field.description {
            obj.insert("description".into(), Value::String(desc.clone()));
        }
        if let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) {
            obj.insert("default".into(), default.clone());
        }
    }
    schema
}

fn field_properties(fields: &OrderedMap<FieldDefinition>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(name, _)| !SYSTEM_COLUMNS.contains(&name.as_str()))
        .map(|(name, f)| (name.clone(), field_json_schema(f)))
        .collect()
}

/// CRUD tool for one operation. `fields` should be the resolved (inherited) fields.
pub fn generate_crud_tool(
    def: &ObjectDefinition,
    fields: &OrderedMap<FieldDefinition>,
    op: CrudOperation,
) -> ToolDescriptor {
    let class = &def.class_name;
    let (description, parameters) = match op {
        CrudOperation::List => {
            let mut props = Map::new();
            props.insert(
                "where".into(),
                json!({ "type": "object", "description": "Filters keyed by field or \"field <op>\" (=, !=, >, >=, <, <=, like, in)" }),
            );
            props.insert("limit".into(), json!({ "type": "integer", "minimum": 1 }));
            props.insert("offset".into(), json!({ "type": "integer", "minimum": 0 }));
            props.insert(
                "orderBy".into(),
                json!({ "oneOf": [{ "type": "string" }, { "type": "array", "items": { "type": "string" } }] }),
            );
            props.insert("include".into(), json!({ "type": "array", "items": { "type": "string" } }));
            (format!("List {} records", class), object_schema(props, Vec::new()))
        }
        CrudOperation::Get => {
            let mut props = Map::new();
            props.insert("id".into(), id_property(class));
            (format!("Get one {} by id", class), object_schema(props, vec!["id".into()]))
        }
        CrudOperation::Create => {
            let required = fields
                .iter()
                .filter(|(name, f)| f.required && f.default.is_none() && !SYSTEM_COLUMNS.contains(&name.as_str()))
                .map(|(name, _)| name.clone())
                .collect();
            (format!("Create a {}", class), object_schema(field_properties(fields), required))
        }
        CrudOperation::Update => {
            let mut props = Map::new();
            props.insert("id".into(), id_property(class));
            props.extend(field_properties(fields));
            (format!("Update fields of a {}", class), object_schema(props, vec!["id".into()]))
        }
        CrudOperation::Delete => {
            let mut props = Map::new();
            props.insert("id".into(), id_property(class));
            (format!("Delete a {}", class), object_schema(props, vec!["id".into()]))
        }
    };
    ToolDescriptor::function(crud_tool_name(def, op), description, parameters)
}

/// MCP tool for a CRUD operation, or None when the MCP surface does not expose it.
pub fn generate_mcp_tool(
    def: &ObjectDefinition,
    fields: &OrderedMap<FieldDefinition>,
    op: CrudOperation,
) -> Option<ToolDescriptor> {
    def.mcp_surface().allows(op).then(|| generate_crud_tool(def, fields, op))
}
