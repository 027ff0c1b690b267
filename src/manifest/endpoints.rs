//! REST, MCP and CLI endpoint descriptors, consumed by whatever server does the dispatch.

use crate::case::to_snake_case;
use crate::definition::{CrudOperation, MethodDefinition, ObjectDefinition};
use crate::manifest::tools::{crud_tool_name, method_tool_name};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestEndpoint {
    pub method: &'static str,
    pub path: String,
    /// CRUD operation name or the exposed method's name.
    pub operation: String,
    pub class_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpEndpoint {
    pub tool_name: String,
    pub operation: String,
    pub class_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliCommand {
    /// `{collection} {operation}`, e.g. `articles list`.
    pub command: String,
    pub operation: String,
    pub class_name: String,
}

/// REST endpoint for a CRUD operation, or None when the API surface does not expose it.
pub fn generate_rest_endpoint(def: &ObjectDefinition, op: CrudOperation) -> Option<RestEndpoint> {
    if !def.api_surface().allows(op) {
        return None;
    }
    let collection = def.table_name();
    let (method, path) = match op {
        CrudOperation::List => ("GET", format!("/{}", collection)),
        CrudOperation::Create => ("POST", format!("/{}", collection)),
        CrudOperation::Get => ("GET", format!("/{}/:id", collection)),
        CrudOperation::Update => ("PATCH", format!("/{}/:id", collection)),
        CrudOperation::Delete => ("DELETE", format!("/{}/:id", collection)),
    };
    Some(RestEndpoint {
        method,
        path,
        operation: op.as_str().to_string(),
        class_name: def.class_name.clone(),
    })
}

/// `POST /{collection}/:id/{method}` for an exposed instance method.
pub fn method_rest_endpoint(def: &ObjectDefinition, method: &MethodDefinition) -> RestEndpoint {
    RestEndpoint {
        method: "POST",
        path: format!("/{}/:id/{}", def.table_name(), method.name),
        operation: method.name.clone(),
        class_name: def.class_name.clone(),
    }
}

pub fn crud_mcp_endpoint(def: &ObjectDefinition, op: CrudOperation) -> McpEndpoint {
    McpEndpoint {
        tool_name: crud_tool_name(def, op),
        operation: op.as_str().to_string(),
        class_name: def.class_name.clone(),
    }
}

pub fn method_mcp_endpoint(def: &ObjectDefinition, method: &MethodDefinition) -> McpEndpoint {
    McpEndpoint {
        tool_name: method_tool_name(def, method),
        operation: method.name.clone(),
        class_name: def.class_name.clone(),
    }
}

pub fn cli_command(def: &ObjectDefinition, operation: &str) -> CliCommand {
    CliCommand {
        command: format!("{} {}", def.table_name(), to_snake_case(operation).replace('_', "-")),
        operation: operation.to_string(),
        class_name: def.class_name.clone(),
    }
}
