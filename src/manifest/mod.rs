//! Tool and endpoint manifests derived from object definitions.

mod endpoints;
mod generator;
mod json_schema;
mod policy;
mod tools;

pub use endpoints::{
    cli_command, crud_mcp_endpoint, generate_rest_endpoint, method_mcp_endpoint, method_rest_endpoint, CliCommand,
    McpEndpoint, RestEndpoint,
};
pub use generator::ManifestGenerator;
pub use json_schema::convert_type_to_json_schema;
pub use policy::should_include_method;
pub use tools::{
    crud_tool_name, field_json_schema, generate_crud_tool, generate_mcp_tool, generate_tool_from_method,
    method_tool_name, FunctionDescriptor, ToolDescriptor,
};
