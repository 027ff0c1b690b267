//! Manifests over the whole registry, in registration order.

use crate::manifest::endpoints::{
    cli_command, crud_mcp_endpoint, generate_rest_endpoint, method_mcp_endpoint, method_rest_endpoint, CliCommand,
    McpEndpoint, RestEndpoint,
};
use crate::manifest::policy::should_include_method;
use crate::manifest::tools::{generate_mcp_tool, generate_tool_from_method, ToolDescriptor};
use crate::definition::CrudOperation;
use crate::registry::MetadataRegistry;

pub struct ManifestGenerator<'a> {
    registry: &'a MetadataRegistry,
}

impl<'a> ManifestGenerator<'a> {
    pub fn new(registry: &'a MetadataRegistry) -> Self {
        Self { registry }
    }

    /// Tools for one class on the MCP surface: CRUD tools first, then exposed methods.
    pub fn tools_for(&self, class_name: &str) -> Vec<ToolDescriptor> {
        let Some(def) = self.registry.get_definition(class_name) else {
            return Vec::new();
        };
        let fields = self.registry.resolved_fields(class_name);
        let surface = def.mcp_surface();
        let mut tools: Vec<ToolDescriptor> = CrudOperation::ALL
            .into_iter()
            .filter_map(|op| generate_mcp_tool(def, &fields, op))
            .collect();
        tools.extend(
            def.methods
                .iter()
                .filter(|m| should_include_method(m, &surface))
                .map(|m| generate_tool_from_method(def, m)),
        );
        tools
    }

    /// The AI function-calling manifest for every registered class.
    pub fn tool_manifest(&self) -> Vec<ToolDescriptor> {
        self.registry
            .definitions()
            .flat_map(|d| self.tools_for(&d.class_name))
            .collect()
    }

    pub fn rest_endpoints(&self) -> Vec<RestEndpoint> {
        let mut out = Vec::new();
        for def in self.registry.definitions() {
            out.extend(CrudOperation::ALL.into_iter().filter_map(|op| generate_rest_endpoint(def, op)));
            let surface = def.api_surface();
            out.extend(
                def.methods
                    .iter()
                    .filter(|m| should_include_method(m, &surface))
                    .map(|m| method_rest_endpoint(def, m)),
            );
        }
        out
    }

    pub fn mcp_endpoints(&self) -> Vec<McpEndpoint> {
        let mut out = Vec::new();
        for def in self.registry.definitions() {
            let surface = def.mcp_surface();
            out.extend(surface.operations().into_iter().map(|op| crud_mcp_endpoint(def, op)));
            out.extend(
                def.methods
                    .iter()
                    .filter(|m| should_include_method(m, &surface))
                    .map(|m| method_mcp_endpoint(def, m)),
            );
        }
        out
    }

    pub fn cli_commands(&self) -> Vec<CliCommand> {
        let mut out = Vec::new();
        for def in self.registry.definitions() {
            let surface = def.cli_surface();
            out.extend(surface.operations().into_iter().map(|op| cli_command(def, op.as_str())));
            out.extend(
                def.methods
                    .iter()
                    .filter(|m| should_include_method(m, &surface))
                    .map(|m| cli_command(def, &m.name)),
            );
        }
        out
    }
}
