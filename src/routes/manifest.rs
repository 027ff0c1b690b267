//! Manifest routes: tool manifest, REST/MCP/CLI endpoint lists, and per-class DDL.

use crate::handlers::manifest::{cli_commands, mcp_endpoints, rest_endpoints, schema_ddl, tools};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn manifest_routes(state: AppState) -> Router {
    Router::new()
        .route("/manifest/tools", get(tools))
        .route("/manifest/endpoints", get(rest_endpoints))
        .route("/manifest/mcp", get(mcp_endpoints))
        .route("/manifest/cli", get(cli_commands))
        .route("/schema/:class_name", get(schema_ddl))
        .with_state(state)
}
