//! Manifest handlers: tool manifest, endpoint lists, per-class DDL.

use crate::error::AppError;
use crate::manifest::{CliCommand, ManifestGenerator, McpEndpoint, RestEndpoint, ToolDescriptor};
use crate::schema::{render_ddl, SchemaGenerator};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

pub async fn tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(ManifestGenerator::new(&state.registry).tool_manifest())
}

pub async fn rest_endpoints(State(state): State<AppState>) -> Json<Vec<RestEndpoint>> {
    Json(ManifestGenerator::new(&state.registry).rest_endpoints())
}

pub async fn mcp_endpoints(State(state): State<AppState>) -> Json<Vec<McpEndpoint>> {
    Json(ManifestGenerator::new(&state.registry).mcp_endpoints())
}

pub async fn cli_commands(State(state): State<AppState>) -> Json<Vec<CliCommand>> {
    Json(ManifestGenerator::new(&state.registry).cli_commands())
}

/// DDL text for one class, as `text/plain`.
pub async fn schema_ddl(
    State(state): State<AppState>,
    Path(class_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if state.registry.get_definition(&class_name).is_none() {
        return Err(AppError::NotFound(format!("class {}", class_name)));
    }
    let schema = SchemaGenerator::new(&state.registry).generate(&class_name)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], render_ddl(&schema)))
}
