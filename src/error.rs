//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("invalid related reference on {class_name}.{field}: '{related}' (expected table.column)")]
    InvalidRelated {
        class_name: String,
        field: String,
        related: String,
    },
    #[error("class {class_name} has no fields; refusing to generate a schema")]
    NoFields { class_name: String },
    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),
    #[error("manifest load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Query construction errors. All of these fail closed: nothing is sent to the database.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("malformed where operator in '{0}'")]
    MalformedOperator(String),
    #[error("unknown field '{field}' on {table}")]
    UnknownField { table: String, field: String },
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("unknown relation '{relation}' on {class_name}")]
    UnknownRelation { class_name: String, relation: String },
    #[error("not supported: {0}")]
    Unsupported(String),
    #[error("no identifying fields (id or unique column) in upsert data for {0}")]
    NoIdentifyingFields(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Query(QueryError::Unsupported(_)) => (StatusCode::NOT_IMPLEMENTED, "unsupported"),
            AppError::Query(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(sqlx::Error::Database(db))
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                (StatusCode::CONFLICT, "conflict")
            }
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
