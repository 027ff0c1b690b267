//! Collection CRUD handlers: list, create, read, update, delete over any registered class.

use crate::definition::CrudOperation;
use crate::error::AppError;
use crate::response::{success_many, success_one, success_one_ok};
use crate::schema::{SchemaDefinition, SqlType};
use crate::service::{Collection, ListOptions};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn require(collection: &Collection, op: CrudOperation) -> Result<(), AppError> {
    if collection.definition().api_surface().allows(op) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("{} not allowed", op.as_str())))
    }
}

/// Query-string values arrive as text; type them by column.
fn query_value_for_column(schema: &SchemaDefinition, col: &str, s: &str) -> Value {
    match schema.column(col).map(|c| c.sql_type) {
        Some(SqlType::Integer) => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::String(s.into())),
        Some(SqlType::Real) => s.parse::<f64>().map(Value::from).unwrap_or_else(|_| Value::String(s.into())),
        Some(SqlType::Boolean) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        Some(SqlType::Boolean) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

fn comma_list(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty()).map(str::to_string).collect()
}

/// `?limit=&offset=&orderBy=a,b DESC&include=x,y&where={json}`; any other key that names a
/// column is an equality filter.
fn list_options(schema: &SchemaDefinition, params: HashMap<String, String>) -> Result<ListOptions, AppError> {
    let mut options = ListOptions::new();
    for (k, v) in params {
        match k.as_str() {
            "limit" => {
                options.limit = Some(v.parse().map_err(|_| AppError::BadRequest("invalid limit".into()))?);
            }
            "offset" => {
                options.offset = Some(v.parse().map_err(|_| AppError::BadRequest("invalid offset".into()))?);
            }
            "orderBy" => options.order_by = comma_list(&v),
            "include" => options.include = comma_list(&v),
            "where" => {
                let parsed: Value =
                    serde_json::from_str(&v).map_err(|e| AppError::BadRequest(format!("invalid where: {}", e)))?;
                options.filter.extend(body_to_map(parsed)?);
            }
            _ if schema.has_column(&k) => {
                let val = query_value_for_column(schema, &k, &v);
                options.filter.insert(k, val);
            }
            _ => {}
        }
    }
    Ok(options)
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let collection = state.collection(&path_segment).await?;
    require(&collection, CrudOperation::List)?;
    let options = list_options(collection.schema(), params)?;
    let rows = collection.list(&options).await?;
    let total = if options.limit.is_some() || options.offset.is_some() {
        Some(collection.count(&options).await?)
    } else {
        None
    };
    Ok(success_many(rows, total))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let collection = state.collection(&path_segment).await?;
    require(&collection, CrudOperation::Create)?;
    let row = collection.create(body_to_map(body)?).await?;
    Ok(success_one(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let collection = state.collection(&path_segment).await?;
    require(&collection, CrudOperation::Get)?;
    let mut row = collection
        .get(id.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(id.clone()))?;
    for name in params.get("include").map(|s| comma_list(s)).unwrap_or_default() {
        collection.load_related(&mut row, &name).await?;
    }
    Ok(success_one_ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let collection = state.collection(&path_segment).await?;
    require(&collection, CrudOperation::Update)?;
    let row = collection
        .update(&id, body_to_map(body)?)
        .await?
        .ok_or_else(|| AppError::NotFound(id.clone()))?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let collection = state.collection(&path_segment).await?;
    require(&collection, CrudOperation::Delete)?;
    collection
        .delete(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(id.clone()))?;
    Ok(StatusCode::NO_CONTENT)
}
