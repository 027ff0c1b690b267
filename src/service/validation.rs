//! Request validation from field definitions.

use crate::definition::{FieldDefinition, FieldType, OrderedMap};
use crate::error::AppError;
use crate::schema::SYSTEM_COLUMNS;
use crate::service::instance::normalize_datetime;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full body (create). Required fields without a default must be present and non-null.
    /// Redeclared system columns are never required; storage fills them.
    pub fn validate(body: &Map<String, Value>, fields: &OrderedMap<FieldDefinition>) -> Result<(), AppError> {
        for (name, field) in fields {
            if SYSTEM_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            let val = body.get(name);
            if field.required && field.default.is_none() && val.map(Value::is_null).unwrap_or(true) {
                return Err(AppError::Validation(format!("{} is required", name)));
            }
        }
        Self::validate_partial(body, fields)
    }

    /// Validate only the fields present in body (update). Unknown fields are rejected.
    pub fn validate_partial(body: &Map<String, Value>, fields: &OrderedMap<FieldDefinition>) -> Result<(), AppError> {
        for (name, v) in body {
            if SYSTEM_COLUMNS.contains(&name.as_str()) {
                if name == "id" && !(v.is_string() || v.is_null()) {
                    return Err(AppError::Validation("id must be a string".into()));
                }
                continue;
            }
            match fields.get(name) {
                Some(field) => validate_field(name, v, field)?,
                None => return Err(AppError::Validation(format!("unknown field {}", name))),
            }
        }
        Ok(())
    }
}

fn validate_field(name: &str, v: &Value, field: &FieldDefinition) -> Result<(), AppError> {
    if v.is_null() {
        if field.required {
            return Err(AppError::Validation(format!("{} cannot be null", name)));
        }
        return Ok(());
    }
    let type_ok = match &field.field_type {
        FieldType::Text => v.is_string(),
        FieldType::Integer => v.is_i64() || v.is_u64(),
        FieldType::Decimal => v.is_number(),
        FieldType::Boolean => v.is_boolean(),
        FieldType::Datetime => v.as_str().map(|s| normalize_datetime(s).is_some()).unwrap_or(false),
        FieldType::ForeignKey => v.is_string() || v.is_i64(),
        FieldType::Json | FieldType::Other(_) => true,
    };
    if !type_ok {
        return Err(AppError::Validation(format!(
            "{} must be of type {}",
            name,
            field.field_type.as_str()
        )));
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = field.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!("{} must be at most {} characters", name, max)));
            }
        }
        if let Some(min) = field.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!("{} must be at least {} characters", name, min)));
            }
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = field.min {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", name, min)));
            }
        }
        if let Some(max) = field.max {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", name, max)));
            }
        }
    }
    Ok(())
}
