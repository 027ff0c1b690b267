//! SQL execution collaborator: the only place statements reach a database.

use crate::error::AppError;
use crate::schema::{render_statements, SchemaDefinition};
use crate::sql::BindValue;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;

/// One result row, column name -> raw stored value.
pub type Row = Map<String, Value>;

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a statement that yields rows (SELECT, or a write with RETURNING).
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError>;

    /// Run a statement for its effect; returns rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, AppError>;

    /// Idempotently apply a schema (every rendered statement is `IF NOT EXISTS`).
    async fn sync_schema(&self, schema: &SchemaDefinition) -> Result<(), AppError> {
        for stmt in render_statements(schema) {
            self.execute(&stmt, &[]).await?;
        }
        Ok(())
    }
}

/// `SqlExecutor` over an sqlx SQLite pool.
#[derive(Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect from a URL such as `sqlite://objects.db?mode=rwc`. Foreign keys are enforced.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        tracing::info!(url = %url, "connected to sqlite");
        Ok(Self { pool })
    }

    /// Private in-memory database on a single long-lived connection.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Value],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for p in params {
        query = match BindValue::from_json(p) {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(b),
            BindValue::I64(n) => query.bind(n),
            BindValue::F64(n) => query.bind(n),
            BindValue::Text(s) => query.bind(s),
        };
    }
    query
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        let rows = bind_all(sqlx::query(sql), params).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_map).collect::<Result<_, _>>().map_err(AppError::from)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "execute");
        let done = bind_all(sqlx::query(sql), params).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

/// Decode by SQLite storage class; typing beyond that happens at hydration.
fn row_to_map(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut map = Map::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => serde_json::Number::from_f64(row.try_get_unchecked::<f64, _>(idx)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::String(String::from_utf8_lossy(&row.try_get_unchecked::<Vec<u8>, _>(idx)?).into_owned()),
                _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        map.insert(col.name().to_string(), value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_storage_classes() {
        let exec = SqliteExecutor::in_memory().await.unwrap();
        exec.execute("CREATE TABLE t (a TEXT, b INTEGER, c REAL, d BOOLEAN, e TEXT)", &[])
            .await
            .unwrap();
        let n = exec
            .execute(
                "INSERT INTO t (a, b, c, d, e) VALUES (?, ?, ?, ?, ?)",
                &[json!("x"), json!(7), json!(1.5), json!(true), Value::Null],
            )
            .await
            .unwrap();
        assert_eq!(n, 1);

        let rows = exec.query("SELECT a, b, c, d, e FROM t WHERE b > ?", &[json!(1)]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({"a": "x", "b": 7, "c": 1.5, "d": 1, "e": null})
        );
    }

    #[tokio::test]
    async fn test_errors_surface_as_db_errors() {
        let exec = SqliteExecutor::in_memory().await.unwrap();
        let err = exec.query("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Db(_)));
    }
}
