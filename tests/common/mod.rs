//! Shared fixtures and a recording SQL executor for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use object_sdk::definition::{
    FieldDefinition, FieldType, MethodDefinition, ObjectDefinition, ParameterDefinition, RelationDefinition,
};
use object_sdk::service::Row;
use object_sdk::{AppError, MetadataRegistry, SqlExecutor};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One statement seen by the mock.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Call {
    pub fn is_write(&self) -> bool {
        let head = self.sql.trim_start().to_ascii_uppercase();
        head.starts_with("INSERT") || head.starts_with("UPDATE") || head.starts_with("DELETE")
    }
}

pub type Responder = Box<dyn Fn(&str, &[Value]) -> Vec<Row> + Send + Sync>;

/// Records every statement and answers queries from a scripted responder.
pub struct MockExecutor {
    calls: Mutex<Vec<Call>>,
    responder: RwLock<Responder>,
    failing_executes: AtomicUsize,
    execute_delay: Option<Duration>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: RwLock::new(Box::new(|_, _| Vec::new())),
            failing_executes: AtomicUsize::new(0),
            execute_delay: None,
        }
    }

    /// Every `execute` sleeps first, so concurrent callers overlap.
    pub fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = Some(delay);
        self
    }

    pub fn respond<F>(&self, f: F)
    where
        F: Fn(&str, &[Value]) -> Vec<Row> + Send + Sync + 'static,
    {
        *self.responder.write() = Box::new(f);
    }

    /// The next `n` calls to `execute` fail.
    pub fn fail_next_executes(&self, n: usize) {
        self.failing_executes.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.calls.lock().push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

#[async_trait]
impl SqlExecutor for MockExecutor {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError> {
        self.record(sql, params);
        let responder = self.responder.read();
        Ok((*responder)(sql, params))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, AppError> {
        self.record(sql, params);
        if let Some(delay) = self.execute_delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failing_executes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::Db(sqlx::Error::Protocol("scripted failure".into())));
        }
        Ok(0)
    }
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(m) => m,
        other => panic!("row fixture must be an object, got {}", other),
    }
}

pub fn map(value: Value) -> Map<String, Value> {
    row(value)
}

/// Category 1:n Product n:1 Category, Product n:m Tag.
pub fn shop_definitions() -> Vec<ObjectDefinition> {
    let category = ObjectDefinition::new("Category")
        .with_field(FieldDefinition::text("name").required().unique())
        .with_relation("products", RelationDefinition::one_to_many("Product", "category_id"));
    let product = ObjectDefinition::new("Product")
        .with_field(FieldDefinition::text("title").required())
        .with_field(FieldDefinition::text("sku").unique())
        .with_field(FieldDefinition::new("price", FieldType::Decimal))
        .with_field(FieldDefinition::new("stock", FieldType::Integer).with_default(json!(0)))
        .with_field(FieldDefinition::new("active", FieldType::Boolean))
        .with_field(FieldDefinition::new("attributes", FieldType::Json))
        .with_field(FieldDefinition::foreign_key("category_id", "categories.id"))
        .with_relation("tags", RelationDefinition::many_to_many("Tag", "product_tags"))
        .with_method(
            MethodDefinition::new("applyDiscount")
                .asynchronous()
                .with_description("Reduce the price by a percentage")
                .with_parameter(ParameterDefinition::new("percent", "number"))
                .with_parameter(ParameterDefinition::new("reason", "'sale' | 'clearance'").optional()),
        );
    let tag = ObjectDefinition::new("Tag").with_field(FieldDefinition::text("label").required());
    vec![category, product, tag]
}

pub fn shop_registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    for def in shop_definitions() {
        registry.register(def);
    }
    registry
}

pub fn mock() -> Arc<MockExecutor> {
    Arc::new(MockExecutor::new())
}
