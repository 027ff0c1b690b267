//! Shared application state for all routes. The registry is read-only after warm-up.

use crate::error::AppError;
use crate::registry::MetadataRegistry;
use crate::schema::TableInitializer;
use crate::service::{Collection, SqlExecutor};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MetadataRegistry>,
    pub executor: Arc<dyn SqlExecutor>,
    /// Tables are created once per process, on first touch.
    pub tables: Arc<TableInitializer>,
}

impl AppState {
    pub fn new(registry: MetadataRegistry, executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            registry: Arc::new(registry),
            executor,
            tables: Arc::new(TableInitializer::new()),
        }
    }

    /// Collection for a URL path segment, with its table ensured.
    pub async fn collection(&self, path_segment: &str) -> Result<Collection, AppError> {
        let collection = Collection::for_table(self.registry.clone(), self.executor.clone(), path_segment)?;
        self.tables
            .ensure_table(self.executor.as_ref(), collection.schema())
            .await?;
        Ok(collection)
    }
}
