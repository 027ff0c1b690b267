//! Per-table single-flight initialisation.
//!
//! Concurrent `ensure_table` calls for the same table share one in-flight creation. A failed
//! creation removes its cell, so the next caller retries instead of seeing a cached failure.

use crate::error::AppError;
use crate::schema::SchemaDefinition;
use crate::service::SqlExecutor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Default)]
pub struct TableInitializer {
    cells: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl TableInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, table: &str) -> Arc<OnceCell<()>> {
        self.cells
            .lock()
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Create the table (and its indexes and trigger) once per process.
    pub async fn ensure_table(&self, executor: &dyn SqlExecutor, schema: &SchemaDefinition) -> Result<(), AppError> {
        let cell = self.cell(&schema.table_name);
        let result = cell
            .get_or_try_init(|| async {
                executor.sync_schema(schema).await?;
                tracing::info!(table = %schema.table_name, version = %schema.version, "table ready");
                Ok::<(), AppError>(())
            })
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(table = %schema.table_name, error = %e, "table init failed; clearing handle");
                let mut cells = self.cells.lock();
                if cells.get(&schema.table_name).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                    cells.remove(&schema.table_name);
                }
                Err(e)
            }
        }
    }

    /// Ensure several tables, one after another, in the given order.
    pub async fn ensure_all<'a, I>(&self, executor: &dyn SqlExecutor, schemas: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = &'a SchemaDefinition>,
    {
        for schema in schemas {
            self.ensure_table(executor, schema).await?;
        }
        Ok(())
    }

    pub fn is_ready(&self, table: &str) -> bool {
        self.cells
            .lock()
            .get(table)
            .map(|c| c.initialized())
            .unwrap_or(false)
    }
}
