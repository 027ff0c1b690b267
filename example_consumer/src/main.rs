//! Example consumer: serves the objects in a manifest over REST, backed by SQLite.
//!
//! Run from repo root: `OBJECT_MANIFEST=example_consumer/objects.json cargo run -p example-consumer`

use object_sdk::{
    app_router, load_manifest, order_by_dependencies, AppState, MetadataRegistry, SchemaGenerator, Settings,
    SqliteExecutor,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("object_sdk=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let manifest = load_manifest(&settings.manifest_path).await?;
    let registry = MetadataRegistry::from_manifest(manifest);
    let executor = Arc::new(SqliteExecutor::connect(&settings.database_url).await?);

    let schemas = SchemaGenerator::new(&registry).generate_all()?;
    let state = AppState::new(registry, executor);
    state
        .tables
        .ensure_all(state.executor.as_ref(), order_by_dependencies(&schemas))
        .await?;

    let app = app_router(state, settings.max_body_bytes);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
