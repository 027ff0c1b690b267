pub mod collection;
pub mod common;
pub mod manifest;

pub use collection::collection_routes;
pub use common::common_routes;
pub use manifest::manifest_routes;

use crate::state::AppState;
use axum::Router;

/// All routes. Static paths are matched before the `/:path_segment` collection routes.
pub fn app_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(manifest_routes(state.clone()))
        .merge(collection_routes(state, max_body_bytes))
}
