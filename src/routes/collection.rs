//! Collection CRUD routes. The path segment is the table name; handlers resolve the class.

use crate::handlers::collection::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn collection_routes(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:id",
            get(read).patch(update).delete(delete_handler),
        )
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
