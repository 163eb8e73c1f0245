use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all statelog endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/create", post(handler::create_handler))
        .route("/edit/:id", put(handler::edit_handler))
        .route("/history/:id", get(handler::history_handler))
        .route("/objects/:id", get(handler::object_handler))
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
