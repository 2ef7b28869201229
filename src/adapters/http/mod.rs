pub mod error;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/config", get(routes::get_config))
        .route("/api/tumors", get(routes::list_tumors))
        .route("/api/health", get(routes::health))
        .route("/api/detect", post(routes::detect))
        .route("/api/annotate", post(routes::annotate))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
