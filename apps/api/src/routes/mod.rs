pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::iris::handlers;
use crate::state::AppState;

/// Room for the non-file form fields and multipart boundaries.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/iris/render",
            post(handlers::handle_render_iris).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
