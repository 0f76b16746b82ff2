use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, synthesis};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// The `/api/...` paths are kept for clients of the earlier relay and map to
/// the same handlers.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/synthesis/stream", post(synthesis::stream_handler))
        .route("/synthesis/interrupt", post(synthesis::interrupt_handler))
        // Compatibility paths
        .route("/api/healthz", get(api::health_check))
        .route("/api/tts/stream", post(synthesis::stream_handler))
        .route("/api/tts/interrupt", post(synthesis::interrupt_handler))
        .layer(TraceLayer::new_for_http())
}
