use axum::response::Json;
use serde_json::{Value, json};

/// Liveness probe; does not touch the upstream.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
