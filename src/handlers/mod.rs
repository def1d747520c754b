use axum::Json;
use serde_json::{Value, json};

pub mod analytics;
pub mod google_oauth;

/// GET / -> liveness message.
pub async fn service_status() -> Json<Value> {
    Json(json!({ "message": "GSC Analytics API is running" }))
}
