use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe. The service holds no connections worth checking.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "chat-relay-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
