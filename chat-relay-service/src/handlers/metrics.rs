use axum::{http::StatusCode, response::IntoResponse};
use service_core::observability::render_metrics;

pub async fn metrics_handler() -> impl IntoResponse {
    match render_metrics() {
        Some(body) => (StatusCode::OK, body),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}
