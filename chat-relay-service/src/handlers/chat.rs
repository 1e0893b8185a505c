use crate::models::ChatRequest;
use crate::services::data_stream::{self, CONTENT_TYPE, DATA_STREAM_HEADER, DATA_STREAM_VERSION};
use crate::startup::AppState;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use metrics::counter;
use service_core::error::AppError;

/// `POST /api/chat`: relay the conversation upstream and stream the reply.
///
/// The body is parsed as JSON whatever its `content-type`. Malformed bodies
/// are rejected with 400 before anything is sent upstream. Upstream failures before the first token
/// become an error response; later failures end the stream with an error part.
pub async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed chat request");
        AppError::BadRequest(anyhow::Error::new(e))
    })?;

    let provider = &state.text_provider;

    tracing::info!(
        model = provider.model(),
        message_count = request.messages.len(),
        "Relaying conversation"
    );

    let upstream = provider
        .stream_chat(&request.messages)
        .await
        .map_err(|e| {
            tracing::error!(model = provider.model(), error = %e, "Upstream chat request failed");
            counter!("chat_relay_upstream_requests_total", "outcome" => "error").increment(1);
            AppError::from(e)
        })?;

    counter!("chat_relay_upstream_requests_total", "outcome" => "streaming").increment(1);

    let body = Body::from_stream(data_stream::encode(upstream));

    Ok((
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (HeaderName::from_static(DATA_STREAM_HEADER), DATA_STREAM_VERSION),
            (HeaderName::from_static("x-accel-buffering"), "no"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
