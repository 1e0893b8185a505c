//! Shared helpers for chat-relay-service integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use chat_relay_service::config::{
    ChatRelayConfig, DiagnosticsConfig, GoogleConfig, DEFAULT_GEMINI_API_BASE,
};
use chat_relay_service::services::providers::mock::MockTextProvider;
use chat_relay_service::AppState;
use http_body_util::BodyExt;
use secrecy::Secret;
use service_core::config::Config;
use std::sync::Arc;

pub const TEST_API_KEY: &str = "test-api-key";

/// Config bound to a random port, pointing at `api_base_url`.
pub fn test_config(api_base_url: &str, api_key: &str, ip_dev_fallback: bool) -> ChatRelayConfig {
    ChatRelayConfig {
        common: Config {
            port: 0,
            log_level: "error".to_string(),
            otlp_endpoint: None,
        },
        google: GoogleConfig {
            api_key: Secret::new(api_key.to_string()),
            api_base_url: api_base_url.to_string(),
        },
        diagnostics: DiagnosticsConfig { ip_dev_fallback },
    }
}

pub fn mock_state(provider: MockTextProvider, ip_dev_fallback: bool) -> AppState {
    AppState::new(
        test_config(DEFAULT_GEMINI_API_BASE, TEST_API_KEY, ip_dev_fallback),
        Arc::new(provider),
    )
}

pub fn chat_request(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

/// Drain the body frame by frame, keeping frame boundaries.
pub async fn collect_frames(response: Response) -> Vec<String> {
    let mut body = response.into_body();
    let mut frames = Vec::new();
    while let Some(frame) = body.frame().await {
        if let Ok(data) = frame.expect("body frame").into_data() {
            frames.push(String::from_utf8(data.to_vec()).expect("utf-8 frame"));
        }
    }
    frames
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// Concatenate the text parts (`0:` lines) of a data stream.
pub fn reconstruct_text(stream: &str) -> String {
    stream
        .lines()
        .filter_map(|line| line.strip_prefix("0:"))
        .map(|payload| serde_json::from_str::<String>(payload).expect("text part is a JSON string"))
        .collect()
}

/// Part type codes (`f`, `0`, `e`, ...) in order of appearance.
pub fn part_codes(stream: &str) -> Vec<char> {
    stream
        .lines()
        .filter_map(|line| line.chars().next())
        .collect()
}
