//! End-to-end tests over a real TCP listener.
//!
//! The server runs with the mock provider, so no Gemini credential or
//! network access is needed.

mod common;

use chat_relay_service::services::data_stream::DATA_STREAM_HEADER;
use chat_relay_service::services::providers::mock::MockTextProvider;
use chat_relay_service::Application;
use common::mock_state;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;

/// Spawn the application on a random port and return the port number.
async fn spawn_app(provider: MockTextProvider) -> u16 {
    let app = Application::build_with_state(mock_state(provider, false))
        .await
        .expect("Failed to build application");

    let port = app.port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    port
}

#[tokio::test]
async fn health_check_returns_ok() {
    let port = spawn_app(MockTextProvider::new(["unused"])).await;
    let client = Client::new();

    let response = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "chat-relay-service");
}

#[tokio::test]
async fn ip_endpoint_reports_peer_address() {
    let port = spawn_app(MockTextProvider::new(["unused"])).await;

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/ip", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body, serde_json::json!({ "ip": "127.0.0.1" }));
}

#[tokio::test]
async fn chat_reply_arrives_in_pieces() {
    let provider =
        MockTextProvider::new(["Streaming ", "over ", "TCP"]).with_delay(Duration::from_millis(50));
    let port = spawn_app(provider).await;

    let response = Client::new()
        .post(format!("http://127.0.0.1:{}/api/chat", port))
        .json(&serde_json::json!({
            "messages": [{"role": "user", "content": "Say something."}]
        }))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert_eq!(response.headers().get(DATA_STREAM_HEADER).unwrap(), "v1");

    let mut chunks = 0;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        chunks += 1;
        body.extend_from_slice(&chunk.expect("body chunk"));
    }

    assert!(chunks >= 2, "reply arrived in a single read");
    let body = String::from_utf8(body).unwrap();
    assert_eq!(common::reconstruct_text(&body), "Streaming over TCP");
}
