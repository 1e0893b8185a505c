//! Router-level tests for `GET /api/ip`.

mod common;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use chat_relay_service::build_router;
use chat_relay_service::services::providers::mock::MockTextProvider;
use common::{body_json, mock_state};
use serde_json::json;
use std::net::SocketAddr;
use tower::util::ServiceExt;

fn ip_request() -> Request<Body> {
    Request::builder().uri("/api/ip").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn reports_first_forwarded_address() {
    let app = build_router(mock_state(MockTextProvider::new(["unused"]), false));

    let mut request = ip_request();
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 443))));

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ip": "203.0.113.7" }));
}

#[tokio::test]
async fn reports_transport_address_without_forwarded_header() {
    let app = build_router(mock_state(MockTextProvider::new(["unused"]), false));

    let mut request = ip_request();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 23], 50123))));

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ip": "198.51.100.23" }));
}

#[tokio::test]
async fn unresolvable_address_fails_by_default() {
    let app = build_router(mock_state(MockTextProvider::new(["unused"]), false));

    let response = app.oneshot(ip_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unresolvable_address_uses_placeholder_when_fallback_enabled() {
    let app = build_router(mock_state(MockTextProvider::new(["unused"]), true));

    let response = app.oneshot(ip_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "ip": "127.0.0.1",
            "note": "Running in development mode - actual IP not available"
        })
    );
}

#[tokio::test]
async fn forwarded_header_wins_even_with_fallback_enabled() {
    let app = build_router(mock_state(MockTextProvider::new(["unused"]), true));

    let mut request = ip_request();
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(body_json(response).await, json!({ "ip": "203.0.113.7" }));
}
