use crate::models::ClientIpResponse;
use crate::startup::AppState;
use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use service_core::error::AppError;
use std::net::SocketAddr;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

pub const DEV_FALLBACK_IP: &str = "127.0.0.1";
pub const DEV_FALLBACK_NOTE: &str = "Running in development mode - actual IP not available";

/// Pick the caller's address: first `x-forwarded-for` entry, else the peer
/// socket address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    // Opaque bytes elsewhere in the header must not hide the first entry.
    let forwarded = headers.get(FORWARDED_FOR_HEADER).and_then(|v| {
        String::from_utf8_lossy(v.as_bytes())
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    });

    forwarded.or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// `GET /api/ip`: echo the caller's address.
pub async fn client_ip_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<ClientIpResponse>, AppError> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);

    match resolve_client_ip(&headers, peer) {
        Some(ip) => Ok(Json(ClientIpResponse::new(ip))),
        None if state.config.diagnostics.ip_dev_fallback => {
            tracing::warn!("Client address unavailable, answering with development placeholder");
            Ok(Json(ClientIpResponse {
                ip: DEV_FALLBACK_IP.to_string(),
                note: Some(DEV_FALLBACK_NOTE.to_string()),
            }))
        }
        None => Err(AppError::InternalError(anyhow::anyhow!(
            "client address not available"
        ))),
    }
}
