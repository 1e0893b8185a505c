//! HTTP handlers for the chat relay service.

pub mod chat;
pub mod client_ip;
pub mod health;
pub mod metrics;

pub use chat::chat_handler;
pub use client_ip::client_ip_handler;
pub use health::health_check;
pub use metrics::metrics_handler;
