//! Request and response models for the chat relay service.

pub mod chat;
pub mod client_ip;

pub use chat::{ChatRequest, Message};
pub use client_ip::ClientIpResponse;
