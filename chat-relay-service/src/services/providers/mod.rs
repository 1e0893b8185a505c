//! Upstream text-generation providers.
//!
//! The chat handler only sees the [`TextProvider`] trait, so the Gemini
//! backend can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use crate::models::Message;
use async_trait::async_trait;
use service_core::error::AppError;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Client-facing message for upstream failures. The provider's own error text
/// is only logged.
pub const UPSTREAM_ERROR_MESSAGE: &str = "Upstream model request failed";

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited => AppError::TooManyRequests(
                "Upstream model is rate limiting requests".to_string(),
                None,
            ),
            ProviderError::NotConfigured(msg) => {
                AppError::InternalError(anyhow::anyhow!("Provider not configured: {}", msg))
            }
            ProviderError::ApiError(_) | ProviderError::NetworkError(_) => {
                AppError::BadGateway(UPSTREAM_ERROR_MESSAGE.to_string())
            }
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Error,
    Other,
}

impl FinishReason {
    /// Map a Gemini `finishReason` value.
    pub fn from_gemini(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Complete,
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
                FinishReason::ContentFilter
            }
            "MALFORMED_FUNCTION_CALL" => FinishReason::Error,
            _ => FinishReason::Other,
        }
    }
}

/// Stream chunk for streaming responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Text chunk.
    Text(String),

    /// Final completion with usage stats.
    Complete {
        input_tokens: i32,
        output_tokens: i32,
        finish_reason: FinishReason,
    },
}

/// Type alias for provider streams.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProviderError>> + Send>>;

/// A chat-capable text generation backend.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Start generating a reply to `messages`.
    ///
    /// Errors returned here mean nothing was generated. Once the stream is
    /// handed back, failures arrive as stream items.
    async fn stream_chat(&self, messages: &[Message]) -> Result<ProviderStream, ProviderError>;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;
}
