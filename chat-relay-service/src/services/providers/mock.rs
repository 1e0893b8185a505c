//! Mock provider implementation for testing.

use super::{FinishReason, ProviderError, ProviderStream, StreamChunk, TextProvider};
use crate::models::Message;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behavior {
    Stream,
    RejectUpfront(String),
    FailAfter(usize, String),
}

/// Mock text provider for testing.
///
/// Replays a fixed list of text chunks and records every conversation it is
/// asked to continue.
#[derive(Clone)]
pub struct MockTextProvider {
    chunks: Vec<String>,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockTextProvider {
    pub const MODEL: &'static str = "mock-model";

    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            behavior: Behavior::Stream,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail before producing any output, like a rejected credential.
    pub fn rejecting(message: impl Into<String>) -> Self {
        let mut provider = Self::new(Vec::<String>::new());
        provider.behavior = Behavior::RejectUpfront(message.into());
        provider
    }

    /// Emit the first `after` chunks, then a stream error.
    pub fn failing_after(mut self, after: usize, message: impl Into<String>) -> Self {
        self.behavior = Behavior::FailAfter(after, message.into());
        self
    }

    /// Pause before each chunk.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Conversations received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn stream_chat(&self, messages: &[Message]) -> Result<ProviderStream, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let mut items: Vec<Result<StreamChunk, ProviderError>> = match &self.behavior {
            Behavior::RejectUpfront(message) => {
                return Err(ProviderError::ApiError(message.clone()));
            }
            Behavior::Stream => self
                .chunks
                .iter()
                .cloned()
                .map(|text| Ok(StreamChunk::Text(text)))
                .collect(),
            Behavior::FailAfter(after, message) => self
                .chunks
                .iter()
                .take(*after)
                .cloned()
                .map(|text| Ok(StreamChunk::Text(text)))
                .chain(std::iter::once(Err(ProviderError::NetworkError(
                    message.clone(),
                ))))
                .collect(),
        };

        if matches!(self.behavior, Behavior::Stream) {
            let input_tokens: usize = messages.iter().map(|m| m.content.len() / 4).sum();
            items.push(Ok(StreamChunk::Complete {
                input_tokens: input_tokens as i32,
                output_tokens: self.chunks.len() as i32,
                finish_reason: FinishReason::Complete,
            }));
        }

        let stream = tokio_stream::iter(items);
        match self.delay {
            Some(delay) => Ok(Box::pin(tokio_stream::StreamExt::throttle(stream, delay))),
            None => Ok(Box::pin(stream)),
        }
    }

    fn model(&self) -> &str {
        Self::MODEL
    }
}
