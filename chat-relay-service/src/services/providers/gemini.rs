//! Gemini AI provider implementation.
//!
//! Streams chat completions from Google's Gemini API over server-sent events.

use super::{FinishReason, ProviderError, ProviderStream, StreamChunk, TextProvider};
use crate::config::DEFAULT_GEMINI_API_BASE;
use crate::models::chat::{Message, ROLE_ASSISTANT, ROLE_SYSTEM};
use crate::services::sse::SseDecoder;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const API_KEY_HEADER: &str = "x-goog-api-key";
const GEMINI_MODEL_ROLE: &str = "model";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub model: String,
    pub api_base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: Secret<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            api_base_url: DEFAULT_GEMINI_API_BASE.to_string(),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Build the API URL for the given model method.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn stream_chat(&self, messages: &[Message]) -> Result<ProviderStream, ProviderError> {
        let request = GenerateContentRequest::from_messages(messages);
        let url = self.api_url("streamGenerateContent");

        tracing::debug!(
            model = %self.config.model,
            message_count = messages.len(),
            has_system_instruction = request.system_instruction.is_some(),
            "Starting streaming request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse")])
            .header(API_KEY_HEADER, self.config.api_key.expose_secret().as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut progress = StreamProgress::default();

            while let Some(chunk_result) = body.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        for event in decoder.push(&chunk) {
                            if !progress.forward(&event, &tx).await {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::NetworkError(
                                e.without_url().to_string(),
                            )))
                            .await;
                        return;
                    }
                }
            }

            if let Some(event) = decoder.finish() {
                if !progress.forward(&event, &tx).await {
                    return;
                }
            }

            let _ = tx.send(Ok(progress.completion())).await;
        });

        Ok(Box::pin(ReceiverStream::new(rx)) as ProviderStream)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

type ChunkSender = mpsc::Sender<Result<StreamChunk, ProviderError>>;

/// Usage and finish state accumulated over one streamed response.
#[derive(Debug)]
struct StreamProgress {
    input_tokens: i32,
    output_tokens: i32,
    finish_reason: FinishReason,
}

impl Default for StreamProgress {
    fn default() -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Complete,
        }
    }
}

impl StreamProgress {
    /// Handle one SSE payload. Returns `false` when the stream must stop,
    /// either because the receiver is gone or the API reported an error.
    async fn forward(&mut self, data: &str, tx: &ChunkSender) -> bool {
        let response = match serde_json::from_str::<GenerateContentResponse>(data) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable Gemini stream event");
                return true;
            }
        };

        if let Some(error) = response.error {
            let _ = tx
                .send(Err(ProviderError::ApiError(format!(
                    "Gemini API error {}: {}",
                    error.code.unwrap_or_default(),
                    error.message.unwrap_or_default()
                ))))
                .await;
            return false;
        }

        if let Some(usage) = &response.usage_metadata {
            self.input_tokens = usage.prompt_token_count.unwrap_or(self.input_tokens);
            self.output_tokens = usage.candidates_token_count.unwrap_or(self.output_tokens);
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            return true;
        };

        if let Some(reason) = &candidate.finish_reason {
            self.finish_reason = FinishReason::from_gemini(reason);
        }

        let text = candidate.text();
        if text.is_empty() {
            return true;
        }

        // Send fails only once the caller has gone away.
        tx.send(Ok(StreamChunk::Text(text))).await.is_ok()
    }

    fn completion(&self) -> StreamChunk {
        StreamChunk::Complete {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            finish_reason: self.finish_reason,
        }
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

impl GenerateContentRequest {
    /// System turns become the system instruction; assistant turns are sent
    /// with Gemini's `model` role.
    fn from_messages(messages: &[Message]) -> Self {
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ROLE_SYSTEM)
            .map(|m| m.content.as_str())
            .collect();

        let system_instruction = if system_text.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part::text(system_text.join("\n\n"))],
            })
        };

        let contents = messages
            .iter()
            .filter(|m| m.role != ROLE_SYSTEM)
            .map(|m| Content {
                role: Some(if m.role == ROLE_ASSISTANT {
                    GEMINI_MODEL_ROLE.to_string()
                } else {
                    m.role.clone()
                }),
                parts: vec![Part::text(m.content.clone())],
            })
            .collect();

        Self {
            contents,
            system_instruction,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Part {
    fn text(text: String) -> Self {
        Self { text: Some(text) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_roles_and_lifts_system_messages() {
        let request = GenerateContentRequest::from_messages(&[
            Message::system("Be terse."),
            Message::user("Hi"),
            Message::assistant("Hello."),
            Message::system("Answer in French."),
            Message::user("Weather?"),
        ]);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"text": "Hello."}]},
                    {"role": "user", "parts": [{"text": "Weather?"}]}
                ],
                "systemInstruction": {
                    "parts": [{"text": "Be terse.\n\nAnswer in French."}]
                }
            })
        );
    }

    #[test]
    fn omits_system_instruction_when_absent() {
        let request = GenerateContentRequest::from_messages(&[Message::user("Hi")]);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn candidate_text_joins_all_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hel"}, {"text": "lo"}]}
            }]
        }))
        .unwrap();

        assert_eq!(response.candidates[0].text(), "Hello");
    }

    #[tokio::test]
    async fn progress_tracks_usage_and_finish_reason() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut progress = StreamProgress::default();

        let event = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Done."}]},
                "finishReason": "MAX_TOKENS"
            }],
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 3}
        })
        .to_string();

        assert!(progress.forward(&event, &tx).await);
        assert_eq!(
            rx.recv().await.unwrap().unwrap(),
            StreamChunk::Text("Done.".to_string())
        );
        assert_eq!(
            progress.completion(),
            StreamChunk::Complete {
                input_tokens: 7,
                output_tokens: 3,
                finish_reason: FinishReason::Length,
            }
        );
    }

    #[tokio::test]
    async fn progress_stops_on_error_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut progress = StreamProgress::default();

        let event = json!({"error": {"code": 500, "message": "internal"}}).to_string();

        assert!(!progress.forward(&event, &tx).await);
        assert!(matches!(
            rx.recv().await.unwrap(),
            Err(ProviderError::ApiError(msg)) if msg.contains("internal")
        ));
    }

    #[tokio::test]
    async fn progress_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut progress = StreamProgress::default();

        let event = json!({
            "candidates": [{"content": {"parts": [{"text": "orphan"}]}}]
        })
        .to_string();

        assert!(!progress.forward(&event, &tx).await);
    }
}
