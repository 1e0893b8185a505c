//! Encoder for the line-oriented chat "data stream" protocol.
//!
//! Every part is one line, `<type>:<json>\n`:
//!
//! | type | payload                                              |
//! |------|------------------------------------------------------|
//! | `f`  | `{"messageId": ...}`, once at the start              |
//! | `0`  | text delta (JSON string)                             |
//! | `3`  | error message (JSON string), ends the stream         |
//! | `e`  | finish step: reason, usage, `isContinued`            |
//! | `d`  | finish message: reason, usage                        |

use crate::services::providers::{FinishReason, ProviderStream, StreamChunk};
use futures::{future, stream, Stream, StreamExt};
use serde_json::{json, Value};
use std::convert::Infallible;
use uuid::Uuid;

/// Response header announcing the protocol version.
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Message sent to the client when the upstream fails mid-stream. The cause
/// is logged server-side only.
pub const STREAM_ERROR_MESSAGE: &str = "An error occurred.";

#[derive(Debug, Clone, PartialEq)]
pub enum DataStreamPart {
    StartStep { message_id: String },
    Text(String),
    Error(String),
    FinishStep { reason: FinishReason, usage: Usage },
    FinishMessage { reason: FinishReason, usage: Usage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
}

impl Usage {
    fn to_json(self) -> Value {
        json!({
            "promptTokens": self.prompt_tokens,
            "completionTokens": self.completion_tokens,
        })
    }
}

fn finish_reason_code(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Complete => "stop",
        FinishReason::Length => "length",
        FinishReason::ContentFilter => "content-filter",
        FinishReason::Error => "error",
        FinishReason::Other => "other",
    }
}

impl DataStreamPart {
    pub fn encode(&self) -> String {
        let (code, payload) = match self {
            DataStreamPart::StartStep { message_id } => ('f', json!({ "messageId": message_id })),
            DataStreamPart::Text(text) => ('0', Value::String(text.clone())),
            DataStreamPart::Error(message) => ('3', Value::String(message.clone())),
            DataStreamPart::FinishStep { reason, usage } => (
                'e',
                json!({
                    "finishReason": finish_reason_code(*reason),
                    "usage": usage.to_json(),
                    "isContinued": false,
                }),
            ),
            DataStreamPart::FinishMessage { reason, usage } => (
                'd',
                json!({
                    "finishReason": finish_reason_code(*reason),
                    "usage": usage.to_json(),
                }),
            ),
        };
        format!("{}:{}\n", code, payload)
    }
}

/// Translate a provider stream into encoded protocol lines, one item per part.
///
/// Each upstream chunk is encoded as soon as it is polled; nothing is
/// buffered. After an upstream error the stream ends.
pub fn encode(upstream: ProviderStream) -> impl Stream<Item = Result<String, Infallible>> + Send {
    let message_id = format!("msg-{}", Uuid::new_v4().simple());
    let start = stream::once(future::ready(DataStreamPart::StartStep { message_id }));

    let body = upstream
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            let parts = match item {
                Ok(StreamChunk::Text(text)) if text.is_empty() => Vec::new(),
                Ok(StreamChunk::Text(text)) => vec![DataStreamPart::Text(text)],
                Ok(StreamChunk::Complete {
                    input_tokens,
                    output_tokens,
                    finish_reason,
                }) => {
                    let usage = Usage {
                        prompt_tokens: input_tokens,
                        completion_tokens: output_tokens,
                    };
                    tracing::info!(
                        input_tokens,
                        output_tokens,
                        finish_reason = finish_reason_code(finish_reason),
                        "Chat stream completed"
                    );
                    vec![
                        DataStreamPart::FinishStep {
                            reason: finish_reason,
                            usage,
                        },
                        DataStreamPart::FinishMessage {
                            reason: finish_reason,
                            usage,
                        },
                    ]
                }
                Err(e) => {
                    tracing::error!(error = %e, "Upstream stream failed mid-response");
                    *failed = true;
                    vec![DataStreamPart::Error(STREAM_ERROR_MESSAGE.to_string())]
                }
            };
            future::ready(Some(parts))
        })
        .flat_map(stream::iter);

    start
        .chain(body)
        .map(|part| Ok::<_, Infallible>(part.encode()))
}
