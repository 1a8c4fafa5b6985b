// SPDX-License-Identifier: MIT OR Apache-2.0
//! OpenAI Chat Completions wire types.
//!
//! Request types decode leniently: the upstream schema is loosely typed, so
//! wrong-typed optional fields fall back to defaults. Only a missing, empty
//! or non-list `messages` field is rejected (see [`ChatRequest::from_json`]).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An inbound chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Requested model name; resolved through the alias table.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub model: String,
    /// Conversation turns in order.
    pub messages: Vec<ChatMessage>,
    /// Whether to stream the response. Only a literal `true` enables it.
    #[serde(default, deserialize_with = "true_only")]
    pub stream: bool,
    /// Opaque caller token, forwarded as the CLI session id.
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub user: Option<String>,
}

/// Why an inbound body was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestRejection {
    /// `messages` is missing, empty, not a list, or holds non-objects.
    InvalidMessages,
}

impl RequestRejection {
    /// Message returned to the client.
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidMessages => "messages is required and must be a non-empty array",
        }
    }

    /// OpenAI error `code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMessages => "invalid_messages",
        }
    }
}

impl ChatRequest {
    /// Validate and decode a raw JSON body.
    pub fn from_json(body: Value) -> Result<Self, RequestRejection> {
        let valid = body
            .get("messages")
            .and_then(Value::as_array)
            .is_some_and(|m| !m.is_empty());
        if !valid {
            return Err(RequestRejection::InvalidMessages);
        }
        serde_json::from_value(body).map_err(|_| RequestRejection::InvalidMessages)
    }
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions.
    System,
    /// End-user input.
    User,
    /// A previous assistant reply.
    Assistant,
    /// Any other role (`tool`, `developer`, ...). Ignored when prompting.
    #[default]
    #[serde(other)]
    Other,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it.
    #[serde(default)]
    pub role: Role,
    /// What they wrote.
    #[serde(default)]
    pub content: MessageContent,
}

impl ChatMessage {
    /// A plain-text turn.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }
}

/// Message content: a string, an ordered list of parts, or anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain string content.
    Text(String),
    /// Multi-part content (`[{type:"text", text:"..."}, ...]`).
    Parts(Vec<ContentPart>),
    /// Null or an unexpected shape.
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Other(Value::Null)
    }
}

/// One element of multi-part content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Part type; only `"text"` contributes to the prompt.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Text of a `text` part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn string_or_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn true_only<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(d)?, Value::Bool(true)))
}

// ---------------------------------------------------------------------------
// Non-streaming response
// ---------------------------------------------------------------------------

/// A complete `chat.completion` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// `chatcmpl-<request id>`.
    pub id: String,
    /// Always `"chat.completion"`.
    pub object: String,
    /// Unix seconds.
    pub created: u64,
    /// Normalized model family name.
    pub model: String,
    /// Exactly one choice.
    pub choices: Vec<Choice>,
    /// Token accounting.
    pub usage: Usage,
}

/// A choice in a non-streaming response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Zero-based index.
    pub index: u32,
    /// The assistant reply.
    pub message: ResponseMessage,
    /// Always `"stop"`.
    pub finish_reason: Option<String>,
}

/// The assistant reply inside a [`Choice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Always `"assistant"`.
    pub role: String,
    /// Reply text.
    pub content: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u64,
    /// Tokens generated in the completion.
    pub completion_tokens: u64,
    /// `prompt_tokens + completion_tokens`.
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Streaming chunk
// ---------------------------------------------------------------------------

/// A single `chat.completion.chunk` SSE payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// `chatcmpl-<request id>`, shared by every chunk of a response.
    pub id: String,
    /// Always `"chat.completion.chunk"`.
    pub object: String,
    /// Unix seconds.
    pub created: u64,
    /// Model name.
    pub model: String,
    /// Exactly one choice.
    pub choices: Vec<ChunkChoice>,
}

/// A single choice inside a streaming chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Zero-based index of this choice.
    pub index: u32,
    /// The incremental delta for this choice.
    pub delta: ChunkDelta,
    /// `null` while streaming, `"stop"` on the terminal chunk.
    pub finish_reason: Option<String>,
}

/// The delta payload inside a streaming choice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role of the message (only in the first chunk).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Incremental text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors, models
// ---------------------------------------------------------------------------

/// `{ "error": { message, type, code } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error detail.
    pub error: ErrorDetail,
}

/// Body of an [`ErrorResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable description.
    pub message: String,
    /// `invalid_request_error` or `server_error`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Machine-readable code; serialized as `null` when absent.
    pub code: Option<String>,
}

impl ErrorResponse {
    /// A `server_error` with a null code.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                kind: "server_error".into(),
                code: None,
            },
        }
    }

    /// An `invalid_request_error` with the given code.
    pub fn invalid_request(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                kind: "invalid_request_error".into(),
                code: Some(code.into()),
            },
        }
    }
}

/// `GET /v1/models` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    /// Always `"list"`.
    pub object: String,
    /// Available models.
    pub data: Vec<ModelCard>,
}

/// One entry of [`ModelList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCard {
    /// Model identifier.
    pub id: String,
    /// Always `"model"`.
    pub object: String,
    /// Owning provider.
    pub owned_by: String,
    /// Unix seconds.
    pub created: u64,
}
