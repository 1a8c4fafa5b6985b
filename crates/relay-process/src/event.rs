// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed events emitted by a running CLI process.
//!
//! Field decoding is deliberately forgiving: the CLI's schema is loosely
//! typed, so missing or oddly-typed fields fall back to defaults instead of
//! rejecting the whole event.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// One event from the CLI, in the order the process produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// Incremental assistant text.
    ContentDelta {
        /// The text fragment (may be empty).
        text: String,
    },
    /// A complete assistant message; carries the concrete model name.
    Assistant(AssistantMessage),
    /// The terminal result of the run.
    Result(ResultMessage),
    /// The process reported an error.
    Error {
        /// Human-readable description.
        message: String,
    },
    /// The process exited. `None` means it was terminated by a signal.
    Close {
        /// Exit code, when the process exited normally.
        exit_code: Option<i32>,
    },
}

impl ProcessEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContentDelta { .. } => "content_delta",
            Self::Assistant(_) => "assistant",
            Self::Result(_) => "result",
            Self::Error { .. } => "error",
            Self::Close { .. } => "close",
        }
    }
}

/// Payload of an `assistant` line.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AssistantMessage {
    /// Concrete model identifier (e.g. `claude-sonnet-4-5-20250929`).
    #[serde(default)]
    pub model: String,
    /// Content blocks in order.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Why the model stopped, if it did.
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl AssistantMessage {
    /// Concatenate the text of all `text` blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

/// A single content block inside an assistant message.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ContentBlock {
    /// Block type (`text`, `tool_use`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Text for `text` blocks.
    #[serde(default)]
    pub text: Option<String>,
}

/// Payload of a `result` line.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ResultMessage {
    /// Final response text.
    #[serde(default, deserialize_with = "lenient_string")]
    pub result: String,
    /// Token accounting reported by the CLI.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    /// Per-model usage keyed by concrete model name.
    #[serde(default, rename = "modelUsage")]
    pub model_usage: Option<Map<String, Value>>,
    /// Whether the CLI flagged the result as an error.
    #[serde(default)]
    pub is_error: bool,
    /// CLI session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Token counts from the `usage` object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TokenUsage {
    /// Prompt-side tokens.
    #[serde(default, deserialize_with = "lenient_count")]
    pub input_tokens: Option<u64>,
    /// Completion-side tokens.
    #[serde(default, deserialize_with = "lenient_count")]
    pub output_tokens: Option<u64>,
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
