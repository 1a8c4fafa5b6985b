// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conversions between OpenAI requests/responses and CLI prompts/events.

use chrono::Utc;
use relay_process::{AssistantMessage, ResultMessage};
use serde_json::Value;

use crate::models::{ModelAliases, normalize_model_name};
use crate::types::{
    ChatCompletion, ChatCompletionChunk, ChatMessage, ChatRequest, Choice, ChunkChoice,
    ChunkDelta, MessageContent, ResponseMessage, Role, Usage,
};

/// A request lowered to what the CLI needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Flattened conversation text, written to the CLI's stdin.
    pub text: String,
    /// Resolved CLI model alias.
    pub model: String,
    /// Caller session token, if any.
    pub session_id: Option<String>,
}

/// Lower a chat request into a CLI prompt.
pub fn request_to_prompt(request: &ChatRequest, aliases: &ModelAliases) -> Prompt {
    Prompt {
        text: messages_to_prompt(&request.messages),
        model: aliases.resolve(&request.model).to_string(),
        session_id: request.user.clone(),
    }
}

/// Flatten a conversation into a single prompt string.
///
/// System turns are wrapped in `<system>` tags and assistant turns in
/// `<previous_response>` tags; user turns are kept verbatim. Other roles are
/// dropped.
pub fn messages_to_prompt(messages: &[ChatMessage]) -> String {
    let parts: Vec<String> = messages
        .iter()
        .filter_map(|msg| {
            let text = extract_text(&msg.content);
            match msg.role {
                Role::System => Some(format!("<system>\n{text}\n</system>\n")),
                Role::User => Some(text),
                Role::Assistant => Some(format!(
                    "<previous_response>\n{text}\n</previous_response>\n"
                )),
                Role::Other => None,
            }
        })
        .collect();
    parts.join("\n").trim().to_string()
}

/// Plain text of a message's content.
pub fn extract_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter(|p| p.kind == "text")
            .map(|p| p.text.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n"),
        MessageContent::Other(value) => match value {
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            _ => String::new(),
        },
    }
}

/// Current time in unix seconds.
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

fn chunk(request_id: &str, model: String, delta: ChunkDelta, finish: bool) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: format!("chatcmpl-{request_id}"),
        object: "chat.completion.chunk".into(),
        created: unix_now(),
        model,
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            finish_reason: finish.then(|| "stop".to_string()),
        }],
    }
}

/// A content chunk. Only the first chunk of a response carries the role.
pub fn event_to_chunk(
    text: &str,
    request_id: &str,
    model: &str,
    is_first: bool,
) -> ChatCompletionChunk {
    let delta = ChunkDelta {
        role: is_first.then(|| "assistant".to_string()),
        content: Some(text.to_string()),
    };
    chunk(request_id, model.to_string(), delta, false)
}

/// The terminal chunk: empty delta, `finish_reason: "stop"`.
pub fn done_chunk(request_id: &str, model: &str) -> ChatCompletionChunk {
    chunk(
        request_id,
        normalize_model_name(model),
        ChunkDelta::default(),
        true,
    )
}

/// A whole assistant message as a single chunk.
pub fn assistant_to_chunk(
    message: &AssistantMessage,
    request_id: &str,
    is_first: bool,
) -> ChatCompletionChunk {
    let delta = ChunkDelta {
        role: is_first.then(|| "assistant".to_string()),
        content: Some(message.text()),
    };
    chunk(
        request_id,
        normalize_model_name(&message.model),
        delta,
        message.stop_reason.is_some(),
    )
}

/// Build the non-streaming response from the CLI's terminal result.
///
/// The reported model is the first key of `modelUsage` in the order the CLI
/// wrote them, falling back to `fallback_model` when the CLI gave none.
pub fn result_to_message(
    result: &ResultMessage,
    request_id: &str,
    fallback_model: &str,
) -> ChatCompletion {
    let model = result
        .model_usage
        .as_ref()
        .and_then(|usage| usage.keys().next())
        .map_or(fallback_model, String::as_str);

    let (prompt_tokens, completion_tokens) = result
        .usage
        .as_ref()
        .map(|u| {
            (
                u.input_tokens.unwrap_or_default(),
                u.output_tokens.unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    ChatCompletion {
        id: format!("chatcmpl-{request_id}"),
        object: "chat.completion".into(),
        created: unix_now(),
        model: normalize_model_name(model),
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: "assistant".into(),
                content: result.result.clone(),
            },
            finish_reason: Some("stop".into()),
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
    }
}
