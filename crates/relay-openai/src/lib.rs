// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # relay-openai
//!
//! OpenAI Chat Completions wire types and the adapters between them and the
//! assistant CLI: request → prompt, stream event → chunk, terminal result →
//! completion, plus model aliasing.

pub mod adapter;
pub mod models;
pub mod types;

pub use adapter::{
    Prompt, assistant_to_chunk, done_chunk, event_to_chunk, extract_text, messages_to_prompt,
    request_to_prompt, result_to_message, unix_now,
};
pub use models::{
    CANONICAL_MODELS, DEFAULT_ALIAS, DEFAULT_PROVIDER_PREFIX, FALLBACK_MODEL, MODEL_OWNER,
    ModelAliases, normalize_model_name,
};
pub use types::{
    ChatCompletion, ChatCompletionChunk, ChatMessage, ChatRequest, Choice, ChunkChoice,
    ChunkDelta, ContentPart, ErrorDetail, ErrorResponse, MessageContent, ModelCard, ModelList,
    RequestRejection, ResponseMessage, Role, Usage,
};
