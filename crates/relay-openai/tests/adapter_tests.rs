// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the request/response adapters.

use relay_openai::{
    ChatMessage, ChatRequest, ModelAliases, RequestRejection, Role, assistant_to_chunk,
    done_chunk, event_to_chunk, messages_to_prompt, request_to_prompt, result_to_message,
};
use relay_process::{
    AssistantMessage, ContentBlock, ProcessEvent, ResultMessage, TokenUsage, decode_line,
};
use serde_json::json;

fn parse(body: serde_json::Value) -> ChatRequest {
    ChatRequest::from_json(body).unwrap()
}

// ---------------------------------------------------------------------------
// Request decoding
// ---------------------------------------------------------------------------

#[test]
fn missing_empty_or_non_list_messages_are_rejected() {
    for body in [
        json!({}),
        json!({"messages": []}),
        json!({"messages": "hi"}),
        json!({"messages": null}),
        json!({"messages": [1, 2]}),
        json!("not an object"),
    ] {
        assert_eq!(
            ChatRequest::from_json(body.clone()),
            Err(RequestRejection::InvalidMessages),
            "body: {body}"
        );
    }
}

#[test]
fn rejection_carries_openai_message_and_code() {
    let rejection = RequestRejection::InvalidMessages;
    assert_eq!(
        rejection.message(),
        "messages is required and must be a non-empty array"
    );
    assert_eq!(rejection.code(), "invalid_messages");
}

#[test]
fn loosely_typed_fields_fall_back_to_defaults() {
    let req = parse(json!({
        "model": 5,
        "stream": "true",
        "user": {"id": 1},
        "messages": [{"role": "tool", "content": "x"}],
    }));
    assert_eq!(req.model, "");
    assert!(!req.stream);
    assert_eq!(req.user, None);
    assert_eq!(req.messages[0].role, Role::Other);
}

#[test]
fn only_literal_true_enables_streaming() {
    let req = parse(json!({"stream": true, "messages": [{"role": "user", "content": "x"}]}));
    assert!(req.stream);
}

// ---------------------------------------------------------------------------
// Prompt building
// ---------------------------------------------------------------------------

#[test]
fn system_and_user_turns_are_flattened() {
    let req = parse(json!({
        "model": "claude-sonnet-4",
        "messages": [
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": "hi"},
        ],
    }));
    let prompt = request_to_prompt(&req, &ModelAliases::default());
    assert_eq!(prompt.text, "<system>\nbe brief\n</system>\n\nhi");
    assert_eq!(prompt.model, "sonnet");
    assert_eq!(prompt.session_id, None);
}

#[test]
fn assistant_turns_become_previous_responses() {
    let messages = vec![
        ChatMessage::new(Role::User, "q1"),
        ChatMessage::new(Role::Assistant, "a1"),
        ChatMessage::new(Role::User, "q2"),
    ];
    assert_eq!(
        messages_to_prompt(&messages),
        "q1\n<previous_response>\na1\n</previous_response>\n\nq2"
    );
}

#[test]
fn unknown_roles_are_skipped() {
    let req = parse(json!({
        "messages": [
            {"role": "tool", "content": "ignored"},
            {"role": "user", "content": "kept"},
        ],
    }));
    assert_eq!(request_to_prompt(&req, &ModelAliases::default()).text, "kept");
}

#[test]
fn content_parts_keep_only_text_joined_by_newline() {
    let req = parse(json!({
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image_url", "image_url": {"url": "http://x"}},
                {"type": "text", "text": "second"},
            ],
        }],
    }));
    assert_eq!(
        request_to_prompt(&req, &ModelAliases::default()).text,
        "first\nsecond"
    );
}

#[test]
fn odd_content_shapes_are_stringified_or_dropped() {
    let req = parse(json!({
        "messages": [
            {"role": "user", "content": null},
            {"role": "user", "content": 42},
            {"role": "user", "content": true},
            {"role": "user", "content": {"nested": "object"}},
            {"role": "user"},
        ],
    }));
    assert_eq!(
        request_to_prompt(&req, &ModelAliases::default()).text,
        "42\ntrue"
    );
}

#[test]
fn user_token_becomes_session_id() {
    let req = parse(json!({
        "model": "claude-code-cli/claude-haiku-4",
        "user": "sess-9",
        "messages": [{"role": "user", "content": "x"}],
    }));
    let prompt = request_to_prompt(&req, &ModelAliases::default());
    assert_eq!(prompt.model, "haiku");
    assert_eq!(prompt.session_id.as_deref(), Some("sess-9"));
}

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

#[test]
fn first_chunk_carries_role_later_ones_do_not() {
    let first = event_to_chunk("Hel", "abc", "claude-sonnet-4", true);
    let later = event_to_chunk("lo", "abc", "claude-sonnet-4", false);

    assert_eq!(first.id, "chatcmpl-abc");
    assert_eq!(first.object, "chat.completion.chunk");
    assert_eq!(first.choices[0].delta.role.as_deref(), Some("assistant"));
    assert_eq!(first.choices[0].delta.content.as_deref(), Some("Hel"));
    assert_eq!(first.choices[0].finish_reason, None);

    let later_json = serde_json::to_value(&later).unwrap();
    assert!(later_json["choices"][0]["delta"].get("role").is_none());
    assert_eq!(later_json["choices"][0]["finish_reason"], json!(null));
}

#[test]
fn delta_chunks_keep_the_raw_model_name() {
    let chunk = event_to_chunk("x", "id", "claude-sonnet-4-5-20250929", false);
    assert_eq!(chunk.model, "claude-sonnet-4-5-20250929");
}

#[test]
fn done_chunk_is_empty_and_normalized() {
    let chunk = done_chunk("id", "claude-sonnet-4-5-20250929");
    assert_eq!(chunk.model, "claude-sonnet-4");
    assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
    let value = serde_json::to_value(&chunk).unwrap();
    assert_eq!(value["choices"][0]["delta"], json!({}));
}

#[test]
fn assistant_message_becomes_one_chunk() {
    let msg = AssistantMessage {
        model: "claude-opus-4-1".into(),
        content: vec![
            ContentBlock {
                kind: "text".into(),
                text: Some("Hel".into()),
            },
            ContentBlock {
                kind: "tool_use".into(),
                text: None,
            },
            ContentBlock {
                kind: "text".into(),
                text: Some("lo".into()),
            },
        ],
        stop_reason: Some("end_turn".into()),
    };
    let chunk = assistant_to_chunk(&msg, "id", true);
    assert_eq!(chunk.model, "claude-opus-4");
    assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hello"));
    assert_eq!(chunk.choices[0].delta.role.as_deref(), Some("assistant"));
    assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));

    let open = AssistantMessage {
        stop_reason: None,
        ..msg
    };
    assert_eq!(assistant_to_chunk(&open, "id", false).choices[0].finish_reason, None);
}

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

#[test]
fn result_maps_to_completion_with_usage() {
    let mut model_usage = serde_json::Map::new();
    model_usage.insert("claude-haiku-4-5".into(), json!({"inputTokens": 3}));
    let result = ResultMessage {
        result: "Hello".into(),
        usage: Some(TokenUsage {
            input_tokens: Some(3),
            output_tokens: Some(1),
        }),
        model_usage: Some(model_usage),
        ..ResultMessage::default()
    };

    let completion = result_to_message(&result, "req1", "claude-sonnet-4");
    assert_eq!(completion.id, "chatcmpl-req1");
    assert_eq!(completion.object, "chat.completion");
    assert_eq!(completion.model, "claude-haiku-4");
    assert_eq!(completion.choices.len(), 1);
    assert_eq!(completion.choices[0].message.role, "assistant");
    assert_eq!(completion.choices[0].message.content, "Hello");
    assert_eq!(completion.choices[0].finish_reason.as_deref(), Some("stop"));
    assert_eq!(completion.usage.prompt_tokens, 3);
    assert_eq!(completion.usage.completion_tokens, 1);
    assert_eq!(completion.usage.total_tokens, 4);
}

#[test]
fn missing_usage_and_model_fall_back() {
    let result = ResultMessage {
        result: "ok".into(),
        ..ResultMessage::default()
    };
    let completion = result_to_message(&result, "r", "claude-sonnet-4");
    assert_eq!(completion.model, "claude-sonnet-4");
    assert_eq!(completion.usage.total_tokens, 0);
}

#[test]
fn model_comes_from_the_first_model_usage_key_as_reported() {
    let line = concat!(
        r#"{"type":"result","result":"hi","modelUsage":{"#,
        r#""claude-sonnet-4-5-20250929":{"inputTokens":9},"#,
        r#""claude-3-5-haiku-20241022":{"inputTokens":1}}}"#,
    );
    let Some(ProcessEvent::Result(result)) = decode_line(line).unwrap() else {
        panic!("expected a result event");
    };
    let completion = result_to_message(&result, "r", "claude-opus-4");
    assert_eq!(completion.model, "claude-sonnet-4");
}
