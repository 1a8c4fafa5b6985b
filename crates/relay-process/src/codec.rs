// SPDX-License-Identifier: MIT OR Apache-2.0
//! Decoding of the CLI's stream-json stdout lines into [`ProcessEvent`]s.

use serde::Deserialize;
use serde_json::Value;

use crate::{AssistantMessage, ProcessError, ProcessEvent, ResultMessage};

/// Top-level shape of one stream-json line, discriminated by `"type"`.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CliLine {
    StreamEvent {
        #[serde(default)]
        event: Value,
    },
    ContentBlockDelta {
        #[serde(default)]
        delta: Value,
    },
    Assistant {
        #[serde(default)]
        message: AssistantMessage,
    },
    Result(ResultMessage),
    #[serde(other)]
    Other,
}

/// Decode one stdout line.
///
/// Returns `Ok(None)` for blank lines and for line types the bridge does not
/// consume (`system`, `user`, non-text deltas, ...). Only syntactically
/// invalid JSON is an error.
pub fn decode_line(line: &str) -> Result<Option<ProcessEvent>, ProcessError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(line).map_err(ProcessError::Decode)?;
    // A line with an unexpected shape for a known type is skipped, not fatal.
    let Ok(parsed) = serde_json::from_value::<CliLine>(value) else {
        return Ok(None);
    };

    Ok(match parsed {
        CliLine::StreamEvent { event } => {
            if event.get("type").and_then(Value::as_str) == Some("content_block_delta") {
                text_delta(&event["delta"])
            } else {
                None
            }
        }
        CliLine::ContentBlockDelta { delta } => text_delta(&delta),
        CliLine::Assistant { message } => Some(ProcessEvent::Assistant(message)),
        CliLine::Result(result) => Some(ProcessEvent::Result(result)),
        CliLine::Other => None,
    })
}

fn text_delta(delta: &Value) -> Option<ProcessEvent> {
    delta.get("text").and_then(Value::as_str).map(|text| {
        ProcessEvent::ContentDelta {
            text: text.to_string(),
        }
    })
}
