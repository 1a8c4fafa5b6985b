// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted event sources and HTTP helpers shared by the daemon tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use relay_daemon::{AppState, build_app};
use relay_process::{
    AssistantMessage, ContentBlock, EventSource, KillSwitch, ProcessError, ProcessEvent,
    ProcessRun, ResultMessage, StartOptions, TokenUsage,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Scripted source
// ---------------------------------------------------------------------------

/// Test-side handle to one started run.
pub struct Controller {
    /// Push events to the bridge.
    pub events: mpsc::Sender<ProcessEvent>,
    /// The run's kill switch.
    pub kill: KillSwitch,
    /// Prompt passed to `start`.
    pub prompt: String,
    /// Options passed to `start`.
    pub options: StartOptions,
}

enum Mode {
    Controlled(mpsc::UnboundedSender<Controller>),
    Replay(Vec<ProcessEvent>),
    Fail,
}

/// An [`EventSource`] whose runs are driven by the test.
pub struct ScriptedSource {
    mode: Mode,
    kills: Mutex<Vec<KillSwitch>>,
    starts: Mutex<Vec<(String, StartOptions)>>,
}

impl ScriptedSource {
    fn with_mode(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            kills: Mutex::new(Vec::new()),
            starts: Mutex::new(Vec::new()),
        })
    }

    /// Every run hands a [`Controller`] to the returned receiver.
    pub fn controlled() -> (Arc<Self>, mpsc::UnboundedReceiver<Controller>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_mode(Mode::Controlled(tx)), rx)
    }

    /// Every run replays `events` and then ends.
    pub fn replay(events: Vec<ProcessEvent>) -> Arc<Self> {
        Self::with_mode(Mode::Replay(events))
    }

    /// Every start fails with a spawn error.
    pub fn failing() -> Arc<Self> {
        Self::with_mode(Mode::Fail)
    }

    /// Total kill requests across all runs.
    pub fn kill_requests(&self) -> usize {
        self.kills.lock().unwrap().iter().map(KillSwitch::requests).sum()
    }

    /// Prompts and options seen by `start`, in order.
    pub fn starts(&self) -> Vec<(String, StartOptions)> {
        self.starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn start(
        &self,
        prompt: &str,
        options: &StartOptions,
    ) -> Result<ProcessRun, ProcessError> {
        if matches!(self.mode, Mode::Fail) {
            return Err(ProcessError::Spawn {
                command: "scripted-cli".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        self.starts
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));

        let kill = KillSwitch::new();
        self.kills.lock().unwrap().push(kill.clone());

        match &self.mode {
            Mode::Controlled(handoff) => {
                let (tx, rx) = mpsc::channel(64);
                let _ = handoff.send(Controller {
                    events: tx,
                    kill: kill.clone(),
                    prompt: prompt.to_string(),
                    options: options.clone(),
                });
                Ok(ProcessRun::new(rx, kill))
            }
            Mode::Replay(events) => {
                let (tx, rx) = mpsc::channel(events.len().max(1));
                for event in events {
                    tx.try_send(event.clone()).unwrap();
                }
                Ok(ProcessRun::new(rx, kill))
            }
            Mode::Fail => unreachable!(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event builders
// ---------------------------------------------------------------------------

pub fn delta(text: &str) -> ProcessEvent {
    ProcessEvent::ContentDelta { text: text.into() }
}

pub fn assistant(model: &str) -> ProcessEvent {
    ProcessEvent::Assistant(AssistantMessage {
        model: model.into(),
        content: vec![ContentBlock {
            kind: "text".into(),
            text: Some("Hello".into()),
        }],
        stop_reason: None,
    })
}

pub fn result(text: &str, input: u64, output: u64) -> ProcessEvent {
    let mut model_usage = serde_json::Map::new();
    model_usage.insert(
        "claude-sonnet-4-5-20250929".into(),
        serde_json::json!({"inputTokens": input}),
    );
    ProcessEvent::Result(ResultMessage {
        result: text.into(),
        usage: Some(TokenUsage {
            input_tokens: Some(input),
            output_tokens: Some(output),
        }),
        model_usage: Some(model_usage),
        ..ResultMessage::default()
    })
}

pub fn close(code: i32) -> ProcessEvent {
    ProcessEvent::Close {
        exit_code: Some(code),
    }
}

pub fn error(message: &str) -> ProcessEvent {
    ProcessEvent::Error {
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub fn app(source: Arc<ScriptedSource>) -> axum::Router {
    build_app(Arc::new(AppState::new(source)))
}

pub async fn send(app: axum::Router, req: Request<Body>) -> Response<Body> {
    app.oneshot(req).await.unwrap()
}

pub fn post(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await;
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

pub async fn post_json(
    app: axum::Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let resp = send(app, post(uri, body)).await;
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Split an SSE body into frames (without the trailing blank line).
pub fn sse_frames(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// JSON payloads of the `data:` frames, `[DONE]` excluded.
pub fn data_payloads(frames: &[String]) -> Vec<serde_json::Value> {
    frames
        .iter()
        .filter_map(|f| f.strip_prefix("data: "))
        .filter(|d| *d != "[DONE]")
        .map(|d| serde_json::from_str(d).unwrap())
        .collect()
}

pub fn chat_body(stream: bool) -> serde_json::Value {
    serde_json::json!({
        "model": "claude-sonnet-4",
        "stream": stream,
        "messages": [
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": "hi"},
        ],
    })
}
