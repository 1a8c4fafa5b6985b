// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bridges from process events to OpenAI responses.
//!
//! [`StreamingBridge`] is a synchronous state machine: each [`Signal`] yields
//! the ordered [`Effect`]s to perform, and [`drive`] executes them against an
//! outbound frame channel and a [`ProcessRun`]. [`NonStreamingBridge`]
//! buffers the terminal result into a single JSON reply.

use std::fmt;

use axum::body::Bytes;
use relay_openai::{ChatCompletion, ErrorResponse, done_chunk, event_to_chunk, result_to_message};
use relay_process::{ProcessEvent, ProcessRun, ResultMessage};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ErrorKind, describe_exit};

/// Model reported by streaming chunks until the process announces one.
pub const DEFAULT_STREAM_MODEL: &str = "claude-sonnet-4";

/// The literal payload of the stream terminator frame.
pub const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Frames, signals, effects
// ---------------------------------------------------------------------------

/// One SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// `:<text>\n\n`
    Comment(String),
    /// `data: <text>\n\n`
    Data(String),
}

impl SseFrame {
    /// A data frame holding `value` serialized as JSON.
    pub fn json<T: Serialize>(value: &T) -> Self {
        Self::Data(serde_json::to_string(value).unwrap_or_else(|_| "{}".into()))
    }

    /// The `[DONE]` terminator.
    pub fn done() -> Self {
        Self::Data(DONE_SENTINEL.into())
    }

    /// Wire encoding.
    pub fn encode(&self) -> String {
        match self {
            Self::Comment(c) => format!(":{c}\n\n"),
            Self::Data(d) => format!("data: {d}\n\n"),
        }
    }

    /// Wire bytes for the response body.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.encode())
    }
}

/// An input to the streaming state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// An event from the process.
    Process(ProcessEvent),
    /// The outbound connection closed.
    Disconnect,
}

/// Something the driver must do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write a frame to the client.
    Frame(SseFrame),
    /// Close the outbound stream.
    EndStream,
    /// Terminate the process.
    Kill,
}

/// Lifecycle of one streaming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Process started, nothing written yet.
    Starting,
    /// Forwarding content.
    Streaming,
    /// Result delivered and stream ended; waiting for the process to exit.
    Finishing,
    /// Terminal.
    Closed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Starting => "starting",
            Self::Streaming => "streaming",
            Self::Finishing => "finishing",
            Self::Closed => "closed",
        })
    }
}

/// Per-request streaming bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    /// No content chunk has been written yet.
    pub is_first_chunk: bool,
    /// Model reported by the last `assistant` event.
    pub last_model: String,
    /// A terminal result was received.
    pub is_complete: bool,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            is_first_chunk: true,
            last_model: DEFAULT_STREAM_MODEL.into(),
            is_complete: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Streaming state machine
// ---------------------------------------------------------------------------

/// State machine turning process events into SSE frames for one request.
#[derive(Debug)]
pub struct StreamingBridge {
    request_id: String,
    state: BridgeState,
    stream: StreamState,
    stream_ended: bool,
}

impl StreamingBridge {
    /// A bridge for `request_id` in [`BridgeState::Starting`].
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            state: BridgeState::Starting,
            stream: StreamState::default(),
            stream_ended: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Streaming bookkeeping.
    pub fn stream_state(&self) -> &StreamState {
        &self.stream
    }

    /// Whether the outbound stream has been ended.
    pub fn stream_ended(&self) -> bool {
        self.stream_ended
    }

    /// Request id used in chunk ids.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Open the stream. Call once the process has started.
    pub fn begin(&mut self) -> Vec<Effect> {
        if self.state != BridgeState::Starting {
            return Vec::new();
        }
        self.transition(BridgeState::Streaming);
        vec![Effect::Frame(SseFrame::Comment("ok".into()))]
    }

    /// Feed one signal and collect the resulting effects.
    ///
    /// Process events arriving before [`begin`](Self::begin) open the stream
    /// first.
    pub fn handle(&mut self, signal: Signal) -> Vec<Effect> {
        if self.state == BridgeState::Closed {
            return Vec::new();
        }
        let mut effects = match signal {
            Signal::Disconnect => Vec::new(),
            Signal::Process(_) => self.begin(),
        };

        match signal {
            Signal::Disconnect => {
                self.stream_ended = true;
                if !self.stream.is_complete {
                    info!(
                        target: "relay_daemon.bridge",
                        request_id = %self.request_id,
                        kind = %ErrorKind::ClientDisconnect,
                        "client disconnected before completion, killing cli"
                    );
                    effects.push(Effect::Kill);
                }
                self.transition(BridgeState::Closed);
            }
            Signal::Process(ProcessEvent::ContentDelta { text }) => {
                if !text.is_empty() && !self.stream_ended {
                    let chunk = event_to_chunk(
                        &text,
                        &self.request_id,
                        &self.stream.last_model,
                        self.stream.is_first_chunk,
                    );
                    effects.push(Effect::Frame(SseFrame::json(&chunk)));
                    self.stream.is_first_chunk = false;
                }
            }
            Signal::Process(ProcessEvent::Assistant(message)) => {
                if !message.model.is_empty() {
                    self.stream.last_model = message.model;
                }
            }
            Signal::Process(ProcessEvent::Result(_)) => {
                self.stream.is_complete = true;
                if !self.stream_ended {
                    let chunk = done_chunk(&self.request_id, &self.stream.last_model);
                    effects.push(Effect::Frame(SseFrame::json(&chunk)));
                    effects.push(Effect::Frame(SseFrame::done()));
                    effects.push(Effect::EndStream);
                    self.stream_ended = true;
                }
                self.transition(BridgeState::Finishing);
            }
            Signal::Process(ProcessEvent::Error { message }) => {
                warn!(
                    target: "relay_daemon.bridge",
                    request_id = %self.request_id,
                    kind = %ErrorKind::Runtime,
                    error = %message,
                    "cli reported an error"
                );
                if !self.stream_ended {
                    let body = ErrorResponse::server_error(message);
                    effects.push(Effect::Frame(SseFrame::json(&body)));
                    effects.push(Effect::EndStream);
                    self.stream_ended = true;
                }
                self.transition(BridgeState::Closed);
            }
            Signal::Process(ProcessEvent::Close { exit_code }) => {
                if !self.stream_ended {
                    if exit_code != Some(0) && !self.stream.is_complete {
                        let message = format!("Process exited with code {}", describe_exit(exit_code));
                        warn!(
                            target: "relay_daemon.bridge",
                            request_id = %self.request_id,
                            kind = %ErrorKind::AbnormalExit,
                            "{message}"
                        );
                        let body = ErrorResponse::server_error(message);
                        effects.push(Effect::Frame(SseFrame::json(&body)));
                    }
                    effects.push(Effect::Frame(SseFrame::done()));
                    effects.push(Effect::EndStream);
                    self.stream_ended = true;
                }
                self.transition(BridgeState::Closed);
            }
        }

        effects
    }

    fn transition(&mut self, to: BridgeState) {
        if self.state != to {
            debug!(
                target: "relay_daemon.bridge",
                request_id = %self.request_id,
                from = %self.state,
                to = %to,
                "bridge transition"
            );
            self.state = to;
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// How a driven stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOutcome {
    /// Final state; always [`BridgeState::Closed`].
    pub state: BridgeState,
    /// Frames successfully handed to the outbound channel.
    pub frames_written: usize,
    /// Whether the process was killed.
    pub killed: bool,
    /// Whether a terminal result was received.
    pub completed: bool,
}

/// Run `bridge` to completion over `run`, writing frames to `tx`.
///
/// Disconnect is detected when the receiving side of `tx` is dropped, either
/// while idle or when a frame send fails. An exhausted event stream counts as
/// a close with no exit code. Returns once the machine reaches
/// [`BridgeState::Closed`].
pub async fn drive(
    mut bridge: StreamingBridge,
    mut run: ProcessRun,
    tx: mpsc::Sender<SseFrame>,
) -> BridgeOutcome {
    let mut tx = Some(tx);
    let mut frames_written = 0;
    let mut killed = false;
    let mut effects = bridge.begin();

    loop {
        let mut disconnected = false;
        for effect in effects.drain(..) {
            match effect {
                Effect::Frame(frame) => {
                    let Some(sender) = &tx else { continue };
                    if sender.send(frame).await.is_err() {
                        tx = None;
                        disconnected = true;
                        continue;
                    }
                    frames_written += 1;
                }
                Effect::EndStream => tx = None,
                Effect::Kill => killed |= run.kill(),
            }
        }

        if bridge.state() == BridgeState::Closed && !disconnected {
            break;
        }

        let signal = if disconnected {
            Signal::Disconnect
        } else {
            let outbound_closed = async {
                match &tx {
                    Some(sender) => sender.closed().await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = outbound_closed => Signal::Disconnect,
                event = run.next_event() => {
                    Signal::Process(event.unwrap_or(ProcessEvent::Close { exit_code: None }))
                }
            }
        };
        effects = bridge.handle(signal);

        if bridge.state() == BridgeState::Closed && effects.is_empty() {
            break;
        }
    }

    debug!(
        target: "relay_daemon.bridge",
        request_id = %bridge.request_id(),
        frames_written,
        killed,
        "stream finished"
    );
    BridgeOutcome {
        state: bridge.state(),
        frames_written,
        killed,
        completed: bridge.stream_state().is_complete,
    }
}

// ---------------------------------------------------------------------------
// Non-streaming
// ---------------------------------------------------------------------------

/// Collects a run into one JSON completion or one error.
#[derive(Debug)]
pub struct NonStreamingBridge {
    request_id: String,
    fallback_model: String,
    result: Option<ResultMessage>,
    decided: bool,
}

impl NonStreamingBridge {
    /// A bridge for `request_id`; `fallback_model` is reported when the
    /// result names no model.
    pub fn new(request_id: impl Into<String>, fallback_model: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            fallback_model: fallback_model.into(),
            result: None,
            decided: false,
        }
    }

    /// Whether a reply has already been produced.
    pub fn is_decided(&self) -> bool {
        self.decided
    }

    /// Feed one event. Returns the reply exactly once.
    pub fn on_event(&mut self, event: ProcessEvent) -> Option<Result<ChatCompletion, ApiError>> {
        if self.decided {
            return None;
        }
        match event {
            ProcessEvent::ContentDelta { .. } | ProcessEvent::Assistant(_) => None,
            ProcessEvent::Result(result) => {
                if self.result.is_none() {
                    self.result = Some(result);
                }
                None
            }
            ProcessEvent::Error { message } => {
                self.decided = true;
                Some(Err(ApiError::runtime(message)))
            }
            ProcessEvent::Close { exit_code } => {
                self.decided = true;
                Some(match self.result.take() {
                    Some(result) => Ok(result_to_message(
                        &result,
                        &self.request_id,
                        &self.fallback_model,
                    )),
                    None => Err(ApiError::abnormal_exit(format!(
                        "Claude CLI exited with code {} without response",
                        describe_exit(exit_code)
                    ))),
                })
            }
        }
    }

    /// Consume `run` until a reply is decided.
    pub async fn collect(mut self, mut run: ProcessRun) -> Result<ChatCompletion, ApiError> {
        loop {
            let event = run
                .next_event()
                .await
                .unwrap_or(ProcessEvent::Close { exit_code: None });
            if let Some(reply) = self.on_event(event) {
                return reply;
            }
        }
    }
}
