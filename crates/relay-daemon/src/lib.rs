// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # relay-daemon
//!
//! OpenAI-compatible HTTP front end for the assistant CLI. Chat completion
//! requests are lowered to a prompt, run through an [`EventSource`], and
//! answered either as one JSON completion or as an SSE stream driven by
//! [`bridge::StreamingBridge`].

/// Process event → response bridges.
pub mod bridge;
/// OpenAI-shaped HTTP errors.
pub mod error;
/// Middleware stack for the relay HTTP API.
pub mod middleware;

use axum::{
    Extension, Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use relay_config::RelayConfig;
use relay_openai::{ChatRequest, ModelAliases, RequestRejection, request_to_prompt, unix_now};
use relay_process::{CliSource, CliSpec, EventSource, StartOptions};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{error, info};

use crate::bridge::{NonStreamingBridge, StreamingBridge};
use crate::error::ApiError;
use crate::middleware::{CorsConfig, RequestId, RequestLogger, request_id_middleware};

pub use crate::error::ErrorKind;

/// Shared application state for the relay HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Starts one process run per request.
    pub source: Arc<dyn EventSource>,
    /// Requested model → CLI alias resolution.
    pub models: ModelAliases,
    /// Provider name reported by `/health`.
    pub provider: String,
    /// Capacity of each request's outbound frame channel.
    pub channel_buffer: usize,
    /// CORS origins; empty disables CORS.
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// State with default aliases and provider around `source`.
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            models: ModelAliases::default(),
            provider: relay_config::DEFAULT_PROVIDER.into(),
            channel_buffer: relay_config::DEFAULT_CHANNEL_BUFFER,
            cors_origins: Vec::new(),
        }
    }

    /// State for a validated configuration, backed by the real CLI.
    pub fn from_config(config: &RelayConfig) -> Self {
        let spec = CliSpec {
            command: config.cli.command.clone(),
            args: config.cli.args.clone(),
            env: config.cli.env.clone(),
            cwd: config.cli.cwd.clone(),
        };
        let source = CliSource::new(spec).with_channel_buffer(config.channel_buffer);
        Self {
            source: Arc::new(source),
            models: aliases_from_config(config),
            provider: config.provider.clone(),
            channel_buffer: config.channel_buffer,
            cors_origins: config.cors_origins.clone(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("models", &self.models)
            .field("provider", &self.provider)
            .field("channel_buffer", &self.channel_buffer)
            .field("cors_origins", &self.cors_origins)
            .finish_non_exhaustive()
    }
}

/// The alias table described by `config.models`.
pub fn aliases_from_config(config: &RelayConfig) -> ModelAliases {
    let models = &config.models;
    ModelAliases::new(
        models.aliases.clone(),
        models.provider_prefix.clone(),
        models.default_alias.clone(),
        models.fallback_model.clone(),
    )
}

/// Build the Axum router with all relay routes.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = (!state.cors_origins.is_empty())
        .then(|| CorsConfig::for_origins(&state.cors_origins).to_cors_layer());

    let router = Router::new()
        .route("/health", get(cmd_health))
        .route("/v1/models", get(cmd_models))
        .route("/v1/chat/completions", post(cmd_chat_completions))
        .route("/v1/chat-completions", post(cmd_chat_completions))
        .with_state(state)
        .layer(axum::middleware::from_fn(RequestLogger::layer))
        .layer(axum::middleware::from_fn(request_id_middleware));

    match cors {
        Some(layer) => router.layer(layer),
        None => router,
    }
}

async fn cmd_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "provider": state.provider,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn cmd_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.models.catalog(unix_now()))
}

async fn cmd_chat_completions(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::validation(&RequestRejection::InvalidMessages))?;
    let request = ChatRequest::from_json(value).map_err(|r| ApiError::validation(&r))?;

    let prompt = request_to_prompt(&request, &state.models);
    let options = StartOptions {
        model: prompt.model.clone(),
        session_id: prompt.session_id.clone(),
    };
    let run = state
        .source
        .start(&prompt.text, &options)
        .await
        .map_err(|e| {
            error!(request_id = %request_id, error = %e, "failed to start cli");
            ApiError::startup(&e)
        })?;

    info!(
        request_id = %request_id,
        model = %prompt.model,
        pid = ?run.pid(),
        stream = request.stream,
        "chat completion started"
    );

    if request.stream {
        let (tx, rx) = mpsc::channel(state.channel_buffer.max(1));
        tokio::spawn(bridge::drive(
            StreamingBridge::new(request_id.as_str()),
            run,
            tx,
        ));

        let frames = ReceiverStream::new(rx).map(|frame| Ok::<_, Infallible>(frame.into_bytes()));
        return Ok(sse_response(Body::from_stream(frames)));
    }

    let completion = NonStreamingBridge::new(request_id.as_str(), state.models.fallback_model())
        .collect(run)
        .await
        .inspect_err(|e| error!(request_id = %request_id, kind = %e.kind, error = %e, "chat completion failed"))?;
    Ok(Json(completion).into_response())
}

fn sse_response(body: Body) -> Response {
    let mut resp = Response::new(body);
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    resp
}
