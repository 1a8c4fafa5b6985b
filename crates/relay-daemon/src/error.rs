// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP error payloads in the OpenAI error shape.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_openai::{ErrorResponse, RequestRejection};
use relay_process::ProcessError;

/// Where in a request's lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request; rejected before any process starts.
    Validation,
    /// The process could not be launched.
    Startup,
    /// The process reported an error while running.
    Runtime,
    /// The process exited without producing a result.
    AbnormalExit,
    /// The client went away. Never rendered; only logged.
    ClientDisconnect,
}

impl ErrorKind {
    /// HTTP status used when the error can still be sent as a response.
    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Startup => "startup",
            Self::Runtime => "runtime",
            Self::AbnormalExit => "abnormal_exit",
            Self::ClientDisconnect => "client_disconnect",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API error with its lifecycle kind and OpenAI error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Where the failure happened.
    pub kind: ErrorKind,
    /// Body sent to the client.
    pub body: ErrorResponse,
}

impl ApiError {
    /// A 400 for a rejected request body.
    pub fn validation(rejection: &RequestRejection) -> Self {
        Self {
            kind: ErrorKind::Validation,
            body: ErrorResponse::invalid_request(rejection.message(), rejection.code()),
        }
    }

    /// A 500 for a process that failed to launch.
    pub fn startup(err: &ProcessError) -> Self {
        Self::server(ErrorKind::Startup, err.to_string())
    }

    /// A 500 for an error reported by the running process.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::server(ErrorKind::Runtime, message)
    }

    /// A 500 for a process that exited without a result.
    pub fn abnormal_exit(message: impl Into<String>) -> Self {
        Self::server(ErrorKind::AbnormalExit, message)
    }

    fn server(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            body: ErrorResponse::server_error(message),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.body.error.message
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status().as_u16(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body)).into_response()
    }
}

/// Render an exit code the way error messages report it.
pub fn describe_exit(code: Option<i32>) -> String {
    code.map_or_else(|| "null".to_string(), |c| c.to_string())
}
