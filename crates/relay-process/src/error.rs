// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for relay-process operations.

use thiserror::Error;

/// Errors from starting the CLI or decoding its output.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failed to spawn the CLI process.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// The command that was attempted.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A piped stdio handle was not available after spawn.
    #[error("cli {0} unavailable")]
    StdioUnavailable(&'static str),

    /// Failed to read from CLI stdout.
    #[error("failed to read cli stdout: {0}")]
    Stdout(#[source] std::io::Error),

    /// A stdout line was not valid JSON.
    #[error("malformed stream-json line: {0}")]
    Decode(#[source] serde_json::Error),
}
