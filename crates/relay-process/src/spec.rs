// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line construction for the assistant CLI.

use std::collections::BTreeMap;

use crate::StartOptions;

/// How to spawn the CLI (command, base args, env, cwd).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliSpec {
    /// Executable command to run.
    pub command: String,
    /// Base arguments, before per-request flags.
    pub args: Vec<String>,
    /// Additional environment variables for the process.
    pub env: BTreeMap<String, String>,
    /// Optional working directory override.
    pub cwd: Option<String>,
}

impl CliSpec {
    /// Create a spec with the given command and no args/env.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Replace the base arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The command line for one request: base args plus `--model` and, when a
    /// session token was supplied, `--session-id`.
    pub fn for_request(&self, options: &StartOptions) -> CliSpec {
        let mut spec = self.clone();
        if !options.model.is_empty() {
            spec.args.push("--model".into());
            spec.args.push(options.model.clone());
        }
        if let Some(session) = options.session_id.as_deref().filter(|s| !s.is_empty()) {
            spec.args.push("--session-id".into());
            spec.args.push(session.to_string());
        }
        spec
    }
}
