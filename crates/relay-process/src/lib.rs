// SPDX-License-Identifier: MIT OR Apache-2.0
//! relay-process
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Event source contract and stdio transport for the assistant CLI.
//!
//! The bridge only ever sees the [`EventSource`] trait: `start` a prompt,
//! read [`ProcessEvent`]s in arrival order from the returned [`ProcessRun`],
//! and `kill` it when the client goes away. [`CliSource`] is the concrete
//! implementation that spawns the CLI in stream-json mode and decodes its
//! stdout line by line.

pub mod codec;
pub mod error;
pub mod event;
pub mod kill;
pub mod process;
pub mod source;
pub mod spec;

pub use codec::decode_line;
pub use error::ProcessError;
pub use event::{AssistantMessage, ContentBlock, ProcessEvent, ResultMessage, TokenUsage};
pub use kill::KillSwitch;
pub use process::CliProcess;
pub use source::{CliSource, EventSource, ProcessRun, StartOptions};
pub use spec::CliSpec;
