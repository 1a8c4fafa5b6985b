// SPDX-License-Identifier: MIT OR Apache-2.0
//! The event source contract and its CLI-backed implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{CliProcess, CliSpec, KillSwitch, ProcessError, ProcessEvent, codec};

/// Per-request options passed to [`EventSource::start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Resolved CLI model alias.
    pub model: String,
    /// Caller-supplied session token, forwarded verbatim.
    pub session_id: Option<String>,
}

/// Something that can run a prompt and report its progress as events.
///
/// Implementations must eventually emit [`ProcessEvent::Close`] as the last
/// event of every run they start.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Start a run. An error here means nothing was started.
    async fn start(&self, prompt: &str, options: &StartOptions)
    -> Result<ProcessRun, ProcessError>;
}

/// Handle to one started run: its ordered events and a kill switch.
///
/// Dropping a `ProcessRun` does not kill the process; the reader keeps
/// reaping it in the background. Only [`kill`](Self::kill) terminates.
#[derive(Debug)]
pub struct ProcessRun {
    events: mpsc::Receiver<ProcessEvent>,
    kill: KillSwitch,
    pid: Option<u32>,
}

impl ProcessRun {
    /// Wrap an event receiver and the switch its producer listens on.
    pub fn new(events: mpsc::Receiver<ProcessEvent>, kill: KillSwitch) -> Self {
        Self {
            events,
            kill,
            pid: None,
        }
    }

    /// Attach the OS process id for logging.
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// OS process id, when known.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next event in arrival order, or `None` once the producer is gone.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }

    /// Request termination. Idempotent; returns `true` for the first call.
    pub fn kill(&self) -> bool {
        self.kill.trigger()
    }

    /// A clone of this run's kill switch.
    pub fn kill_switch(&self) -> KillSwitch {
        self.kill.clone()
    }
}

/// [`EventSource`] that spawns the assistant CLI for every run.
#[derive(Debug, Clone)]
pub struct CliSource {
    spec: CliSpec,
    channel_buffer: usize,
}

impl CliSource {
    /// Create a source from a command template.
    pub fn new(spec: CliSpec) -> Self {
        Self {
            spec,
            channel_buffer: 256,
        }
    }

    /// Override the event channel capacity.
    pub fn with_channel_buffer(mut self, size: usize) -> Self {
        self.channel_buffer = size.max(1);
        self
    }

    /// The command template.
    pub fn spec(&self) -> &CliSpec {
        &self.spec
    }
}

#[async_trait]
impl EventSource for CliSource {
    async fn start(
        &self,
        prompt: &str,
        options: &StartOptions,
    ) -> Result<ProcessRun, ProcessError> {
        let spec = self.spec.for_request(options);
        let process = CliProcess::spawn(&spec, prompt)?;
        let pid = process.id();
        info!(
            target: "relay_process",
            command = %spec.command,
            model = %options.model,
            pid = ?pid,
            "cli started"
        );

        let (tx, rx) = mpsc::channel(self.channel_buffer);
        let kill = KillSwitch::new();
        tokio::spawn(pump(process, tx, kill.clone()));

        Ok(ProcessRun::new(rx, kill).with_pid(pid))
    }
}

/// Forward decoded stdout events until EOF or a kill request, then reap the
/// process and report its exit.
///
/// If the consumer goes away the loop keeps draining stdout (so the CLI never
/// blocks on a full pipe) but stops forwarding, and never kills on its own.
async fn pump(mut process: CliProcess, tx: mpsc::Sender<ProcessEvent>, kill: KillSwitch) {
    let mut forwarding = true;

    loop {
        tokio::select! {
            _ = kill.triggered() => {
                info!(target: "relay_process", pid = ?process.id(), "kill requested");
                process.start_kill();
                break;
            }
            line = process.next_line() => match line {
                Ok(Some(line)) => {
                    if !forwarding {
                        continue;
                    }
                    match codec::decode_line(&line) {
                        Ok(Some(event)) => {
                            debug!(target: "relay_process", kind = event.kind(), "event");
                            if tx.send(event).await.is_err() {
                                forwarding = false;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(target: "relay_process", error = %err, "skipping stdout line");
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(target: "relay_process", error = %err, "cli stdout failed, killing");
                    process.start_kill();
                    if forwarding {
                        let _ = tx
                            .send(ProcessEvent::Error {
                                message: err.to_string(),
                            })
                            .await;
                    }
                    break;
                }
            }
        }
    }

    let exit_code = process.wait().await;
    if exit_code != Some(0) {
        info!(target: "relay_process", exit_code = ?exit_code, "cli exited");
    }
    if forwarding {
        let _ = tx.send(ProcessEvent::Close { exit_code }).await;
    }
}
