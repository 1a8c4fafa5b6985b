// SPDX-License-Identifier: MIT OR Apache-2.0
//! Low-level process spawning and stdio management.

use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use crate::{CliSpec, ProcessError};

/// A spawned CLI process whose stdout is read line by line.
pub struct CliProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    line: Vec<u8>,
}

impl CliProcess {
    /// Spawn the CLI described by `spec` and feed it `prompt` on stdin.
    ///
    /// The prompt is written from a background task and stdin is closed
    /// afterwards, so a large prompt cannot deadlock against a full stdout
    /// pipe. Stderr is drained in the background and forwarded through
    /// `tracing` at warn level.
    pub fn spawn(spec: &CliSpec, prompt: &str) -> Result<Self, ProcessError> {
        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        for (k, v) in &spec.env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            command: spec.command.clone(),
            source,
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or(ProcessError::StdioUnavailable("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(ProcessError::StdioUnavailable("stdout"))?;

        let prompt = prompt.to_owned();
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(prompt.as_bytes()).await {
                warn!(target: "relay_process", error = %err, "failed to write prompt to cli stdin");
                return;
            }
            if let Err(err) = stdin.shutdown().await {
                debug!(target: "relay_process", error = %err, "failed to close cli stdin");
            }
        });

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                while let Ok(Some(line)) = read_lossy_line(&mut reader, &mut buf).await {
                    let line = line.trim_end();
                    if !line.is_empty() {
                        warn!(target: "relay_process.stderr", "{line}");
                    }
                }
            });
        }

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            line: Vec::new(),
        })
    }

    /// OS process id, if the process is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Read the next stdout line, or `None` on EOF.
    ///
    /// Invalid UTF-8 is replaced rather than treated as a read error. Partial
    /// input survives cancellation of the returned future.
    pub async fn next_line(&mut self) -> Result<Option<String>, ProcessError> {
        read_lossy_line(&mut self.stdout, &mut self.line)
            .await
            .map_err(ProcessError::Stdout)
    }

    /// Send SIGKILL (or the platform equivalent). Safe if already exited.
    pub fn start_kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            debug!(target: "relay_process", error = %err, "kill on exited cli");
        }
    }

    /// Wait for exit and return the exit code (`None` if signalled).
    pub async fn wait(&mut self) -> Option<i32> {
        match self.child.wait().await {
            Ok(status) => status.code(),
            Err(err) => {
                warn!(target: "relay_process", error = %err, "failed to reap cli");
                None
            }
        }
    }
}

/// Read up to and including the next `\n` into `buf`, then take it out as a
/// string without the line terminator. Returns `None` at EOF with nothing
/// buffered.
async fn read_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    reader.read_until(b'\n', buf).await?;
    if buf.is_empty() {
        return Ok(None);
    }
    let mut bytes = std::mem::take(buf);
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
    Ok(Some(match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(err) => {
            debug!(target: "relay_process", "replacing invalid utf-8 in cli output");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }))
}
