// src/exec/process.rs

//! Engine invoked as an external process.
//!
//! Protocol: the serialized [`BuildOptions`] are written to the engine's
//! stdin as one JSON document. Exit status 0 means success, and stdout may
//! then carry a JSON [`CompileOutput`]. On failure stderr is the error text.

use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::exec::backend::{BoxFuture, CompileBackend, CompileOutput};
use crate::exec::shell_command;
use crate::options::BuildOptions;

/// Engine command used when neither `engine` nor `TSFORGE_ENGINE` is set.
pub const DEFAULT_ENGINE: &str = "tsforge-engine";

#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: String,
}

impl ProcessBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// `configured`, else `$TSFORGE_ENGINE`, else [`DEFAULT_ENGINE`].
    pub fn from_config(configured: Option<&str>) -> Self {
        let command = configured
            .map(str::to_string)
            .or_else(|| std::env::var("TSFORGE_ENGINE").ok())
            .unwrap_or_else(|| DEFAULT_ENGINE.to_string());
        Self::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    async fn run(&self, options: BuildOptions) -> Result<CompileOutput, String> {
        let payload = serde_json::to_vec(&options)
            .map_err(|e| format!("serializing build options: {e}"))?;

        info!(
            config = %options.config,
            format = %options.requested_format,
            pass = ?options.pass,
            engine = %self.command,
            "invoking engine"
        );

        let mut cmd = shell_command(&self.command);
        cmd.current_dir(&options.input.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("spawning engine '{}': {e}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                // The engine quit before reading everything; its exit status
                // and stderr below carry the real error.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(engine = %self.command, "engine closed stdin early");
                }
                Err(e) => return Err(format!("writing options to engine: {e}")),
            }
            // Dropping stdin closes the pipe so the engine sees EOF.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("waiting for engine: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(if stderr.is_empty() {
                format!("engine exited with code {code}")
            } else {
                stderr
            });
        }

        parse_output(&output.stdout)
    }
}

fn parse_output(stdout: &[u8]) -> Result<CompileOutput, String> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        if !trimmed.is_empty() {
            debug!(output = %trimmed, "engine stdout");
        }
        return Ok(CompileOutput::default());
    }
    serde_json::from_str(trimmed).map_err(|e| format!("invalid engine output: {e}"))
}

impl CompileBackend for ProcessBackend {
    fn compile(&self, options: BuildOptions) -> BoxFuture<'_, Result<CompileOutput, String>> {
        Box::pin(self.run(options))
    }
}
