// src/exec/success.rs

//! The `on_success` shell command as an owned, terminable resource.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::shell_command;

/// Process exit status shared by every driver in a session.
///
/// Success commands that exit non-zero record their code here; the CLI
/// exits with it.
#[derive(Debug, Clone, Default)]
pub struct ExitCode(Arc<AtomicI32>);

impl ExitCode {
    pub fn get(&self) -> i32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, code: i32) {
        self.0.store(code, Ordering::SeqCst);
    }
}

/// A running success command.
///
/// Dropping it without calling [`terminate`](Self::terminate) kills the
/// child without waiting for it.
#[derive(Debug)]
pub struct SuccessProcess {
    command: String,
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SuccessProcess {
    pub fn spawn(command: &str, cwd: &Path, exit_code: ExitCode) -> Result<Self> {
        info!(cmd = %command, "running success command");

        let mut cmd = shell_command(command);
        cmd.current_dir(cwd).kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning success command '{command}'"))?;

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let label = command.to_string();

        let handle = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) => {
                            let code = status.code().unwrap_or(-1);
                            if !status.success() {
                                warn!(cmd = %label, exit_code = code, "success command failed");
                                exit_code.set(code);
                            } else {
                                debug!(cmd = %label, "success command exited");
                            }
                        }
                        Err(e) => warn!(cmd = %label, error = %e, "waiting for success command"),
                    }
                }
                _ = &mut cancel_rx => {
                    debug!(cmd = %label, "terminating success command");
                    if let Err(e) = child.kill().await {
                        warn!(cmd = %label, error = %e, "failed to kill success command");
                    }
                }
            }
        });

        Ok(Self {
            command: command.to_string(),
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    /// Kill the process (if still running) and wait until it is gone.
    pub async fn terminate(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        self.join().await;
    }

    /// Wait for the process to exit on its own.
    pub async fn wait(mut self) {
        self.join().await;
    }

    async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(cmd = %self.command, error = %e, "success command task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_recorded() {
        let exit = ExitCode::default();
        let dir = tempfile::tempdir().unwrap();
        let proc = SuccessProcess::spawn("exit 3", dir.path(), exit.clone()).unwrap();
        proc.wait().await;
        assert_eq!(exit.get(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_kills_long_running_command() {
        let exit = ExitCode::default();
        let dir = tempfile::tempdir().unwrap();
        let proc = SuccessProcess::spawn("sleep 30", dir.path(), exit.clone()).unwrap();

        let started = Instant::now();
        proc.terminate().await;
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(exit.get(), 0);
    }
}
