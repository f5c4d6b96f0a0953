// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the `CompileBackend` trait the build driver calls.
//! - [`process`] is the production backend that runs the engine as a child
//!   process.
//! - [`success`] owns the `on_success` command between cycles.

pub mod backend;
pub mod process;
pub mod success;

pub use backend::{BoxFuture, CompileBackend, CompileOutput};
pub use process::ProcessBackend;
pub use success::{ExitCode, SuccessProcess};

use tokio::process::Command;

/// Build a shell command appropriate for the platform.
pub(crate) fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}
