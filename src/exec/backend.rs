// src/exec/backend.rs

//! Compilation engine abstraction.
//!
//! The build driver talks to a `CompileBackend` instead of a concrete
//! engine. Production uses [`ProcessBackend`](super::process::ProcessBackend);
//! tests provide fakes that record the options they receive and write
//! output files directly.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::Deserialize;

use crate::options::BuildOptions;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the engine reports back for one successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    /// Files written to the output directory.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Source files the engine read; their directories are watched as well.
    #[serde(default)]
    pub watch_files: Vec<PathBuf>,
}

/// One compile invocation per call. The error payload is the engine's
/// diagnostic text.
pub trait CompileBackend: Send + Sync {
    fn compile(&self, options: BuildOptions) -> BoxFuture<'_, Result<CompileOutput, String>>;
}
