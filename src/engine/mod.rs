// src/engine/mod.rs

//! Watch/rebuild coordination.
//!
//! - [`session`] resolves options and runs the first build of every config.
//! - [`core`] is the pure state machine deciding when to rebuild or restart.
//! - [`runtime`] is the async shell that owns drivers, handles and the file
//!   watcher, and executes the core's commands.

use std::path::PathBuf;

use crate::watch::WatchEvent;

/// What a cycle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Re-run every rebuild handle.
    Rebuild,
    /// Re-resolve options and build from scratch.
    Restart,
}

/// Events flowing into the coordinator from the watcher, cycle tasks,
/// manual triggers and signal handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    FilesChanged(Vec<PathBuf>),
    RestartRequested,
    /// The in-flight cycle ended. A restart reports the new set of config
    /// files.
    CycleFinished { config_files: Option<Vec<PathBuf>> },
    ShutdownRequested,
}

impl From<WatchEvent> for CoordinatorEvent {
    fn from(event: WatchEvent) -> Self {
        match event {
            WatchEvent::FilesChanged(paths) => CoordinatorEvent::FilesChanged(paths),
        }
    }
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;
pub mod session;

pub use core::CoordinatorCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::PendingCycle;
pub use runtime::{Coordinator, CoordinatorHandle};
pub use session::{BackendFactory, BuildSession, SessionState};
