// src/engine/event_handlers.rs

//! Event handling logic for the coordinator core.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::engine::CycleKind;
use crate::engine::queue::PendingCycle;

/// Command produced by the pure core, to be executed by the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Re-run every driver's cycle.
    Rebuild,
    /// Re-resolve options and rebuild everything from scratch.
    Restart,
    /// Tear everything down and stop.
    Shutdown,
}

impl From<CycleKind> for CoreCommand {
    fn from(kind: CycleKind) -> Self {
        match kind {
            CycleKind::Rebuild => CoreCommand::Rebuild,
            CycleKind::Restart => CoreCommand::Restart,
        }
    }
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    pub fn run(kind: CycleKind) -> Self {
        Self {
            commands: vec![kind.into()],
            keep_running: true,
        }
    }
}

/// Changes touching a config file or manifest restart; anything else
/// rebuilds.
pub fn classify_change(paths: &[PathBuf], config_files: &HashSet<PathBuf>) -> CycleKind {
    if paths.iter().any(|p| config_files.contains(p)) {
        CycleKind::Restart
    } else {
        CycleKind::Rebuild
    }
}

/// Start `kind` now if nothing is in flight, otherwise fold it into the
/// pending slot.
pub fn handle_cycle_request(
    in_flight: &mut Option<CycleKind>,
    pending: &mut PendingCycle,
    kind: CycleKind,
) -> CoreStep {
    if in_flight.is_none() {
        *in_flight = Some(kind);
        return CoreStep::run(kind);
    }

    debug!(?kind, running = ?in_flight, "cycle in flight; queueing");
    pending.push(kind);
    CoreStep::idle()
}

/// The in-flight cycle ended; start whatever was queued meanwhile.
pub fn handle_cycle_finished(in_flight: &mut Option<CycleKind>, pending: &mut PendingCycle) -> CoreStep {
    *in_flight = None;
    match pending.take() {
        Some(kind) => {
            *in_flight = Some(kind);
            CoreStep::run(kind)
        }
        None => CoreStep::idle(),
    }
}
