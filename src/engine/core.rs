// src/engine/core.rs

//! Pure watch/rebuild state machine.
//!
//! Consumes [`CoordinatorEvent`]s and returns the commands the IO shell
//! should execute. No channels, no Tokio, no filesystem: everything here is
//! unit tested synchronously.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::engine::event_handlers::{
    CoreCommand, CoreStep, classify_change, handle_cycle_finished, handle_cycle_request,
};
use crate::engine::queue::PendingCycle;
use crate::engine::{CoordinatorEvent, CycleKind};

#[derive(Debug, Default)]
pub struct CoordinatorCore {
    in_flight: Option<CycleKind>,
    pending: PendingCycle,
    config_files: HashSet<PathBuf>,
    stopped: bool,
}

impl CoordinatorCore {
    pub fn new(config_files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            config_files: config_files.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn in_flight(&self) -> Option<CycleKind> {
        self.in_flight
    }

    pub fn pending(&self) -> Option<CycleKind> {
        self.pending.peek()
    }

    pub fn step(&mut self, event: CoordinatorEvent) -> CoreStep {
        if self.stopped {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        match event {
            CoordinatorEvent::FilesChanged(paths) => {
                if paths.is_empty() {
                    return CoreStep::idle();
                }
                let kind = classify_change(&paths, &self.config_files);
                handle_cycle_request(&mut self.in_flight, &mut self.pending, kind)
            }
            CoordinatorEvent::RestartRequested => {
                handle_cycle_request(&mut self.in_flight, &mut self.pending, CycleKind::Restart)
            }
            CoordinatorEvent::CycleFinished { config_files } => {
                if let Some(files) = config_files {
                    self.config_files = files.into_iter().collect();
                }
                handle_cycle_finished(&mut self.in_flight, &mut self.pending)
            }
            CoordinatorEvent::ShutdownRequested => {
                self.stopped = true;
                self.pending.take();
                CoreStep {
                    commands: vec![CoreCommand::Shutdown],
                    keep_running: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(path: &str) -> CoordinatorEvent {
        CoordinatorEvent::FilesChanged(vec![PathBuf::from(path)])
    }

    fn finished() -> CoordinatorEvent {
        CoordinatorEvent::CycleFinished { config_files: None }
    }

    #[test]
    fn source_change_rebuilds_config_change_restarts() {
        let mut core = CoordinatorCore::new([PathBuf::from("/p/tsforge.toml")]);
        assert_eq!(core.step(changed("/p/src/a.ts")).commands, vec![CoreCommand::Rebuild]);
        core.step(finished());
        assert_eq!(core.step(changed("/p/tsforge.toml")).commands, vec![CoreCommand::Restart]);
    }

    #[test]
    fn requests_during_a_cycle_coalesce_into_one() {
        let mut core = CoordinatorCore::default();
        core.step(changed("/p/a.ts"));
        for _ in 0..5 {
            assert!(core.step(changed("/p/b.ts")).commands.is_empty());
        }
        assert_eq!(core.step(finished()).commands, vec![CoreCommand::Rebuild]);
        assert!(core.step(finished()).commands.is_empty());
        assert_eq!(core.in_flight(), None);
    }

    #[test]
    fn pending_restart_dominates_rebuilds() {
        let mut core = CoordinatorCore::default();
        core.step(changed("/p/a.ts"));
        core.step(changed("/p/b.ts"));
        core.step(CoordinatorEvent::RestartRequested);
        core.step(changed("/p/c.ts"));
        assert_eq!(core.pending(), Some(CycleKind::Restart));
        assert_eq!(core.step(finished()).commands, vec![CoreCommand::Restart]);
    }

    #[test]
    fn restart_updates_config_file_set() {
        let mut core = CoordinatorCore::new([PathBuf::from("/p/old.toml")]);
        core.step(CoordinatorEvent::RestartRequested);
        core.step(CoordinatorEvent::CycleFinished {
            config_files: Some(vec![PathBuf::from("/p/new.toml")]),
        });
        assert_eq!(core.step(changed("/p/old.toml")).commands, vec![CoreCommand::Rebuild]);
        core.step(finished());
        assert_eq!(core.step(changed("/p/new.toml")).commands, vec![CoreCommand::Restart]);
    }

    #[test]
    fn shutdown_stops_and_drops_pending() {
        let mut core = CoordinatorCore::default();
        core.step(changed("/p/a.ts"));
        core.step(changed("/p/b.ts"));
        let step = core.step(CoordinatorEvent::ShutdownRequested);
        assert_eq!(step.commands, vec![CoreCommand::Shutdown]);
        assert!(!step.keep_running);
        assert!(!core.step(finished()).keep_running);
    }
}
