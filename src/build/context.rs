// src/build/context.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::types::OutputFormat;

/// Where a driver is within its current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Preparing,
    Cleaning,
    Compiling,
    PostProcessing,
    Done,
    Failed,
}

/// Mutable per-driver state, reset at the start of every cycle.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: Arc<ResolvedConfig>,
    pub cycle: u64,
    pub state: CycleState,
    pub started: Option<Instant>,
    pub formats: Vec<OutputFormat>,
    pub errors: Vec<String>,
    /// Files the engine reported writing this cycle.
    pub files: Vec<PathBuf>,
    /// Extra inputs the engine reported reading this cycle.
    pub watch_files: Vec<PathBuf>,
}

impl BuildContext {
    pub fn new(config: Arc<ResolvedConfig>) -> Self {
        let formats = config.formats.clone();
        Self {
            config,
            cycle: 0,
            state: CycleState::Idle,
            started: None,
            formats,
            errors: Vec::new(),
            files: Vec::new(),
            watch_files: Vec::new(),
        }
    }

    pub fn begin_cycle(&mut self) {
        self.cycle += 1;
        self.started = Some(Instant::now());
        self.formats = self.config.formats.clone();
        self.errors.clear();
        self.files.clear();
        self.watch_files.clear();
        self.transition(CycleState::Preparing);
    }

    pub fn transition(&mut self, to: CycleState) {
        debug!(
            config = %self.config.name,
            cycle = self.cycle,
            from = ?self.state,
            ?to,
            "cycle state"
        );
        self.state = to;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}
