// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::watch::path_utils::canonical_or_nearest;
use crate::watch::{ContentHashes, WatchFilter, WatcherHandle, spawn_watcher};

use super::core::CoordinatorCore;
use super::session::{BuildSession, SessionState};
use super::{CoordinatorEvent, CoreCommand};

/// Sender side for triggering the coordinator from outside.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    /// Manual full restart.
    pub async fn request_restart(&self) {
        let _ = self.tx.send(CoordinatorEvent::RestartRequested).await;
    }

    pub async fn request_shutdown(&self) {
        let _ = self.tx.send(CoordinatorEvent::ShutdownRequested).await;
    }

    /// Report changed files as if the watcher had seen them.
    pub async fn notify_changed(&self, paths: Vec<PathBuf>) {
        let _ = self.tx.send(CoordinatorEvent::FilesChanged(paths)).await;
    }
}

struct Active {
    state: SessionState,
    watcher: Option<WatcherHandle>,
}

/// Async shell around [`CoordinatorCore`].
///
/// Cycles run on a spawned task so change events keep flowing into the core
/// (and coalescing) while a cycle is in flight.
pub struct Coordinator {
    core: CoordinatorCore,
    session: Arc<BuildSession>,
    active: Arc<Mutex<Active>>,
    event_tx: mpsc::Sender<CoordinatorEvent>,
    event_rx: mpsc::Receiver<CoordinatorEvent>,
    cycle: Option<JoinHandle<()>>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(session: BuildSession, state: SessionState) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(64);
        let session = Arc::new(session);

        let watcher = start_watcher(&session, &state, &event_tx)?;
        let core = CoordinatorCore::new(canonical(&state.files));

        Ok(Self {
            core,
            session,
            active: Arc::new(Mutex::new(Active { state, watcher })),
            event_tx,
            event_rx,
            cycle: None,
        })
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            tx: self.event_tx.clone(),
        }
    }

    /// Main event loop; returns after shutdown teardown completes.
    pub async fn run(mut self) -> Result<()> {
        info!("watching for changes");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("coordinator event channel closed; exiting");
                break;
            };
            debug!(
                ?event,
                in_flight = ?self.core.in_flight(),
                pending = ?self.core.pending(),
                "coordinator received event"
            );

            let step = self.core.step(event);
            for command in step.commands {
                self.execute(command).await;
            }
            if !step.keep_running {
                break;
            }
        }

        self.teardown().await;
        Ok(())
    }

    async fn execute(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::Rebuild => {
                let active = Arc::clone(&self.active);
                let tx = self.event_tx.clone();
                self.cycle = Some(tokio::spawn(async move {
                    rebuild_all(&active).await;
                    let _ = tx.send(CoordinatorEvent::CycleFinished { config_files: None }).await;
                }));
            }
            CoreCommand::Restart => {
                let active = Arc::clone(&self.active);
                let session = Arc::clone(&self.session);
                let tx = self.event_tx.clone();
                self.cycle = Some(tokio::spawn(async move {
                    let config_files = restart(&session, &active, &tx).await;
                    let _ = tx.send(CoordinatorEvent::CycleFinished { config_files }).await;
                }));
            }
            CoreCommand::Shutdown => {
                info!("shutdown requested");
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            cycle.abort();
            let _ = cycle.await;
        }
        let mut active = self.active.lock().await;
        active.watcher = None;
        active.state.terminate_success().await;
        info!("coordinator stopped");
    }
}

async fn rebuild_all(active: &Mutex<Active>) {
    let handles = active.lock().await.state.handles.clone();

    let mut set = JoinSet::new();
    for handle in handles {
        set.spawn(async move {
            let name = handle.driver().config().name.clone();
            (name, handle.rebuild().await)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((name, Ok(outcome))) => {
                debug!(config = %name, state = ?outcome.state, "rebuild finished")
            }
            Ok((name, Err(err))) => error!(config = %name, error = %err, "rebuild failed"),
            Err(err) => error!(error = %err, "rebuild task panicked"),
        }
    }
}

/// Tear down and rebuild from freshly resolved options. On resolution or
/// build failure the previous drivers are kept so a fixed config can
/// restart again.
async fn restart(
    session: &BuildSession,
    active: &Mutex<Active>,
    tx: &mpsc::Sender<CoordinatorEvent>,
) -> Option<Vec<PathBuf>> {
    info!("restarting: configuration changed");
    let mut guard = active.lock().await;

    guard.watcher = None;
    guard.state.terminate_success().await;

    let files = match session.build_all().await {
        Ok(state) => {
            let files = canonical(&state.files);
            guard.state = state;
            Some(files)
        }
        Err(err) => {
            error!(error = %err, "restart failed; keeping previous build");
            None
        }
    };

    match start_watcher(session, &guard.state, tx) {
        Ok(watcher) => guard.watcher = watcher,
        Err(err) => warn!(error = %err, "could not restart file watcher"),
    }

    files
}

fn start_watcher(
    session: &BuildSession,
    state: &SessionState,
    tx: &mpsc::Sender<CoordinatorEvent>,
) -> Result<Option<WatcherHandle>> {
    if !session.start_watcher {
        return Ok(None);
    }

    let always = canonical(&state.files);
    let filter = WatchFilter::from_configs(state.configs(), &always)?;
    let hashes = state
        .wants_content_hash()
        .then(|| ContentHashes::new(session.fs.clone()));

    let watcher = spawn_watcher(state.watch_roots(), filter, hashes, tx.clone(), session.debounce)?;
    Ok(Some(watcher))
}

fn canonical(files: &[PathBuf]) -> Vec<PathBuf> {
    files.iter().map(|f| canonical_or_nearest(f)).collect()
}
