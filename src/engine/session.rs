// src/engine/session.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::info;

use crate::build::{BuildDriver, BuildServices, RebuildHandle, build};
use crate::config::{ResolvedConfig, UserOptions, resolve_options};
use crate::errors::{BuildError, Result};
use crate::exec::{CompileBackend, ProcessBackend};
use crate::fs::FileSystem;
use crate::hooks::Hooks;
use crate::types::WatchMode;
use crate::watch::DEFAULT_DEBOUNCE;

/// Picks the engine for a config.
pub type BackendFactory = Arc<dyn Fn(&ResolvedConfig) -> Arc<dyn CompileBackend> + Send + Sync>;

/// Everything needed to (re)build from the caller's options.
#[derive(Clone)]
pub struct BuildSession {
    /// Programmatic options; re-resolved on every restart.
    pub user: UserOptions,
    pub fs: Arc<dyn FileSystem>,
    pub backends: BackendFactory,
    pub hooks: Arc<Hooks>,
    pub services: BuildServices,
    pub debounce: Duration,
    /// Set to false to drive the coordinator only through its handle.
    pub start_watcher: bool,
}

impl BuildSession {
    pub fn new(user: UserOptions, fs: Arc<dyn FileSystem>, backends: BackendFactory) -> Self {
        Self {
            user,
            services: BuildServices::new(fs.clone()),
            fs,
            backends,
            hooks: Arc::new(Hooks::new()),
            debounce: DEFAULT_DEBOUNCE,
            start_watcher: true,
        }
    }

    /// Session using [`ProcessBackend`] for every config.
    pub fn with_process_engine(user: UserOptions, fs: Arc<dyn FileSystem>) -> Self {
        let backends: BackendFactory = Arc::new(|config: &ResolvedConfig| {
            Arc::new(ProcessBackend::from_config(config.engine.as_deref())) as Arc<dyn CompileBackend>
        });
        Self::new(user, fs, backends)
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_services(mut self, services: BuildServices) -> Self {
        self.services = services;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn without_watcher(mut self) -> Self {
        self.start_watcher = false;
        self
    }

    /// Resolve options and run the first cycle of every config concurrently.
    ///
    /// Returns the first error of any config that is not in watch mode.
    pub async fn build_all(&self) -> Result<SessionState> {
        let resolved = resolve_options(self.user.clone(), self.fs.as_ref())?;

        let mut drivers = Vec::with_capacity(resolved.configs.len());
        for config in resolved.configs {
            let config = Arc::new(config);
            let backend = (self.backends)(&config);
            drivers.push(Arc::new(BuildDriver::new(
                config,
                backend,
                self.hooks.clone(),
                self.services.clone(),
            )?));
        }

        let mut set = JoinSet::new();
        for (idx, driver) in drivers.iter().enumerate() {
            let driver = Arc::clone(driver);
            set.spawn(async move { (idx, build(driver, true).await) });
        }

        let mut handles: Vec<(usize, RebuildHandle)> = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (idx, result) =
                joined.map_err(|e| BuildError::Other(anyhow::anyhow!("config task failed: {e}")))?;
            match result {
                Ok(Some(handle)) => handles.push((idx, handle)),
                Ok(None) => {}
                Err(err) => {
                    set.abort_all();
                    return Err(err);
                }
            }
        }
        handles.sort_by_key(|(idx, _)| *idx);

        info!(
            configs = drivers.len(),
            watching = handles.len(),
            "initial build finished"
        );

        Ok(SessionState {
            files: resolved.files,
            drivers,
            handles: handles.into_iter().map(|(_, h)| h).collect(),
        })
    }
}

/// The drivers produced by one resolution.
#[derive(Clone)]
pub struct SessionState {
    /// Config files and manifests the resolution read.
    pub files: Vec<PathBuf>,
    pub drivers: Vec<Arc<BuildDriver>>,
    /// One per watch-mode config.
    pub handles: Vec<RebuildHandle>,
}

impl SessionState {
    pub fn is_watching(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Directories to watch: each watch-mode config's roots, the directories
    /// of engine-reported inputs, and the directories holding config files.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        for handle in &self.handles {
            let config = handle.driver().config();
            match &config.watch {
                WatchMode::Off => {}
                WatchMode::Cwd => roots.push(config.cwd.clone()),
                WatchMode::Paths(paths) => {
                    roots.extend(paths.iter().map(|p| config.cwd.join(p)));
                }
            }
            roots.extend(
                handle
                    .driver()
                    .watch_files()
                    .iter()
                    .filter_map(|f| f.parent().map(PathBuf::from)),
            );
        }
        roots.extend(self.files.iter().filter_map(|f| f.parent().map(PathBuf::from)));
        roots
    }

    pub fn configs(&self) -> impl Iterator<Item = &ResolvedConfig> {
        self.drivers.iter().map(|d| d.config().as_ref())
    }

    pub fn wants_content_hash(&self) -> bool {
        self.configs().any(|c| c.hash)
    }

    pub async fn terminate_success(&self) {
        for driver in &self.drivers {
            driver.terminate_success().await;
        }
    }

    pub async fn wait_success(&self) {
        for driver in &self.drivers {
            driver.wait_success().await;
        }
    }
}
