// src/build/driver.rs

//! Runs build cycles for one resolved config.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::build::clean::{CleanCell, FsCleaner, OutputCleaner};
use crate::build::context::{BuildContext, CycleState};
use crate::build::post_steps::{copy_assets, run_publint};
use crate::config::{OnSuccess, ResolvedConfig};
use crate::errors::{BuildError, Result};
use crate::exec::{CompileBackend, ExitCode, SuccessProcess};
use crate::external::ExternalClassifier;
use crate::fs::FileSystem;
use crate::hooks::{HookContext, Hooks};
use crate::options::{CompilePass, get_build_options};
use crate::types::OutputFormat;

/// Session-wide collaborators shared by every driver.
#[derive(Clone)]
pub struct BuildServices {
    pub fs: Arc<dyn FileSystem>,
    pub cleaner: Arc<dyn OutputCleaner>,
    pub exit_code: ExitCode,
}

impl BuildServices {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            cleaner: Arc::new(FsCleaner::new(fs.clone())),
            fs,
            exit_code: ExitCode::default(),
        }
    }

    pub fn with_cleaner(mut self, cleaner: Arc<dyn OutputCleaner>) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn with_exit_code(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code;
        self
    }
}

/// How a cycle ended. Compile failures in watch mode end up here rather
/// than as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub cycle: u64,
    pub state: CycleState,
    pub errors: Vec<String>,
    pub files: Vec<PathBuf>,
    pub watch_files: Vec<PathBuf>,
}

impl CycleOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == CycleState::Done
    }
}

pub struct BuildDriver {
    config: Arc<ResolvedConfig>,
    backend: Arc<dyn CompileBackend>,
    hooks: Arc<Hooks>,
    services: BuildServices,
    classifier: Arc<ExternalClassifier>,
    context: Mutex<BuildContext>,
    success: Mutex<Option<SuccessProcess>>,
}

impl BuildDriver {
    pub fn new(
        config: Arc<ResolvedConfig>,
        backend: Arc<dyn CompileBackend>,
        hooks: Arc<Hooks>,
        services: BuildServices,
    ) -> Result<Self> {
        let classifier = Arc::new(ExternalClassifier::new(&config, services.fs.clone())?);
        Ok(Self {
            context: Mutex::new(BuildContext::new(config.clone())),
            config,
            backend,
            hooks,
            services,
            classifier,
            success: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &Arc<ResolvedConfig> {
        &self.config
    }

    pub fn watch_mode(&self) -> bool {
        self.config.watch.is_enabled()
    }

    /// Copy of the current context.
    pub async fn context(&self) -> BuildContext {
        self.context.lock().await.clone()
    }

    /// Inputs the engine reported during the last finished cycle. Empty while
    /// a cycle holds the context.
    pub fn watch_files(&self) -> Vec<PathBuf> {
        self.context
            .try_lock()
            .map(|ctx| ctx.watch_files.clone())
            .unwrap_or_default()
    }

    /// Run one full cycle.
    ///
    /// In watch mode compile and post-step failures are logged and reported
    /// through the outcome; otherwise the first one is returned as `Err`.
    pub async fn run_cycle(self: &Arc<Self>, first_run: bool) -> Result<CycleOutcome> {
        {
            let mut ctx = self.context.lock().await;
            ctx.begin_cycle();
            info!(
                config = %self.config.name,
                cycle = ctx.cycle,
                formats = ?self.config.formats,
                "{}",
                if first_run { "build start" } else { "rebuild start" }
            );
            self.hooks.call(&mut HookContext::Prepare(&mut ctx))?;
            ctx.transition(CycleState::Cleaning);
        }

        let clean = CleanCell::new();
        let multi = self.config.is_multi_format();

        let mut set = JoinSet::new();
        for &format in &self.config.formats {
            let driver = Arc::clone(self);
            let clean = clean.clone();
            set.spawn(async move { driver.compile_format(format, clean, multi).await });
        }

        while let Some(joined) = set.join_next().await {
            let result = joined.map_err(|e| BuildError::Other(anyhow::anyhow!("format task failed: {e}")))?;
            if let Err(err) = result {
                if self.watch_mode() {
                    error!(config = %self.config.name, error = %err, "build failed");
                    self.context.lock().await.errors.push(err.to_string());
                } else {
                    set.abort_all();
                    self.context.lock().await.transition(CycleState::Failed);
                    return Err(err);
                }
            }
        }

        if !self.context.lock().await.errors.is_empty() {
            return Ok(self.finish(CycleState::Failed).await);
        }

        self.context.lock().await.transition(CycleState::PostProcessing);
        self.terminate_success().await;

        if let Err(err) = self.post_steps() {
            if self.watch_mode() {
                error!(config = %self.config.name, error = %err, "post-build step failed");
                self.context.lock().await.errors.push(err.to_string());
                return Ok(self.finish(CycleState::Failed).await);
            }
            self.context.lock().await.transition(CycleState::Failed);
            return Err(err);
        }

        {
            let mut ctx = self.context.lock().await;
            self.hooks.call(&mut HookContext::Done(&mut ctx))?;
            info!(
                config = %self.config.name,
                cycle = ctx.cycle,
                files = ctx.files.len(),
                elapsed_ms = ctx.elapsed().as_millis() as u64,
                "build complete"
            );
        }

        self.run_success_action().await;
        Ok(self.finish(CycleState::Done).await)
    }

    async fn finish(&self, state: CycleState) -> CycleOutcome {
        let mut ctx = self.context.lock().await;
        ctx.transition(state);
        CycleOutcome {
            cycle: ctx.cycle,
            state,
            errors: ctx.errors.clone(),
            files: ctx.files.clone(),
            watch_files: ctx.watch_files.clone(),
        }
    }

    async fn compile_format(&self, format: OutputFormat, clean: CleanCell, multi: bool) -> Result<()> {
        clean
            .run(self.services.cleaner.as_ref(), &self.config)
            .await
            .map_err(|e| BuildError::Other(anyhow::anyhow!("cleaning {}: {e}", self.config.out_dir.display())))?;

        {
            let mut ctx = self.context.lock().await;
            if ctx.state == CycleState::Cleaning {
                ctx.transition(CycleState::Compiling);
            }
        }

        self.compile_pass(format, CompilePass::Primary, multi).await?;

        if format == OutputFormat::Cjs && self.config.dts.applies_to(OutputFormat::Cjs) {
            self.compile_pass(format, CompilePass::DeclarationsOnly, multi).await?;
        }
        Ok(())
    }

    async fn compile_pass(&self, format: OutputFormat, pass: CompilePass, multi: bool) -> Result<()> {
        let mut options = get_build_options(&self.config, self.classifier.clone(), format, pass, multi)?;

        {
            let mut ctx = self.context.lock().await;
            self.hooks.call(&mut HookContext::Before {
                context: &mut ctx,
                options: &mut options,
            })?;
        }

        let output = self
            .backend
            .compile(options)
            .await
            .map_err(|message| BuildError::Compile {
                config: self.config.name.clone(),
                format,
                message,
            })?;

        let mut ctx = self.context.lock().await;
        ctx.files.extend(output.files);
        ctx.watch_files.extend(output.watch_files);
        Ok(())
    }

    fn post_steps(&self) -> Result<()> {
        let fs = self.services.fs.as_ref();
        if self.config.publint {
            run_publint(fs, &self.config)?;
        }
        copy_assets(fs, &self.config)?;
        Ok(())
    }

    async fn run_success_action(&self) {
        match &self.config.on_success {
            None => {}
            Some(OnSuccess::Callback(cb)) => {
                if let Err(e) = cb.call(&self.config) {
                    warn!(config = %self.config.name, error = %e, "success callback failed");
                }
            }
            Some(OnSuccess::Command(cmd)) => {
                match SuccessProcess::spawn(cmd, &self.config.cwd, self.services.exit_code.clone()) {
                    Ok(process) => *self.success.lock().await = Some(process),
                    Err(e) => warn!(config = %self.config.name, error = %e, "could not start success command"),
                }
            }
        }
    }

    /// Kill and reap the previous cycle's success command, if any.
    pub async fn terminate_success(&self) {
        let previous = self.success.lock().await.take();
        if let Some(process) = previous {
            process.terminate().await;
        }
    }

    /// Wait for the success command to exit on its own.
    pub async fn wait_success(&self) {
        let current = self.success.lock().await.take();
        if let Some(process) = current {
            process.wait().await;
        }
    }
}

/// Re-runs cycles of a driver that has already built once.
#[derive(Clone)]
pub struct RebuildHandle {
    driver: Arc<BuildDriver>,
}

impl RebuildHandle {
    pub async fn rebuild(&self) -> Result<CycleOutcome> {
        self.driver.run_cycle(false).await
    }

    pub fn driver(&self) -> &Arc<BuildDriver> {
        &self.driver
    }
}

/// Run the first cycle. Watch-mode configs get a handle for later rebuilds.
pub async fn build(driver: Arc<BuildDriver>, first_run: bool) -> Result<Option<RebuildHandle>> {
    driver.run_cycle(first_run).await?;
    if driver.watch_mode() {
        Ok(Some(RebuildHandle { driver }))
    } else {
        Ok(None)
    }
}
