// src/build/clean.rs

//! Output directory cleaning.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use globset::{Glob, GlobSetBuilder};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::exec::BoxFuture;
use crate::fs::{FileSystem, walk_files};
use crate::types::CleanMode;
use crate::watch::path_utils::relative_str;

/// Removes stale output before a cycle compiles.
pub trait OutputCleaner: Send + Sync {
    fn clean<'a>(&'a self, config: &'a ResolvedConfig) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// One clean per cycle, shared by every format task of that cycle.
///
/// The first task to reach the cell runs the cleaner; the rest wait for and
/// observe the same result.
#[derive(Debug, Clone, Default)]
pub struct CleanCell(Arc<OnceCell<Result<(), String>>>);

impl CleanCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run(&self, cleaner: &dyn OutputCleaner, config: &ResolvedConfig) -> Result<(), String> {
        self.0
            .get_or_init(|| async {
                cleaner.clean(config).await.map_err(|e| format!("{e:#}"))
            })
            .await
            .clone()
    }
}

/// Cleaner backed by a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FsCleaner {
    fs: Arc<dyn FileSystem>,
}

impl FsCleaner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    fn clean_sync(&self, config: &ResolvedConfig) -> anyhow::Result<()> {
        let out_dir = &config.out_dir;

        if matches!(config.clean, CleanMode::Off) || !self.fs.is_dir(out_dir) {
            return Ok(());
        }

        if config.cwd.starts_with(out_dir) {
            return Err(anyhow!(
                "refusing to clean {}: it contains the project directory",
                out_dir.display()
            ));
        }

        match &config.clean {
            CleanMode::Off => {}
            CleanMode::All => {
                let mut removed = 0usize;
                for path in self.fs.read_dir(out_dir)? {
                    self.remove(&path)?;
                    removed += 1;
                }
                info!(config = %config.name, dir = %out_dir.display(), removed, "cleaned output directory");
            }
            CleanMode::Patterns(patterns) => {
                let mut builder = GlobSetBuilder::new();
                for pat in patterns {
                    builder.add(Glob::new(pat).with_context(|| format!("invalid clean pattern {pat}"))?);
                }
                let set = builder.build()?;

                let mut removed = 0usize;
                for path in walk_files(self.fs.as_ref(), out_dir, |_| false)? {
                    if relative_str(out_dir, &path).is_some_and(|rel| set.is_match(&rel)) {
                        self.fs.remove_file(&path)?;
                        removed += 1;
                    }
                }
                info!(config = %config.name, removed, "cleaned matching output files");
            }
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> anyhow::Result<()> {
        debug!(path = %path.display(), "removing");
        if self.fs.is_dir(path) {
            self.fs.remove_dir_all(path)
        } else {
            self.fs.remove_file(path)
        }
    }
}

impl OutputCleaner for FsCleaner {
    fn clean<'a>(&'a self, config: &'a ResolvedConfig) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move { self.clean_sync(config) })
    }
}
