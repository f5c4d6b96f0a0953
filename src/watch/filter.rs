// src/watch/filter.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ResolvedConfig;
use crate::watch::path_utils::{canonical_or_nearest, in_hidden_or_vendor_dir, relative_str};

/// Per-config ignore rules.
#[derive(Debug, Clone)]
struct ConfigRules {
    cwd: PathBuf,
    out_dir: PathBuf,
    ignore: GlobSet,
}

/// Decides which changed paths are worth a rebuild.
///
/// Config directories are compared in canonical form, matching the paths
/// the OS watcher reports for its canonicalized roots.
///
/// Ignored: anything inside an output directory, `node_modules`, hidden
/// directories, and paths matching a config's `ignore_watch` globs
/// (relative to that config's cwd). Files listed in `always` (config files
/// and manifests) are never ignored.
#[derive(Debug, Clone, Default)]
pub struct WatchFilter {
    rules: Vec<ConfigRules>,
    always: Vec<PathBuf>,
}

impl WatchFilter {
    pub fn from_configs<'a>(
        configs: impl IntoIterator<Item = &'a ResolvedConfig>,
        always: &[PathBuf],
    ) -> Result<Self> {
        let mut rules = Vec::new();
        for config in configs {
            let mut builder = GlobSetBuilder::new();
            for pat in &config.ignore_watch {
                builder.add(
                    Glob::new(pat).with_context(|| format!("invalid ignore_watch pattern: {pat}"))?,
                );
            }
            rules.push(ConfigRules {
                cwd: canonical_or_nearest(&config.cwd),
                out_dir: canonical_or_nearest(&config.out_dir),
                ignore: builder.build()?,
            });
        }
        Ok(Self {
            rules,
            always: always.to_vec(),
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.always.iter().any(|p| p == path) {
            return false;
        }

        for rule in &self.rules {
            if path.starts_with(&rule.out_dir) {
                return true;
            }
            if let Ok(rel) = path.strip_prefix(&rule.cwd) {
                if in_hidden_or_vendor_dir(rel) {
                    return true;
                }
                if relative_str(&rule.cwd, path).is_some_and(|rel| rule.ignore.is_match(&rel)) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_output_vendor_hidden_and_user_globs() {
        let mut cfg = ResolvedConfig::new("p", "/p");
        cfg.ignore_watch = vec!["**/*.snap".into()];
        let filter = WatchFilter::from_configs([&cfg], &[PathBuf::from("/p/.tsforgerc/tsforge.toml")]).unwrap();

        assert!(filter.is_ignored(Path::new("/p/dist/index.mjs")));
        assert!(filter.is_ignored(Path::new("/p/node_modules/x/index.js")));
        assert!(filter.is_ignored(Path::new("/p/.git/index")));
        assert!(filter.is_ignored(Path::new("/p/src/__snapshots__/a.snap")));
        assert!(!filter.is_ignored(Path::new("/p/src/index.ts")));
        assert!(!filter.is_ignored(Path::new("/p/.tsforgerc/tsforge.toml")));
    }

    #[cfg(unix)]
    #[test]
    fn output_dir_behind_a_symlinked_cwd_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().canonicalize().unwrap().join("project");
        std::fs::create_dir_all(real.join("src")).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let cfg = ResolvedConfig::new("p", &link);
        let filter = WatchFilter::from_configs([&cfg], &[]).unwrap();

        assert!(filter.is_ignored(&real.join("dist/index.mjs")));
        assert!(!filter.is_ignored(&real.join("src/index.ts")));
    }
}
