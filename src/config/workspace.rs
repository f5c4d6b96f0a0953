// src/config/workspace.rs

//! Workspace (multi-package) expansion.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::manifest::MANIFEST_FILE;
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// Return every directory under `root` matching one of `patterns` that
/// contains a `package.json`, sorted.
///
/// Patterns are matched with `literal_separator`, so `packages/*` selects
/// direct children of `packages/` only.
pub fn find_packages(fs: &dyn FileSystem, root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let set = build_dir_globset(patterns)?;

    let mut packages = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let children = fs
            .read_dir(&dir)
            .map_err(|e| BuildError::ConfigResolution(format!("{e:#}")))?;
        for child in children {
            if !fs.is_dir(&child) || is_ignored_dir(&child) {
                continue;
            }
            if let Some(rel) = relative_str(root, &child) {
                if set.is_match(&rel) && fs.is_file(&child.join(MANIFEST_FILE)) {
                    debug!(package = %rel, "workspace package matched");
                    packages.push(child.clone());
                }
            }
            stack.push(child);
        }
    }

    if packages.is_empty() {
        return Err(BuildError::InvalidOption(format!(
            "workspace patterns {:?} matched no package directories under {}",
            patterns,
            root.display()
        )));
    }

    packages.sort();
    Ok(packages)
}

fn is_ignored_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == "node_modules" || n.starts_with('.'))
}

fn build_dir_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat.trim_end_matches('/'))
            .literal_separator(true)
            .build()
            .map_err(|e| BuildError::InvalidOption(format!("invalid workspace pattern {pat}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildError::InvalidOption(format!("invalid workspace patterns: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn only_direct_children_with_manifest_match() {
        let fs = MockFileSystem::new();
        fs.add_file("/repo/packages/a/package.json", "{}");
        fs.add_file("/repo/packages/b/package.json", "{}");
        fs.add_file("/repo/packages/b/nested/c/package.json", "{}");
        fs.add_file("/repo/packages/docs/README.md", "");
        fs.add_file("/repo/packages/a/node_modules/x/package.json", "{}");

        let found = find_packages(&fs, Path::new("/repo"), &["packages/*".into()]).unwrap();
        assert_eq!(
            found,
            vec![PathBuf::from("/repo/packages/a"), PathBuf::from("/repo/packages/b")]
        );
    }

    #[test]
    fn no_match_is_invalid() {
        let fs = MockFileSystem::new();
        fs.add_file("/repo/package.json", "{}");
        assert!(find_packages(&fs, Path::new("/repo"), &["apps/*".into()]).is_err());
    }
}
