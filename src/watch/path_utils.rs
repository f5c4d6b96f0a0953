// src/watch/path_utils.rs

use std::path::{Component, Path, PathBuf};

/// `path` relative to `root` as a forward-slash string, for glob matching.
///
/// Falls back to comparing canonical paths so symlinked roots (macOS
/// `/private/var`) still relate. `None` when `path` is outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let to_slash = |rel: &Path| rel.to_string_lossy().replace('\\', "/");

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root = root.canonicalize().ok()?;
    let path = path.canonicalize().ok()?;
    path.strip_prefix(&root).ok().map(to_slash)
}

/// Canonical form of `path`, as the OS watcher reports it.
///
/// Paths that do not exist yet (an output dir before the first build) are
/// resolved through their nearest existing ancestor. Falls back to `path`
/// unchanged when nothing on the way up resolves.
pub fn canonical_or_nearest(path: &Path) -> PathBuf {
    if let Ok(found) = path.canonicalize() {
        return found;
    }

    let mut tail = Vec::new();
    let mut cur = path;
    while let Some(parent) = cur.parent() {
        if let Some(name) = cur.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(base) = parent.canonicalize() {
            return tail.iter().rev().fold(base, |acc, name| acc.join(name));
        }
        cur = parent;
    }
    path.to_path_buf()
}

/// True when any component of `rel` is a dot-directory or `node_modules`.
pub fn in_hidden_or_vendor_dir(rel: &Path) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name == "node_modules" || (name.starts_with('.') && name.len() > 1)
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_use_forward_slashes() {
        assert_eq!(
            relative_str(Path::new("/p"), Path::new("/p/src/a.ts")).as_deref(),
            Some("src/a.ts")
        );
        assert_eq!(relative_str(Path::new("/p"), Path::new("/q/a.ts")), None);
    }

    #[cfg(unix)]
    #[test]
    fn canonical_form_follows_symlinks_for_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().canonicalize().unwrap().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(canonical_or_nearest(&link), real);
        assert_eq!(canonical_or_nearest(&link.join("dist/a.mjs")), real.join("dist/a.mjs"));
        assert_eq!(canonical_or_nearest(Path::new("/no-such-root/x")), PathBuf::from("/no-such-root/x"));
    }

    #[test]
    fn hidden_and_vendor_dirs() {
        assert!(in_hidden_or_vendor_dir(Path::new(".git/HEAD")));
        assert!(in_hidden_or_vendor_dir(Path::new("a/node_modules/b/index.js")));
        assert!(!in_hidden_or_vendor_dir(Path::new("src/index.ts")));
    }
}
