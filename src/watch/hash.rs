// src/watch/hash.rs

//! Content hashing used to drop change events that did not change content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use blake3::Hasher;
use tracing::{debug, trace};

use crate::fs::{FileSystem, walk_files};
use crate::watch::path_utils::in_hidden_or_vendor_dir;

/// blake3 hex digest of a file's content.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    hasher.update(&fs.read(path)?);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last observed hash per file.
#[derive(Debug)]
pub struct ContentHashes {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// Record the current hash of every file under `roots` so the first
    /// no-op save is recognised as such.
    pub fn seed(&mut self, roots: &[PathBuf]) {
        for root in roots {
            let files = walk_files(self.fs.as_ref(), root, |dir| {
                dir.strip_prefix(root).is_ok_and(in_hidden_or_vendor_dir)
            });
            for file in files.unwrap_or_default() {
                if let Ok(hash) = compute_file_hash(self.fs.as_ref(), &file) {
                    self.hashes.insert(file, hash);
                }
            }
        }
        debug!(files = self.hashes.len(), "seeded content hashes");
    }

    /// True when `path`'s content differs from the last observation.
    /// Removed and unreadable files always count as changed.
    pub fn changed(&mut self, path: &Path) -> bool {
        if !self.fs.is_file(path) {
            self.hashes.remove(path);
            return true;
        }
        let Ok(hash) = compute_file_hash(self.fs.as_ref(), path) else {
            return true;
        };
        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(previous) if previous == hash => {
                trace!(path = %path.display(), "content unchanged");
                false
            }
            _ => true,
        }
    }
}
