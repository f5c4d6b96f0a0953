#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tsforge::config::UserOptions;

/// A throwaway project directory.
pub struct TestProject {
    _dir: TempDir,
    root: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        // Canonical so assertions compare against resolved config paths.
        let root = dir.path().canonicalize().expect("canonicalize temp dir");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write test file");
        path
    }

    pub fn with_file(self, rel: &str, contents: &str) -> Self {
        self.write(rel, contents);
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    /// Like [`read`](Self::read) but `None` while the file is missing.
    pub fn try_read(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.path(rel)).ok()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Options rooted at this project, with config discovery enabled.
    pub fn options(&self) -> UserOptions {
        UserOptions {
            cwd: Some(self.root.clone()),
            silent: Some(true),
            ..Default::default()
        }
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
