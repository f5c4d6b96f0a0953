// src/watch/mod.rs

//! File watching and change detection.
//!
//! Turns filesystem notifications into debounced, filtered batches of
//! changed paths. It knows nothing about what a change means; the
//! coordinator decides between rebuild and restart.

pub mod event_handler;
pub mod filter;
pub mod hash;
pub mod path_utils;
pub mod watcher;

use std::path::PathBuf;
use std::time::Duration;

pub use filter::WatchFilter;
pub use hash::ContentHashes;
pub use watcher::{WatcherHandle, spawn_watcher};

/// Quiet period after the last event before a batch is sent.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    FilesChanged(Vec<PathBuf>),
}
