// src/watch/event_handler.rs

//! Turns raw `notify` events into the set of paths worth reacting to.

use std::collections::BTreeSet;
use std::path::PathBuf;

use notify::{Event, EventKind};
use tracing::trace;

use crate::watch::filter::WatchFilter;
use crate::watch::hash::ContentHashes;

/// Accumulates paths across a debounce window.
#[derive(Debug, Default)]
pub struct ChangeBatch {
    paths: BTreeSet<PathBuf>,
}

impl ChangeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the relevant paths of one event.
    pub fn record(&mut self, event: &Event, filter: &WatchFilter) {
        if !is_content_event(&event.kind) {
            trace!(kind = ?event.kind, "ignoring non-content event");
            return;
        }
        for path in &event.paths {
            if filter.is_ignored(path) {
                trace!(path = %path.display(), "ignored by watch filter");
                continue;
            }
            self.paths.insert(path.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Drain the batch, dropping paths whose content did not change.
    pub fn take(&mut self, hashes: Option<&mut ContentHashes>) -> Vec<PathBuf> {
        let paths = std::mem::take(&mut self.paths);
        match hashes {
            Some(hashes) => paths.into_iter().filter(|p| hashes.changed(p)).collect(),
            None => paths.into_iter().collect(),
        }
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}
