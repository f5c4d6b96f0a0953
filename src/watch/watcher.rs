// src/watch/watcher.rs

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::watch::WatchEvent;
use crate::watch::event_handler::ChangeBatch;
use crate::watch::filter::WatchFilter;
use crate::watch::hash::ContentHashes;

/// Keeps the OS watcher and its forwarding task alive. Dropping it stops
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
    roots: Vec<PathBuf>,
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

/// Reduce `roots` to existing directories, none nested in another.
pub fn normalize_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = roots
        .into_iter()
        .map(|r| r.canonicalize().unwrap_or(r))
        .filter(|r| {
            let exists = r.exists();
            if !exists {
                warn!(path = %r.display(), "watch path does not exist; skipping");
            }
            exists
        })
        .collect();
    roots.sort();
    roots.dedup();

    let mut out: Vec<PathBuf> = Vec::new();
    for root in roots {
        if !out.iter().any(|kept| root.starts_with(kept)) {
            out.push(root);
        }
    }
    out
}

/// Watch `roots` recursively and send one [`WatchEvent::FilesChanged`] per
/// debounce window that saw relevant changes.
pub fn spawn_watcher<E>(
    roots: Vec<PathBuf>,
    filter: WatchFilter,
    mut hashes: Option<ContentHashes>,
    tx: mpsc::Sender<E>,
    debounce: Duration,
) -> Result<WatcherHandle>
where
    E: From<WatchEvent> + Send + 'static,
{
    let roots = normalize_roots(roots);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => eprintln!("tsforge: file watch error: {err}"),
        },
        Config::default(),
    )?;

    for root in &roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "watching");
    }

    if let Some(hashes) = hashes.as_mut() {
        hashes.seed(&roots);
    }

    let task = tokio::spawn(async move {
        let mut batch = ChangeBatch::new();

        while let Some(event) = event_rx.recv().await {
            batch.record(&event, &filter);
            if batch.is_empty() {
                continue;
            }

            // Keep collecting until the window passes without new events.
            loop {
                tokio::select! {
                    next = event_rx.recv() => match next {
                        Some(event) => batch.record(&event, &filter),
                        None => break,
                    },
                    _ = tokio::time::sleep(debounce) => break,
                }
            }

            let paths = batch.take(hashes.as_mut());
            if paths.is_empty() {
                debug!("change batch had no content changes");
                continue;
            }

            debug!(count = paths.len(), "files changed");
            if tx.send(WatchEvent::FilesChanged(paths).into()).await.is_err() {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
        roots,
    })
}
