//! Notify-based incremental re-index on file change (`bombe watch`).
//! Watches the repo root recursively, debounces bursts of filesystem
//! events, classifies survivors into [`FileChange`] records
//! by diffing against the store's known content hashes, and drives
//! [`IndexFacade::incremental_index`]. Bounded by `--max-cycles` so CI and
//! tests can run it to completion instead of forever.

mod debouncer;

pub use debouncer::Debouncer;

use crate::indexing::{content_hash, ChangeStatus, FileChange, IndexFacade, IndexStats};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to initialize filesystem watcher: {0}")]
    InitFailed(String),

    #[error("filesystem watcher channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed(e.to_string())
    }
}

/// One debounce-then-reindex cycle's outcome, reported back to the CLI so
/// `bombe watch` can print a line per cycle.
#[derive(Debug, Clone)]
pub struct WatchCycle {
    pub changed_paths: Vec<String>,
    pub stats: IndexStats,
}

/// Diffs `paths` (already debounced) against the store's known files,
/// producing `FileChange` records the same shape `incremental_index` takes
/// from any other caller. Renames are not inferred here —
/// notify surfaces create/remove independently per OS — so a rename shows
/// up as a Deleted + Added pair, which `incremental_index` handles
/// correctly, just without the rename-fidelity fast path.
fn classify(repo_root: &Path, facade: &IndexFacade, paths: &[PathBuf]) -> Vec<FileChange> {
    let mut changes = Vec::new();
    for path in paths {
        let Ok(relative) = path.strip_prefix(repo_root) else {
            continue;
        };
        let relative_path = relative.to_string_lossy().replace('\\', "/");
        if path.is_file() {
            let bytes = match std::fs::read(path) {
                Ok(b) => b,
                Err(_) => continue,
            };
            let hash = content_hash(&bytes);
            let known = facade.store.file_content_hash(&relative_path).unwrap_or(None);
            match known {
                Some(existing) if existing == hash => continue,
                Some(_) => changes.push(FileChange { status: ChangeStatus::Modified, path: relative_path, old_path: None }),
                None => changes.push(FileChange { status: ChangeStatus::Added, path: relative_path, old_path: None }),
            }
        } else {
            let known = facade.store.file_content_hash(&relative_path).unwrap_or(None);
            if known.is_some() {
                changes.push(FileChange { status: ChangeStatus::Deleted, path: relative_path, old_path: None });
            }
        }
    }
    changes
}

/// Runs the watch loop. `max_cycles = None` watches forever; `Some(n)`
/// stops after `n` re-index cycles (including cycles that found nothing to
/// do), matching the conceptual `--max-cycles` CLI flag.
pub fn run_watch(
    repo_root: &Path,
    facade: &mut IndexFacade,
    poll_interval_ms: u64,
    max_cycles: Option<usize>,
    mut on_cycle: impl FnMut(&WatchCycle),
) -> Result<(), WatchError> {
    let (tx, rx) = mpsc::channel();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    watcher.watch(repo_root, RecursiveMode::Recursive)?;

    let mut debouncer = Debouncer::new(poll_interval_ms);
    let mut cycles = 0usize;

    loop {
        match rx.recv_timeout(Duration::from_millis(poll_interval_ms)) {
            Ok(Ok(event)) => {
                for path in event.paths {
                    debouncer.record(path);
                }
            }
            Ok(Err(_)) => continue,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return Err(WatchError::ChannelClosed),
        }

        if !debouncer.has_pending() {
            if let Some(limit) = max_cycles {
                if cycles >= limit {
                    return Ok(());
                }
            }
            continue;
        }

        let ready = debouncer.take_ready();
        if ready.is_empty() {
            continue;
        }

        let changes = classify(repo_root, facade, &ready);
        if changes.is_empty() {
            continue;
        }

        let stats = facade
            .incremental_index(&changes)
            .map_err(|e| WatchError::InitFailed(e.to_string()))?;
        let changed_paths = changes.into_iter().map(|c| c.path).collect();
        let cycle = WatchCycle { changed_paths, stats };
        on_cycle(&cycle);

        cycles += 1;
        if let Some(limit) = max_cycles {
            if cycles >= limit {
                return Ok(());
            }
        }
    }
}
