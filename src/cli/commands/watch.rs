//! `watch` subcommand: drives [`crate::watcher::run_watch`] and prints one
//! JSON line per re-index cycle.

use crate::indexing::IndexFacade;
use crate::watcher::{run_watch, WatchCycle};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct WatchCycleLine {
    changed_files: usize,
    symbols_indexed: u64,
    edges_indexed: u64,
    elapsed_ms: u64,
}

impl From<&WatchCycle> for WatchCycleLine {
    fn from(cycle: &WatchCycle) -> Self {
        Self {
            changed_files: cycle.changed_paths.len(),
            symbols_indexed: cycle.stats.symbols_indexed,
            edges_indexed: cycle.stats.edges_indexed,
            elapsed_ms: cycle.stats.elapsed_ms,
        }
    }
}

/// Runs the watch loop, returning every path touched across all cycles so
/// the caller can fold it into a trailing hybrid sync when `--max-cycles`
/// bounds the run. An unbounded watch never returns, so this only matters
/// for bounded invocations (tests, CI smoke runs).
pub fn run(
    repo_root: &Path,
    facade: &mut IndexFacade,
    poll_interval_ms: u64,
    max_cycles: Option<usize>,
) -> Result<Vec<String>, crate::watcher::WatchError> {
    let mut touched = Vec::new();
    run_watch(repo_root, facade, poll_interval_ms, max_cycles, |cycle| {
        let line = WatchCycleLine::from(cycle);
        if let Ok(json) = serde_json::to_string(&line) {
            println!("{json}");
        }
        touched.extend(cycle.changed_paths.iter().cloned());
    })?;
    Ok(touched)
}
