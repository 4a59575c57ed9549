//! `index-full` and `index-incremental` subcommands.

use crate::indexing::{content_hash, discover_files, ChangeStatus, FileChange, IndexFacade, IndexStats};
use std::collections::HashSet;
use std::path::Path;

/// Diffs the repo's current files against the store's known content
/// hashes, producing the same [`FileChange`] shape the watcher emits.
/// Used for `index-incremental` (a manual "catch up" run) and to build
/// the sync delta's `file_changes` section.
pub fn diff_repo(repo_root: &Path, facade: &IndexFacade) -> crate::error::IndexResult<Vec<FileChange>> {
    let discovered = discover_files(repo_root, &facade.settings);
    let mut seen = HashSet::new();
    let mut changes = Vec::new();

    for file in &discovered {
        let relative_path = file.relative_path.clone();
        seen.insert(relative_path.clone());
        let bytes = std::fs::read(&file.path)
            .map_err(|e| crate::error::IndexError::FileRead { path: file.path.clone(), source: e })?;
        let hash = content_hash(&bytes);
        let known = facade
            .store
            .file_content_hash(&relative_path)
            .map_err(crate::error::IndexError::Storage)?;
        match known {
            Some(existing) if existing == hash => {}
            Some(_) => changes.push(FileChange { status: ChangeStatus::Modified, path: relative_path, old_path: None }),
            None => changes.push(FileChange { status: ChangeStatus::Added, path: relative_path, old_path: None }),
        }
    }

    let known_paths = facade.store.known_file_paths().map_err(crate::error::IndexError::Storage)?;
    for path in known_paths {
        if !seen.contains(&path) {
            changes.push(FileChange { status: ChangeStatus::Deleted, path, old_path: None });
        }
    }

    Ok(changes)
}

fn stamp_last_indexed(facade: &IndexFacade) {
    let _ = facade.store.write_meta("last_indexed_at", &chrono::Utc::now().to_rfc3339());
}

pub fn run_full(facade: &mut IndexFacade) -> crate::error::IndexResult<IndexStats> {
    let stats = facade.full_index()?;
    stamp_last_indexed(facade);
    Ok(stats)
}

pub fn run_incremental(repo_root: &Path, facade: &mut IndexFacade) -> crate::error::IndexResult<(IndexStats, Vec<FileChange>)> {
    let changes = diff_repo(repo_root, facade)?;
    if changes.is_empty() {
        return Ok((IndexStats::default(), changes));
    }
    let stats = facade.incremental_index(&changes)?;
    stamp_last_indexed(facade);
    Ok((stats, changes))
}
