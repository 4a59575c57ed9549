//! `status` subcommand: store health as a JSON line. Reports every enabled
//! workspace root when `.bombe/workspace.json` is present, else just the
//! current repo.

use crate::indexing::IndexFacade;
use crate::workspace::Workspace;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct RootStatus {
    pub id: String,
    pub path: String,
    pub files: u64,
    pub symbols: u64,
    pub edges: u64,
    pub last_indexed_at: Option<String>,
}

#[derive(Serialize)]
pub struct StatusReport {
    pub roots: Vec<RootStatus>,
}

fn status_for(repo_root: &Path, id: &str, facade: &IndexFacade) -> crate::error::StorageResult<RootStatus> {
    Ok(RootStatus {
        id: id.to_string(),
        path: repo_root.display().to_string(),
        files: facade.store.file_count()?,
        symbols: facade.store.symbol_count()?,
        edges: facade.store.edge_count()?,
        last_indexed_at: facade.store.read_meta("last_indexed_at")?,
    })
}

pub fn run(repo_root: &Path, facade: &IndexFacade) -> crate::error::StorageResult<StatusReport> {
    if let Some(workspace_path) = Workspace::find(repo_root) {
        if let Ok(workspace) = Workspace::load(&workspace_path) {
            let mut roots = Vec::new();
            for root in workspace.enabled_roots() {
                let absolute = repo_root.join(&root.path);
                match IndexFacade::open(&absolute, facade.settings.clone()) {
                    Ok(root_facade) => roots.push(status_for(&absolute, &root.id, &root_facade)?),
                    Err(_) => roots.push(RootStatus {
                        id: root.id.clone(),
                        path: absolute.display().to_string(),
                        files: 0,
                        symbols: 0,
                        edges: 0,
                        last_indexed_at: None,
                    }),
                }
            }
            return Ok(StatusReport { roots });
        }
    }

    Ok(StatusReport { roots: vec![status_for(repo_root, "default", facade)?] })
}
