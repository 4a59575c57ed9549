//! `doctor` subcommand: parser capability, workspace config validity, and
//! schema version in one diagnostic report.

use crate::indexing::{capability_report, IndexFacade, LanguageCapability};
use crate::workspace::Workspace;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct DoctorReport {
    pub languages: Vec<LanguageReport>,
    pub workspace_config_found: bool,
    pub workspace_roots: usize,
    pub schema_version: Option<String>,
    pub fts_available: bool,
}

#[derive(Serialize)]
pub struct LanguageReport {
    pub language: String,
    pub tree_sitter_available: bool,
}

impl From<LanguageCapability> for LanguageReport {
    fn from(c: LanguageCapability) -> Self {
        Self { language: format!("{:?}", c.language), tree_sitter_available: c.tree_sitter_available }
    }
}

pub fn run(repo_root: &Path, facade: &IndexFacade) -> crate::error::StorageResult<DoctorReport> {
    let languages = capability_report().into_iter().map(LanguageReport::from).collect();

    let (workspace_config_found, workspace_roots) = match Workspace::find(repo_root) {
        Some(path) => match Workspace::load(&path) {
            Ok(ws) => (true, ws.roots.len()),
            Err(_) => (true, 0),
        },
        None => (false, 0),
    };

    Ok(DoctorReport {
        languages,
        workspace_config_found,
        workspace_roots,
        schema_version: facade.store.read_meta("schema_version")?,
        fts_available: facade.store.fts_available(),
    })
}
