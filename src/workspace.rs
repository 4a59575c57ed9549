//! Multi-root workspace configuration (`<repo>/.bombe/workspace.json`),
//! supplementing the single-repo CLI with a concept of several named,
//! independently enabled roots sharing one `bombe status` report.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceRoot {
    pub id: String,
    pub path: PathBuf,
    pub db_path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub roots: Vec<WorkspaceRoot>,
}

fn default_version() -> u32 {
    1
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), version: 1, roots: Vec::new() }
    }

    /// Looks for `.bombe/workspace.json` starting at `start` and walking
    /// up through ancestors, mirroring `Settings::find_workspace_config`.
    pub fn find(start: &Path) -> Option<PathBuf> {
        for ancestor in start.ancestors() {
            let candidate = ancestor.join(".bombe").join("workspace.json");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let bytes = std::fs::read(path.as_ref())?;
        serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)
    }

    pub fn enabled_roots(&self) -> impl Iterator<Item = &WorkspaceRoot> {
        self.roots.iter().filter(|r| r.enabled)
    }

    pub fn add_root(&mut self, root: WorkspaceRoot) {
        self.roots.retain(|r| r.id != root.id);
        self.roots.push(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut ws = Workspace::new("monorepo");
        ws.add_root(WorkspaceRoot {
            id: "api".into(),
            path: PathBuf::from("services/api"),
            db_path: PathBuf::from("services/api/.bombe/bombe.db"),
            enabled: true,
        });
        ws.add_root(WorkspaceRoot {
            id: "worker".into(),
            path: PathBuf::from("services/worker"),
            db_path: PathBuf::from("services/worker/.bombe/bombe.db"),
            enabled: false,
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".bombe").join("workspace.json");
        ws.save(&path).unwrap();
        let loaded = Workspace::load(&path).unwrap();

        assert_eq!(loaded.roots.len(), 2);
        assert_eq!(loaded.enabled_roots().count(), 1);
    }

    #[test]
    fn add_root_replaces_existing_id() {
        let mut ws = Workspace::new("monorepo");
        ws.add_root(WorkspaceRoot {
            id: "api".into(),
            path: PathBuf::from("a"),
            db_path: PathBuf::from("a/.bombe/bombe.db"),
            enabled: true,
        });
        ws.add_root(WorkspaceRoot {
            id: "api".into(),
            path: PathBuf::from("b"),
            db_path: PathBuf::from("b/.bombe/bombe.db"),
            enabled: false,
        });
        assert_eq!(ws.roots.len(), 1);
        assert_eq!(ws.roots[0].path, PathBuf::from("b"));
    }
}
