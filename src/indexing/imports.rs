//! Resolves each file's import records against the set of files known to
//! the index, producing file-to-file `IMPORTS` edges for resolved imports
//! and `ExternalDep` rows for everything that resolves outside the repo.

use crate::parsing::ImportRecord;
use crate::project_resolver::{self, GoModule};
use crate::relationship::{Edge, NodeType, RelationKind};
use crate::storage::ExternalDep;
use crate::types::Language;
use std::collections::HashSet;
use std::path::Path;

/// Maps a file path to the node id its `IMPORTS` edges should use. Replaces
/// the source's `crc32(path)` placeholder scheme: the pipeline seeds this
/// from each file's real store rowid (see [`crate::storage::GraphStore::file_id_for`])
/// once the file is known to exist, so lookups can't collide and a path
/// that hasn't been persisted yet still gets a usable, explicit id rather
/// than a hash.
#[derive(Default)]
pub struct FileIdRegistry {
    ids: std::collections::HashMap<String, u32>,
    next: u32,
}

impl FileIdRegistry {
    /// Registers `path`'s real store id, overriding any placeholder
    /// previously assigned by [`Self::id_for`].
    pub fn seed(&mut self, path: &str, id: u32) {
        self.ids.insert(path.to_string(), id);
    }

    /// Looks up `path`'s id, assigning a fresh run-local placeholder if it
    /// was never seeded (a file outside the known set, e.g. one the walker
    /// skipped).
    pub fn id_for(&mut self, path: &str) -> u32 {
        if let Some(id) = self.ids.get(path) {
            return *id;
        }
        self.next += 1;
        self.ids.insert(path.to_string(), self.next);
        self.next
    }
}

pub struct ImportResolution {
    pub edges: Vec<Edge>,
    pub external_deps: Vec<ExternalDep>,
}

#[allow(clippy::too_many_arguments)]
pub fn resolve_imports(
    repo_root: &Path,
    file_ids: &mut FileIdRegistry,
    source_path: &str,
    language: Language,
    imports: &[ImportRecord],
    known_files: &HashSet<String>,
    go_module: Option<&GoModule>,
) -> ImportResolution {
    let mut edges = Vec::new();
    let mut external_deps = Vec::new();
    let source_id = file_ids.id_for(source_path);

    for import in imports {
        let resolved = project_resolver::resolve_module(
            repo_root,
            language,
            source_path,
            &import.module_name,
            known_files,
            go_module,
        );

        match resolved {
            Some(target_path) => {
                let target_id = file_ids.id_for(&target_path);
                let mut edge = Edge::new(
                    source_id,
                    target_id,
                    NodeType::File,
                    NodeType::File,
                    RelationKind::Imports,
                )
                .with_confidence(1.0);
                if let Some(line) = import.line_number {
                    edge = edge.with_location(source_path, line);
                }
                edges.push(edge);
            }
            None => {
                external_deps.push(ExternalDep {
                    file_path: source_path.to_string(),
                    import_statement: import.import_statement.clone(),
                    module_name: import.module_name.clone(),
                    line_number: import.line_number,
                });
            }
        }
    }

    ImportResolution { edges, external_deps }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_registry_is_stable() {
        let mut registry = FileIdRegistry::default();
        let a = registry.id_for("a.py");
        let b = registry.id_for("b.py");
        assert_ne!(a, b);
        assert_eq!(registry.id_for("a.py"), a);
    }
}
