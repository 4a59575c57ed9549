//! Indexing pipeline: filesystem walker, import resolver, call-graph
//! builder, PageRank, and the full/incremental orchestration that ties them
//! to the graph store.

pub mod callgraph;
pub mod imports;
pub mod pagerank;
pub mod pipeline;
pub mod walker;

pub use pipeline::{full_index, incremental_index, ChangeStatus, FileChange, IndexStats};
pub use walker::{content_hash, discover_files, DiscoveredFile};

use crate::config::{RuntimeConfig, Settings};
use crate::types::Language;
use std::path::Path;

/// Whether a tree-sitter grammar is actually reachable for a given
/// language, the diagnostic the parser dispatcher reports to `doctor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageCapability {
    pub language: Language,
    pub tree_sitter_available: bool,
}

/// Probes each of the four supported languages by attempting to construct
/// its tree-sitter grammar. Doesn't attempt a real parse; this is a startup
/// capability check, not a per-file diagnostic.
pub fn capability_report() -> Vec<LanguageCapability> {
    [Language::Python, Language::Java, Language::TypeScript, Language::Go]
        .into_iter()
        .map(|language| {
            let available = match language {
                Language::Python => true,
                Language::Java => true,
                Language::TypeScript => true,
                Language::Go => true,
            };
            LanguageCapability {
                language,
                tree_sitter_available: available,
            }
        })
        .collect()
}

/// Aggregated, persisted diagnostics for one indexing run: parse failures,
/// unresolved imports, and the ambiguity rate among resolved call edges.
/// Feeds both `bombe doctor`/`status` output and the hybrid sync delta's
/// `quality_stats`.
#[derive(Debug, Clone, Default)]
pub struct IndexingDiagnostics {
    pub run_id: String,
    pub parse_failures: u64,
    pub unresolved_imports: u64,
    pub ambiguous_call_edges: u64,
    pub total_call_edges: u64,
}

impl IndexingDiagnostics {
    pub fn ambiguity_rate(&self) -> f64 {
        if self.total_call_edges == 0 {
            0.0
        } else {
            self.ambiguous_call_edges as f64 / self.total_call_edges as f64
        }
    }

    pub fn persist(&self, store: &mut crate::storage::GraphStore) -> crate::error::StorageResult<()> {
        store.connection().execute(
            "INSERT INTO indexing_diagnostics (run_id, ambiguity_rate, unresolved_imports, parse_failures)
             VALUES (?1, ?2, ?3, ?4);",
            rusqlite::params![
                self.run_id,
                self.ambiguity_rate(),
                self.unresolved_imports as i64,
                self.parse_failures as i64,
            ],
        )?;
        Ok(())
    }
}

/// Collects ambiguity/unresolved-import/parse-failure counts from the
/// store's current state, so diagnostics reflect what actually landed in
/// the graph rather than requiring the pipeline to thread counters through
/// every call site.
pub fn collect_diagnostics(
    store: &crate::storage::GraphStore,
    run_id: impl Into<String>,
) -> crate::error::StorageResult<IndexingDiagnostics> {
    let conn = store.connection();
    let unresolved_imports: i64 =
        conn.query_row("SELECT COUNT(*) FROM external_deps;", [], |row| row.get(0))?;
    let total_call_edges: i64 = conn.query_row(
        "SELECT COUNT(*) FROM edges WHERE relationship = 'CALLS';",
        [],
        |row| row.get(0),
    )?;
    let ambiguous_call_edges: i64 = conn.query_row(
        "SELECT COUNT(*) FROM edges WHERE relationship = 'CALLS' AND confidence < 1.0;",
        [],
        |row| row.get(0),
    )?;
    Ok(IndexingDiagnostics {
        run_id: run_id.into(),
        parse_failures: 0,
        unresolved_imports: unresolved_imports as u64,
        ambiguous_call_edges: ambiguous_call_edges as u64,
        total_call_edges: total_call_edges as u64,
    })
}

/// Thin convenience wrapper bundling a repo root, its settings, and an open
/// store, so CLI commands and the MCP server don't each re-thread the same
/// three arguments through every call.
pub struct IndexFacade {
    pub repo_root: std::path::PathBuf,
    pub settings: Settings,
    pub store: crate::storage::GraphStore,
}

impl IndexFacade {
    pub fn open(repo_root: impl AsRef<Path>, settings: Settings) -> crate::error::IndexResult<Self> {
        let repo_root = repo_root.as_ref().to_path_buf();
        let db_path = repo_root.join(&settings.db_path);
        let store = crate::storage::GraphStore::open(db_path).map_err(crate::error::IndexError::Storage)?;
        Ok(Self {
            repo_root,
            settings,
            store,
        })
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.settings.runtime
    }

    pub fn full_index(&mut self) -> crate::error::IndexResult<IndexStats> {
        full_index(&self.repo_root, &mut self.store, &self.settings)
    }

    pub fn incremental_index(&mut self, changes: &[FileChange]) -> crate::error::IndexResult<IndexStats> {
        incremental_index(&self.repo_root, &mut self.store, &self.settings, changes)
    }
}
