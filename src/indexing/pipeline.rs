//! Indexing pipeline orchestration: full and incremental runs.
//!
//! Both entry points converge on [`rebuild_dependencies`], which always
//! reparses every file the store currently knows about and rewrites that
//! file's symbols/edges. A full run differs from an incremental one only in
//! how it decides which files the store should know about to begin with;
//! once the `files` table reflects reality, bringing the graph up to date is
//! the same operation either way.

use super::callgraph::build_pending_call_edges;
use super::imports::{resolve_imports, FileIdRegistry};
use super::pagerank::recompute_pagerank;
use super::walker::{content_hash, discover_files};
use crate::config::{RuntimeConfig, Settings};
use crate::error::{IndexError, IndexResult};
use crate::parsing::{extract_symbols, parse_file, ImportRecord, ParsedUnit};
use crate::project_resolver::GoModule;
use crate::relationship::Edge;
use crate::storage::{FileRecord, GraphStore};
use crate::symbol::Symbol;
use crate::types::{Language, SymbolId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

/// One file's observed change between the previous snapshot and now, the
/// shape a `git diff --name-status`-style listing (or the filesystem
/// watcher) produces.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub status: ChangeStatus,
    pub path: String,
    pub old_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "A" => Some(Self::Added),
            "M" => Some(Self::Modified),
            "D" => Some(Self::Deleted),
            "R" => Some(Self::Renamed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files_seen: u64,
    pub files_indexed: u64,
    pub symbols_indexed: u64,
    pub edges_indexed: u64,
    pub elapsed_ms: u64,
}

fn scan_repo_files(repo_root: &Path, settings: &Settings) -> IndexResult<(u64, Vec<FileRecord>)> {
    let discovered = discover_files(repo_root, settings);
    let files_seen = discovered.len() as u64;
    let mut records = Vec::with_capacity(discovered.len());
    for file in discovered {
        let bytes = std::fs::read(&file.path).map_err(|e| IndexError::FileRead {
            path: file.path.clone(),
            source: e,
        })?;
        records.push(FileRecord {
            path: file.relative_path,
            language: file.language.as_str().to_string(),
            content_hash: content_hash(&bytes),
            size_bytes: Some(bytes.len() as i64),
        });
    }
    Ok((files_seen, records))
}

fn known_files_map(store: &GraphStore) -> IndexResult<HashMap<String, Language>> {
    let conn = store.connection();
    let mut stmt = conn
        .prepare("SELECT path, language FROM files;")
        .map_err(crate::error::StorageError::from)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(crate::error::StorageError::from)?;
    let mut out = HashMap::new();
    for row in rows {
        let (path, language_name) = row.map_err(crate::error::StorageError::from)?;
        if let Some(language) = parse_language(&language_name) {
            out.insert(path, language);
        }
    }
    Ok(out)
}

fn parse_language(name: &str) -> Option<Language> {
    match name {
        "python" => Some(Language::Python),
        "java" => Some(Language::Java),
        "typescript" => Some(Language::TypeScript),
        "go" => Some(Language::Go),
        _ => None,
    }
}

fn load_all_symbols(store: &GraphStore) -> IndexResult<Vec<Symbol>> {
    let conn = store.connection();
    let mut stmt = conn
        .prepare(
            "SELECT id, name, qualified_name, kind, file_path, start_line, end_line, signature,
                    return_type, visibility, is_async, is_static, parent_symbol_id, docstring,
                    pagerank_score
             FROM symbols;",
        )
        .map_err(crate::error::StorageError::from)?;
    let rows = stmt
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let kind: String = row.get(3)?;
            let visibility: String = row.get(9)?;
            let parent: Option<i64> = row.get(12)?;
            Ok((
                id,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                kind,
                row.get::<_, String>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, u32>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<String>>(8)?,
                visibility,
                row.get::<_, bool>(10)?,
                row.get::<_, bool>(11)?,
                parent,
                row.get::<_, Option<String>>(13)?,
                row.get::<_, f64>(14)?,
            ))
        })
        .map_err(crate::error::StorageError::from)?;

    let mut symbols = Vec::new();
    for row in rows {
        let (id, name, qualified_name, kind, file_path, start_line, end_line, signature, return_type, visibility, is_async, is_static, parent, docstring, pagerank_score) =
            row.map_err(crate::error::StorageError::from)?;
        let mut symbol = Symbol::new(
            name,
            qualified_name,
            crate::types::SymbolKind::parse(&kind).unwrap_or(crate::types::SymbolKind::Function),
            file_path,
            crate::types::Range::new(start_line, 0, end_line, 0),
        );
        symbol.id = SymbolId::new(id as u32);
        symbol.signature = signature;
        symbol.return_type = return_type;
        symbol.visibility = parse_visibility(&visibility);
        symbol.is_async = is_async;
        symbol.is_static = is_static;
        symbol.parent_symbol_id = parent.and_then(|v| SymbolId::new(v as u32));
        symbol.docstring = docstring;
        symbol.pagerank_score = pagerank_score;
        symbols.push(symbol);
    }
    Ok(symbols)
}

fn parse_visibility(s: &str) -> crate::types::Visibility {
    match s {
        "private" => crate::types::Visibility::Private,
        "protected" => crate::types::Visibility::Protected,
        "package" => crate::types::Visibility::Package,
        _ => crate::types::Visibility::Public,
    }
}

/// Reparses every file currently in `store`'s `files` table and rewrites
/// its symbols and edges, then recomputes global PageRank. Returns the
/// total symbol and edge counts persisted.
fn rebuild_dependencies(
    repo_root: &Path,
    store: &mut GraphStore,
    runtime: &RuntimeConfig,
) -> IndexResult<(u64, u64)> {
    let files_map = known_files_map(store)?;
    let known_files: HashSet<String> = files_map.keys().cloned().collect();
    let go_module = GoModule::read(repo_root);

    let mut parsed_cache: HashMap<String, ParsedUnit> = HashMap::new();
    let mut imports_by_file: HashMap<String, Vec<ImportRecord>> = HashMap::new();
    let mut symbols_by_file: HashMap<String, Vec<Symbol>> = HashMap::new();
    let mut symbol_count: u64 = 0;

    let mut paths: Vec<String> = files_map.keys().cloned().collect();
    paths.sort();

    for path in &paths {
        let language = files_map[path];
        let absolute = repo_root.join(path);
        if !absolute.is_file() {
            store.delete_file_graph(path)?;
            continue;
        }
        let mut parsed = parse_file(&absolute, language, runtime)?;
        parsed.path = path.clone();
        let extraction = extract_symbols(&parsed);
        symbol_count += extraction.symbols.len() as u64;
        store.replace_file_symbols(path, &extraction.symbols)?;
        symbols_by_file.insert(path.clone(), extraction.symbols);
        imports_by_file.insert(path.clone(), extraction.imports);
        parsed_cache.insert(path.clone(), parsed);
    }

    let all_symbols = load_all_symbols(store)?;
    let mut key_to_id: HashMap<(String, String), SymbolId> = HashMap::new();
    for symbol in &all_symbols {
        if let Some(id) = symbol.id {
            key_to_id.insert(symbol.key(), id);
        }
    }

    let mut file_ids = FileIdRegistry::default();
    for path in &paths {
        if let Some(id) = store.file_id_for(path)? {
            file_ids.seed(path, id.to_u32());
        }
    }

    let mut edge_count: u64 = 0;
    for path in &paths {
        let Some(parsed) = parsed_cache.get(path) else {
            continue;
        };
        let language = files_map[path];
        let imports = imports_by_file.get(path).cloned().unwrap_or_default();
        let resolution = resolve_imports(
            repo_root,
            &mut file_ids,
            path,
            language,
            &imports,
            &known_files,
            go_module.as_ref(),
        );
        store.replace_external_deps(path, &resolution.external_deps)?;

        let file_symbols = symbols_by_file.get(path).cloned().unwrap_or_default();
        let pending = build_pending_call_edges(parsed, &file_symbols, &all_symbols);
        let mut call_edges = Vec::with_capacity(pending.len());
        for p in pending {
            let (Some(source_id), Some(target_id)) =
                (key_to_id.get(&p.source_key), key_to_id.get(&p.target_key))
            else {
                continue;
            };
            let mut edge = p.edge;
            edge.source_id = source_id.to_u32();
            edge.target_id = target_id.to_u32();
            call_edges.push(edge);
        }

        let mut combined: Vec<Edge> = resolution.edges;
        combined.extend(call_edges);
        edge_count += combined.len() as u64;
        store.replace_file_edges(path, &combined)?;
    }

    recompute_pagerank(store)?;
    Ok((symbol_count, edge_count))
}

/// Discovers every indexable file under `repo_root`, persists it, and
/// rebuilds the full symbol/edge graph from scratch.
pub fn full_index(repo_root: &Path, store: &mut GraphStore, settings: &Settings) -> IndexResult<IndexStats> {
    let started = Instant::now();
    let (files_seen, file_records) = scan_repo_files(repo_root, settings)?;
    store.upsert_files(&file_records)?;
    let files_indexed = file_records.len() as u64;

    let (symbols_indexed, edges_indexed) = rebuild_dependencies(repo_root, store, &settings.runtime)?;

    Ok(IndexStats {
        files_seen,
        files_indexed,
        symbols_indexed,
        edges_indexed,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Applies a change list (additions, modifications, deletions, renames) to
/// the `files` table, then rebuilds the graph from the resulting file set.
pub fn incremental_index(
    repo_root: &Path,
    store: &mut GraphStore,
    settings: &Settings,
    changes: &[FileChange],
) -> IndexResult<IndexStats> {
    let started = Instant::now();
    let files_seen = changes.len() as u64;
    let mut files_indexed: u64 = 0;

    for change in changes {
        match change.status {
            ChangeStatus::Deleted => {
                store.delete_file_graph(&change.path)?;
            }
            ChangeStatus::Renamed => {
                if let Some(old_path) = &change.old_path {
                    store.rename_file(old_path, &change.path)?;
                }
            }
            ChangeStatus::Added | ChangeStatus::Modified => {
                let full_path = repo_root.join(&change.path);
                if !full_path.is_file() {
                    continue;
                }
                let Some(ext) = full_path.extension().and_then(|e| e.to_str()) else {
                    continue;
                };
                let Some(language) = Language::from_extension(ext) else {
                    continue;
                };
                let bytes = std::fs::read(&full_path).map_err(|e| IndexError::FileRead {
                    path: full_path.clone(),
                    source: e,
                })?;
                store.upsert_files(&[FileRecord {
                    path: change.path.clone(),
                    language: language.as_str().to_string(),
                    content_hash: content_hash(&bytes),
                    size_bytes: Some(bytes.len() as i64),
                }])?;
                files_indexed += 1;
            }
        }
    }

    let (symbols_indexed, edges_indexed) = rebuild_dependencies(repo_root, store, &settings.runtime)?;

    Ok(IndexStats {
        files_seen,
        files_indexed,
        symbols_indexed,
        edges_indexed,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn full_index_discovers_and_links_python_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.py"),
            "def helper():\n    return 1\n\n\ndef main():\n    return helper()\n",
        )
        .unwrap();

        let settings = Settings::default();
        let mut store = GraphStore::open_in_memory().unwrap();
        let stats = full_index(dir.path(), &mut store, &settings).unwrap();

        assert_eq!(stats.files_indexed, 1);
        assert_eq!(stats.symbols_indexed, 2);
        assert!(stats.edges_indexed >= 1);
    }

    #[test]
    fn incremental_index_handles_deletion() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "def f():\n    return 1\n").unwrap();
        let settings = Settings::default();
        let mut store = GraphStore::open_in_memory().unwrap();
        full_index(dir.path(), &mut store, &settings).unwrap();
        assert_eq!(store.symbol_count().unwrap(), 1);

        std::fs::remove_file(dir.path().join("a.py")).unwrap();
        let changes = vec![FileChange {
            status: ChangeStatus::Deleted,
            path: "a.py".to_string(),
            old_path: None,
        }];
        incremental_index(dir.path(), &mut store, &settings, &changes).unwrap();
        assert_eq!(store.symbol_count().unwrap(), 0);
    }
}
