//! `search_symbols`: FTS + LIKE candidate generation, merged by symbol id
//! and scored with the hybrid rank.

use super::guards::{clamp_limit, clamp_query, MAX_SEARCH_LIMIT};
use super::hybrid::combined_score;
use super::store_ext::symbol_from_row;
use crate::config::RuntimeConfig;
use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use crate::symbol::Symbol;
use crate::types::{SymbolId, SymbolKind};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub kind: Option<SymbolKind>,
    pub file_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub symbol_id: u32,
    pub name: String,
    pub qualified_name: String,
    pub kind: &'static str,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub strategy: &'static str,
}

fn glob_to_like(pattern: &str) -> String {
    pattern.replace('*', "%").replace('?', "_")
}

fn fts_candidates(store: &GraphStore, query: &str, kind: Option<SymbolKind>, file_pattern: Option<&str>) -> StorageResult<Vec<Symbol>> {
    if !store.fts_available() {
        return Ok(Vec::new());
    }
    let conn = store.connection();
    let mut sql = "SELECT s.id, s.name, s.qualified_name, s.kind, s.file_path, s.start_line, s.end_line,
                s.signature, s.return_type, s.visibility, s.is_async, s.is_static, s.parent_symbol_id,
                s.docstring, s.pagerank_score, bm25(symbol_fts) AS rank
         FROM symbol_fts
         JOIN symbols s ON s.id = symbol_fts.symbol_id
         WHERE symbol_fts MATCH ?1"
        .to_string();
    if kind.is_some() {
        sql.push_str(" AND s.kind = ?2");
    }
    if file_pattern.is_some() {
        sql.push_str(if kind.is_some() { " AND s.file_path LIKE ?3" } else { " AND s.file_path LIKE ?2" });
    }
    sql.push_str(" ORDER BY rank LIMIT 200;");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(_) => return Ok(Vec::new()),
    };
    let escaped = format!("\"{}\"", query.replace('"', "\"\""));
    let mut param_values: Vec<&dyn rusqlite::ToSql> = vec![&escaped];
    let kind_str = kind.map(|k| k.as_str());
    if let Some(k) = &kind_str {
        param_values.push(k);
    }
    let like_pattern = file_pattern.map(glob_to_like);
    if let Some(p) = &like_pattern {
        param_values.push(p);
    }
    let rows = match stmt.query_map(param_values.as_slice(), |row| symbol_from_row(row)) {
        Ok(r) => r,
        Err(_) => return Ok(Vec::new()),
    };
    let mut out = Vec::new();
    for row in rows {
        if let Ok(symbol) = row {
            out.push(symbol);
        }
    }
    Ok(out)
}

fn like_candidates(store: &GraphStore, query: &str, kind: Option<SymbolKind>, file_pattern: Option<&str>) -> StorageResult<Vec<Symbol>> {
    let conn = store.connection();
    let like = format!("%{}%", query.to_lowercase());
    let mut sql = "SELECT id, name, qualified_name, kind, file_path, start_line, end_line, signature,
                return_type, visibility, is_async, is_static, parent_symbol_id, docstring, pagerank_score
         FROM symbols
         WHERE (LOWER(name) LIKE ?1 OR LOWER(qualified_name) LIKE ?1)"
        .to_string();
    if kind.is_some() {
        sql.push_str(" AND kind = ?2");
    }
    if file_pattern.is_some() {
        sql.push_str(if kind.is_some() { " AND file_path LIKE ?3" } else { " AND file_path LIKE ?2" });
    }
    sql.push_str(" LIMIT 200;");

    let mut stmt = conn.prepare(&sql)?;
    let mut param_values: Vec<&dyn rusqlite::ToSql> = vec![&like];
    let kind_str = kind.map(|k| k.as_str());
    if let Some(k) = &kind_str {
        param_values.push(k);
    }
    let like_pattern = file_pattern.map(glob_to_like);
    if let Some(p) = &like_pattern {
        param_values.push(p);
    }
    let rows = stmt.query_map(param_values.as_slice(), |row| symbol_from_row(row))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn edge_degree(store: &GraphStore, id: SymbolId) -> StorageResult<(usize, usize)> {
    let conn = store.connection();
    let callers: i64 = conn.query_row(
        "SELECT COUNT(*) FROM edges WHERE target_id = ?1 AND target_type = 'symbol' AND relationship = ?2;",
        params![id.to_u32(), RelationKind::Calls.as_str()],
        |row| row.get(0),
    )?;
    let callees: i64 = conn.query_row(
        "SELECT COUNT(*) FROM edges WHERE source_id = ?1 AND source_type = 'symbol' AND relationship = ?2;",
        params![id.to_u32(), RelationKind::Calls.as_str()],
        |row| row.get(0),
    )?;
    Ok((callers as usize, callees as usize))
}

pub fn search_symbols(store: &GraphStore, runtime: &RuntimeConfig, request: &SearchRequest) -> StorageResult<SearchResponse> {
    let query = clamp_query(&request.query);
    let limit = clamp_limit(request.limit.max(1), MAX_SEARCH_LIMIT);

    let fts = fts_candidates(store, &query, request.kind, request.file_pattern.as_deref())?;
    let strategy = if store.fts_available() { "fts+like" } else { "like" };
    let like = like_candidates(store, &query, request.kind, request.file_pattern.as_deref())?;

    let mut merged: HashSet<u32> = HashSet::new();
    let mut candidates = Vec::new();
    for symbol in fts.into_iter().chain(like.into_iter()) {
        if let Some(id) = symbol.id {
            if merged.insert(id.to_u32()) {
                candidates.push(symbol);
            }
        }
    }

    let mut scored: Vec<SearchHit> = Vec::with_capacity(candidates.len());
    for symbol in candidates {
        let Some(id) = symbol.id else { continue };
        let (callers, callees) = edge_degree(store, id)?;
        let score = combined_score(
            &query,
            &symbol,
            callers,
            callees,
            runtime.hybrid_search_enabled,
            runtime.semantic_vectors_enabled,
        );
        scored.push(SearchHit {
            symbol_id: id.to_u32(),
            name: symbol.name,
            qualified_name: symbol.qualified_name.clone(),
            kind: symbol.kind.as_str(),
            file_path: symbol.file_path.clone(),
            start_line: symbol.range.start_line,
            end_line: symbol.range.end_line,
            score,
        });
    }

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.qualified_name.cmp(&b.qualified_name))
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    scored.truncate(limit);

    Ok(SearchResponse { hits: scored, strategy })
}
