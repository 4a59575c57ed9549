//! `get_references`: BFS over call/inheritance edges from a resolved
//! symbol.

use super::guards::{clamp_depth, MAX_REFERENCE_DEPTH};
use super::store_ext::{resolve_symbol, symbol_edges, EdgeDirection};
use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use crate::types::SymbolId;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDirection {
    Callers,
    Callees,
    Both,
    Implementors,
    Supers,
}

impl ReferenceDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "callers" => Some(Self::Callers),
            "callees" => Some(Self::Callees),
            "both" => Some(Self::Both),
            "implementors" => Some(Self::Implementors),
            "supers" => Some(Self::Supers),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceHit {
    pub symbol_id: u32,
    pub qualified_name: String,
    pub file_path: String,
    pub depth: u32,
    pub line: Option<u32>,
    pub reference_reason: String,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReferencesResponse {
    pub resolved_symbol: Option<String>,
    pub hits: Vec<ReferenceHit>,
}

pub fn get_references(
    store: &GraphStore,
    repo_root: &std::path::Path,
    query: &str,
    direction: ReferenceDirection,
    depth: u32,
    include_snippets: bool,
) -> StorageResult<ReferencesResponse> {
    let depth = clamp_depth(depth, MAX_REFERENCE_DEPTH);
    let conn = store.connection();
    let Some(root) = resolve_symbol(conn, query)? else {
        return Ok(ReferencesResponse::default());
    };
    let Some(root_id) = root.id else {
        return Ok(ReferencesResponse::default());
    };

    let (relationships, edge_direction, label): (Vec<RelationKind>, Vec<EdgeDirection>, &str) = match direction {
        ReferenceDirection::Callers => (vec![RelationKind::Calls], vec![EdgeDirection::Inbound], "calls this"),
        ReferenceDirection::Callees => (vec![RelationKind::Calls], vec![EdgeDirection::Outbound], "called by this"),
        ReferenceDirection::Both => (
            vec![RelationKind::Calls],
            vec![EdgeDirection::Inbound, EdgeDirection::Outbound],
            "related by call edge",
        ),
        ReferenceDirection::Implementors => (
            vec![RelationKind::Implements, RelationKind::Extends],
            vec![EdgeDirection::Inbound],
            "implements/extends this",
        ),
        ReferenceDirection::Supers => (
            vec![RelationKind::Implements, RelationKind::Extends],
            vec![EdgeDirection::Outbound],
            "implemented/extended by this",
        ),
    };

    let mut visited: HashSet<u32> = HashSet::new();
    visited.insert(root_id.to_u32());
    let mut queue: VecDeque<(SymbolId, u32)> = VecDeque::new();
    queue.push_back((root_id, 0));
    let mut hits = Vec::new();

    while let Some((current, current_depth)) = queue.pop_front() {
        if current_depth >= depth {
            continue;
        }
        let mut neighbors = Vec::new();
        for dir in &edge_direction {
            neighbors.extend(symbol_edges(conn, current, &relationships, *dir)?);
        }
        for (neighbor_id, line, _confidence) in neighbors {
            if !visited.insert(neighbor_id.to_u32()) {
                continue;
            }
            let Some(symbol) = super::store_ext::load_symbol(conn, neighbor_id)? else {
                continue;
            };
            let snippet = if include_snippets {
                super::store_ext::read_source_snippet(
                    repo_root,
                    &symbol.file_path,
                    symbol.range.start_line,
                    symbol.range.end_line,
                )
            } else {
                None
            };
            hits.push(ReferenceHit {
                symbol_id: neighbor_id.to_u32(),
                qualified_name: symbol.qualified_name,
                file_path: symbol.file_path,
                depth: current_depth + 1,
                line,
                reference_reason: label.to_string(),
                snippet,
            });
            queue.push_back((neighbor_id, current_depth + 1));
        }
    }

    hits.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.qualified_name.cmp(&b.qualified_name)));

    Ok(ReferencesResponse {
        resolved_symbol: Some(root.qualified_name),
        hits,
    })
}
