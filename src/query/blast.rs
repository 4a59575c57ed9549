//! `get_blast_radius`: inbound CALLS BFS classified into direct (depth 1)
//! and transitive (depth > 1) callers, with a risk tier.

use super::store_ext::{load_symbol, resolve_symbol, symbol_edges, EdgeDirection};
use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use crate::types::SymbolId;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

pub fn classify_risk(affected_count: usize) -> RiskLevel {
    if affected_count >= 10 {
        RiskLevel::High
    } else if affected_count >= 3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastHit {
    pub symbol_id: u32,
    pub qualified_name: String,
    pub file_path: String,
    pub depth: u32,
    pub transitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlastRadiusResponse {
    pub resolved_symbol: Option<String>,
    pub direct: Vec<BlastHit>,
    pub transitive: Vec<BlastHit>,
    pub affected_files: Vec<String>,
    pub risk: Option<RiskLevel>,
}

pub fn get_blast_radius(store: &GraphStore, query: &str, max_depth: u32) -> StorageResult<BlastRadiusResponse> {
    let conn = store.connection();
    let Some(root) = resolve_symbol(conn, query)? else {
        return Ok(BlastRadiusResponse::default());
    };
    let Some(root_id) = root.id else {
        return Ok(BlastRadiusResponse::default());
    };

    let mut visited: HashSet<u32> = HashSet::new();
    visited.insert(root_id.to_u32());
    let mut queue: VecDeque<(SymbolId, u32)> = VecDeque::new();
    queue.push_back((root_id, 0));

    let mut direct = Vec::new();
    let mut transitive = Vec::new();
    let mut affected_files: HashSet<String> = HashSet::new();

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for (caller_id, _line, _confidence) in
            symbol_edges(conn, current, &[RelationKind::Calls], EdgeDirection::Inbound)?
        {
            if !visited.insert(caller_id.to_u32()) {
                continue;
            }
            let Some(symbol) = load_symbol(conn, caller_id)? else {
                continue;
            };
            affected_files.insert(symbol.file_path.clone());
            let hit = BlastHit {
                symbol_id: caller_id.to_u32(),
                qualified_name: symbol.qualified_name,
                file_path: symbol.file_path,
                depth: depth + 1,
                transitive: depth + 1 > 1,
            };
            if hit.transitive {
                transitive.push(hit);
            } else {
                direct.push(hit);
            }
            queue.push_back((caller_id, depth + 1));
        }
    }

    direct.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    transitive.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.qualified_name.cmp(&b.qualified_name)));
    let mut affected_files: Vec<String> = affected_files.into_iter().collect();
    affected_files.sort();

    let risk = classify_risk(direct.len() + transitive.len());

    Ok(BlastRadiusResponse {
        resolved_symbol: Some(root.qualified_name),
        direct,
        transitive,
        affected_files,
        risk: Some(risk),
    })
}
