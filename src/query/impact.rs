//! `change_impact`: blast radius plus one-hop inbound type dependents
//!.

use super::blast::{classify_risk, get_blast_radius, BlastHit, RiskLevel};
use super::guards::{clamp_depth, MAX_IMPACT_DEPTH};
use super::store_ext::{load_symbol, resolve_symbol, symbol_edges, EdgeDirection};
use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChangeImpactResponse {
    pub resolved_symbol: Option<String>,
    pub direct_callers: Vec<BlastHit>,
    pub transitive_callers: Vec<BlastHit>,
    pub type_dependents: Vec<BlastHit>,
    pub affected_files: Vec<String>,
    pub risk: Option<RiskLevel>,
}

pub fn change_impact(store: &GraphStore, query: &str, depth: u32) -> StorageResult<ChangeImpactResponse> {
    let depth = clamp_depth(depth, MAX_IMPACT_DEPTH);
    let blast = get_blast_radius(store, query, depth)?;
    if blast.resolved_symbol.is_none() {
        return Ok(ChangeImpactResponse::default());
    }

    let conn = store.connection();
    let Some(root) = resolve_symbol(conn, query)? else {
        return Ok(ChangeImpactResponse::default());
    };
    let Some(root_id) = root.id else {
        return Ok(ChangeImpactResponse::default());
    };

    let mut already_seen: HashSet<u32> = blast
        .direct
        .iter()
        .chain(blast.transitive.iter())
        .map(|h| h.symbol_id)
        .collect();
    already_seen.insert(root_id.to_u32());

    let mut type_dependents = Vec::new();
    let mut affected_files: HashSet<String> = blast.affected_files.iter().cloned().collect();
    for (dependent_id, _line, _confidence) in symbol_edges(
        conn,
        root_id,
        &[RelationKind::Extends, RelationKind::Implements],
        EdgeDirection::Inbound,
    )? {
        if !already_seen.insert(dependent_id.to_u32()) {
            continue;
        }
        let Some(symbol) = load_symbol(conn, dependent_id)? else { continue };
        affected_files.insert(symbol.file_path.clone());
        type_dependents.push(BlastHit {
            symbol_id: dependent_id.to_u32(),
            qualified_name: symbol.qualified_name,
            file_path: symbol.file_path,
            depth: 1,
            transitive: false,
        });
    }
    type_dependents.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));

    let mut affected_files: Vec<String> = affected_files.into_iter().collect();
    affected_files.sort();

    let total_affected = blast.direct.len() + blast.transitive.len() + type_dependents.len();
    let risk = classify_risk(total_affected);

    Ok(ChangeImpactResponse {
        resolved_symbol: blast.resolved_symbol,
        direct_callers: blast.direct,
        transitive_callers: blast.transitive,
        type_dependents,
        affected_files,
        risk: Some(risk),
    })
}
