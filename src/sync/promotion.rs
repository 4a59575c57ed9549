//! Turns a local [`IndexDelta`] into a promotable [`ArtifactBundle`]
//!. Gated on ambiguity rate, parse failures, and the
//! presence of promotable content; edges below `min_edge_confidence` are
//! dropped rather than promoted.

use super::checksum::artifact_checksum;
use super::models::{ArtifactBundle, EdgeContract, IndexDelta, SymbolKey, ARTIFACT_SCHEMA_VERSION};
use crate::error::SyncResult;
use std::collections::HashSet;

pub const DEFAULT_MIN_EDGE_CONFIDENCE: f64 = 0.75;
pub const DEFAULT_MAX_AMBIGUITY_RATE: f64 = 0.25;
pub const DEFAULT_MAX_PARSE_FAILURES: u64 = 0;

#[derive(Debug, Clone)]
pub struct PromotionPolicy {
    pub min_edge_confidence: f64,
    pub max_ambiguity_rate: f64,
    pub max_parse_failures: u64,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        Self {
            min_edge_confidence: DEFAULT_MIN_EDGE_CONFIDENCE,
            max_ambiguity_rate: DEFAULT_MAX_AMBIGUITY_RATE,
            max_parse_failures: DEFAULT_MAX_PARSE_FAILURES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromotionResult {
    pub promoted: bool,
    pub reason: &'static str,
    pub artifact: Option<ArtifactBundle>,
}

/// Builds a signed-less, checksummed artifact from `delta`'s upserts, or
/// rejects promotion outright if quality gates aren't met.
pub fn promote_delta(
    delta: &IndexDelta,
    artifact_id: impl Into<String>,
    created_at_utc: impl Into<String>,
    policy: &PromotionPolicy,
) -> SyncResult<PromotionResult> {
    if delta.quality_stats.ambiguity_rate > policy.max_ambiguity_rate {
        return Ok(PromotionResult {
            promoted: false,
            reason: "ambiguity_too_high",
            artifact: None,
        });
    }
    if delta.quality_stats.parse_failures > policy.max_parse_failures {
        return Ok(PromotionResult {
            promoted: false,
            reason: "parse_failures_too_high",
            artifact: None,
        });
    }

    let mut seen_symbols: HashSet<SymbolKey> = HashSet::new();
    let mut promoted_symbols = Vec::new();
    for record in &delta.symbol_upserts {
        let key = SymbolKey::from_record(record);
        if seen_symbols.insert(key.clone()) {
            promoted_symbols.push(key);
        }
    }

    let mut seen_edges: HashSet<(SymbolKey, SymbolKey, String, u32)> = HashSet::new();
    let mut promoted_edges: Vec<EdgeContract> = Vec::new();
    for edge in &delta.edge_upserts {
        if edge.confidence < policy.min_edge_confidence {
            continue;
        }
        if seen_edges.insert(edge.key_tuple()) {
            promoted_edges.push(edge.clone());
        }
    }

    if promoted_symbols.is_empty() && promoted_edges.is_empty() {
        return Ok(PromotionResult {
            promoted: false,
            reason: "no_promotable_content",
            artifact: None,
        });
    }

    let mut artifact = ArtifactBundle {
        artifact_id: artifact_id.into(),
        repo_id: delta.header.repo_id.clone(),
        snapshot_id: delta.header.local_snapshot.clone(),
        parent_snapshot: delta.header.parent_snapshot.clone(),
        tool_version: delta.header.tool_version.clone(),
        schema_version: ARTIFACT_SCHEMA_VERSION,
        created_at_utc: created_at_utc.into(),
        promoted_symbols,
        promoted_edges,
        impact_priors: Vec::new(),
        flow_hints: Vec::new(),
        signature_algo: None,
        signing_key_id: None,
        checksum: None,
        signature: None,
    };
    artifact.checksum = Some(artifact_checksum(&artifact)?);

    Ok(PromotionResult {
        promoted: true,
        reason: "promoted",
        artifact: Some(artifact),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::models::{DeltaHeader, ParameterRecord, QualityStats, SymbolRecord};

    fn symbol(name: &str) -> SymbolRecord {
        SymbolRecord {
            name: name.into(),
            qualified_name: format!("pkg.{name}"),
            kind: "function".into(),
            file_path: "pkg/mod.py".into(),
            start_line: 1,
            end_line: 2,
            signature: Some(format!("def {name}()")),
            return_type: None,
            visibility: None,
            is_async: false,
            is_static: false,
            parent_symbol_id: None,
            docstring: None,
            pagerank_score: 0.0,
            parameters: Vec::<ParameterRecord>::new(),
        }
    }

    fn delta_with(symbols: Vec<SymbolRecord>, ambiguity_rate: f64, parse_failures: u64) -> IndexDelta {
        IndexDelta {
            header: DeltaHeader {
                repo_id: "repo-a".into(),
                parent_snapshot: None,
                local_snapshot: "snap-1".into(),
                tool_version: "0.1.0".into(),
                schema_version: super::super::models::DELTA_SCHEMA_VERSION,
                created_at_utc: "2026-01-01T00:00:00Z".into(),
            },
            file_changes: Vec::new(),
            symbol_upserts: symbols,
            symbol_deletes: Vec::new(),
            edge_upserts: Vec::new(),
            edge_deletes: Vec::new(),
            quality_stats: QualityStats {
                ambiguity_rate,
                unresolved_imports: 0,
                parse_failures,
            },
        }
    }

    #[test]
    fn rejects_on_ambiguity_rate() {
        let delta = delta_with(vec![symbol("f")], 0.9, 0);
        let result = promote_delta(&delta, "a1", "2026-01-01T00:00:00Z", &PromotionPolicy::default()).unwrap();
        assert!(!result.promoted);
        assert_eq!(result.reason, "ambiguity_too_high");
    }

    #[test]
    fn rejects_empty_delta() {
        let delta = delta_with(vec![], 0.0, 0);
        let result = promote_delta(&delta, "a1", "2026-01-01T00:00:00Z", &PromotionPolicy::default()).unwrap();
        assert!(!result.promoted);
        assert_eq!(result.reason, "no_promotable_content");
    }

    #[test]
    fn promotes_and_sets_checksum() {
        let delta = delta_with(vec![symbol("f")], 0.0, 0);
        let result = promote_delta(&delta, "a1", "2026-01-01T00:00:00Z", &PromotionPolicy::default()).unwrap();
        assert!(result.promoted);
        let artifact = result.artifact.unwrap();
        assert!(artifact.checksum.is_some());
        assert_eq!(artifact.promoted_symbols.len(), 1);
    }
}
