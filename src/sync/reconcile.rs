//! Merges a pulled [`ArtifactBundle`] with the locally promotable content of
//! an [`IndexDelta`]: local changes win inside the set of
//! paths the delta touched, the remote artifact's content wins everywhere
//! else.

use super::checksum::artifact_checksum;
use super::models::{ArtifactBundle, IndexDelta};
use crate::error::SyncResult;
use std::collections::HashSet;

fn touched_paths(delta: &IndexDelta) -> HashSet<String> {
    let mut touched = HashSet::new();
    for change in &delta.file_changes {
        touched.insert(change.path.clone());
        if let Some(old_path) = &change.old_path {
            touched.insert(old_path.clone());
        }
    }
    for symbol in &delta.symbol_upserts {
        touched.insert(symbol.file_path.clone());
    }
    touched
}

/// Overlays `local_delta`'s promoted content onto `artifact`: entries whose
/// file path falls inside the delta's touched-paths set are replaced
/// wholesale by the local version; everything outside it is kept as-is.
pub fn reconcile_artifact(local_delta: &IndexDelta, artifact: &ArtifactBundle) -> SyncResult<ArtifactBundle> {
    let touched = touched_paths(local_delta);

    let mut merged_symbols: Vec<_> = artifact
        .promoted_symbols
        .iter()
        .filter(|s| !touched.contains(&s.file_path))
        .cloned()
        .collect();
    merged_symbols.extend(
        local_delta
            .symbol_upserts
            .iter()
            .map(super::models::SymbolKey::from_record),
    );

    let mut merged_edges: Vec<_> = artifact
        .promoted_edges
        .iter()
        .filter(|e| !touched.contains(&e.source.file_path) && !touched.contains(&e.target.file_path))
        .cloned()
        .collect();
    merged_edges.extend(
        local_delta
            .edge_upserts
            .iter()
            .filter(|e| e.confidence >= super::promotion::DEFAULT_MIN_EDGE_CONFIDENCE)
            .cloned(),
    );

    let mut reconciled = ArtifactBundle {
        promoted_symbols: merged_symbols,
        promoted_edges: merged_edges,
        checksum: None,
        signature: None,
        signature_algo: None,
        signing_key_id: None,
        ..artifact.clone()
    };
    reconciled.checksum = Some(artifact_checksum(&reconciled)?);

    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::models::{DeltaHeader, FileChangeRecord, QualityStats, SymbolKey};

    fn sample_artifact() -> ArtifactBundle {
        ArtifactBundle {
            artifact_id: "a1".into(),
            repo_id: "repo".into(),
            snapshot_id: "snap-0".into(),
            parent_snapshot: None,
            tool_version: "0.1.0".into(),
            schema_version: 1,
            created_at_utc: "2026-01-01T00:00:00Z".into(),
            promoted_symbols: vec![SymbolKey::new("pkg.old", "pkg/old.py", 1, 2, None)],
            promoted_edges: Vec::new(),
            impact_priors: Vec::new(),
            flow_hints: Vec::new(),
            signature_algo: None,
            signing_key_id: None,
            checksum: None,
            signature: None,
        }
    }

    fn delta_touching(path: &str) -> IndexDelta {
        IndexDelta {
            header: DeltaHeader {
                repo_id: "repo".into(),
                parent_snapshot: Some("snap-0".into()),
                local_snapshot: "snap-1".into(),
                tool_version: "0.1.0".into(),
                schema_version: 1,
                created_at_utc: "2026-01-02T00:00:00Z".into(),
            },
            file_changes: vec![FileChangeRecord {
                status: "M".into(),
                path: path.into(),
                old_path: None,
                content_hash: None,
                size_bytes: None,
            }],
            symbol_upserts: Vec::new(),
            symbol_deletes: Vec::new(),
            edge_upserts: Vec::new(),
            edge_deletes: Vec::new(),
            quality_stats: QualityStats::default(),
        }
    }

    #[test]
    fn untouched_artifact_content_survives() {
        let artifact = sample_artifact();
        let delta = delta_touching("pkg/new.py");
        let merged = reconcile_artifact(&delta, &artifact).unwrap();
        assert_eq!(merged.promoted_symbols.len(), 1);
        assert_eq!(merged.promoted_symbols[0].file_path, "pkg/old.py");
    }

    #[test]
    fn touched_path_drops_stale_artifact_symbol() {
        let artifact = sample_artifact();
        let delta = delta_touching("pkg/old.py");
        let merged = reconcile_artifact(&delta, &artifact).unwrap();
        assert!(merged.promoted_symbols.is_empty());
    }
}
