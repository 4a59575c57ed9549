//! Wire-format models for the hybrid sync engine: the delta
//! a client builds locally, and the artifact a control plane hands back.
//! Canonical form for hashing is plain `serde_json` of these structs with
//! `checksum`/`signature` stripped — `serde_json::Map` is a `BTreeMap` in
//! this crate (no `preserve_order` feature pulled in for it), so key order
//! is already canonical without any extra sorting pass.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DELTA_SCHEMA_VERSION: u32 = 1;
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

pub fn signature_hash(signature: Option<&str>) -> String {
    format!("{:x}", Sha256::digest(signature.unwrap_or("").as_bytes()))
}

/// Portable symbol identity across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolKey {
    pub qualified_name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub signature_hash: String,
}

impl SymbolKey {
    pub fn new(
        qualified_name: impl Into<String>,
        file_path: impl Into<String>,
        start_line: u32,
        end_line: u32,
        signature: Option<&str>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            file_path: file_path.into(),
            start_line,
            end_line,
            signature_hash: signature_hash(signature),
        }
    }

    pub fn from_record(record: &SymbolRecord) -> Self {
        Self::new(
            record.qualified_name.clone(),
            record.file_path.clone(),
            record.start_line,
            record.end_line,
            record.signature.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    pub position: u32,
    #[serde(rename = "type")]
    pub type_hint: Option<String>,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub qualified_name: String,
    pub kind: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub signature: Option<String>,
    pub return_type: Option<String>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_static: bool,
    pub parent_symbol_id: Option<i64>,
    pub docstring: Option<String>,
    #[serde(default)]
    pub pagerank_score: f64,
    #[serde(default)]
    pub parameters: Vec<ParameterRecord>,
}

/// Portable edge identity: `SymbolKey` endpoints, relationship, line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeContract {
    pub source: SymbolKey,
    pub target: SymbolKey,
    pub relationship: String,
    pub line_number: u32,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_provenance")]
    pub provenance: String,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_provenance() -> String {
    "local".to_string()
}

impl EdgeContract {
    pub fn key_tuple(&self) -> (SymbolKey, SymbolKey, String, u32) {
        (
            self.source.clone(),
            self.target.clone(),
            self.relationship.clone(),
            self.line_number,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChangeRecord {
    pub status: String,
    pub path: String,
    pub old_path: Option<String>,
    pub content_hash: Option<String>,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaHeader {
    pub repo_id: String,
    pub parent_snapshot: Option<String>,
    pub local_snapshot: String,
    pub tool_version: String,
    pub schema_version: u32,
    pub created_at_utc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityStats {
    pub ambiguity_rate: f64,
    pub unresolved_imports: u64,
    pub parse_failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDelta {
    pub header: DeltaHeader,
    #[serde(default)]
    pub file_changes: Vec<FileChangeRecord>,
    #[serde(default)]
    pub symbol_upserts: Vec<SymbolRecord>,
    #[serde(default)]
    pub symbol_deletes: Vec<SymbolKey>,
    #[serde(default)]
    pub edge_upserts: Vec<EdgeContract>,
    #[serde(default)]
    pub edge_deletes: Vec<EdgeContract>,
    #[serde(default)]
    pub quality_stats: QualityStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub artifact_id: String,
    pub repo_id: String,
    pub snapshot_id: String,
    pub parent_snapshot: Option<String>,
    pub tool_version: String,
    pub schema_version: u32,
    pub created_at_utc: String,
    #[serde(default)]
    pub promoted_symbols: Vec<SymbolKey>,
    #[serde(default)]
    pub promoted_edges: Vec<EdgeContract>,
    #[serde(default)]
    pub impact_priors: Vec<serde_json::Value>,
    #[serde(default)]
    pub flow_hints: Vec<serde_json::Value>,
    #[serde(default)]
    pub signature_algo: Option<String>,
    #[serde(default)]
    pub signing_key_id: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_hash_is_stable_for_none_and_some() {
        assert_eq!(signature_hash(None), signature_hash(Some("")));
        assert_ne!(signature_hash(Some("def f()")), signature_hash(None));
    }

    #[test]
    fn symbol_key_from_record_matches_manual_construction() {
        let record = SymbolRecord {
            name: "f".into(),
            qualified_name: "pkg.f".into(),
            kind: "function".into(),
            file_path: "pkg/mod.py".into(),
            start_line: 1,
            end_line: 3,
            signature: Some("def f()".into()),
            return_type: None,
            visibility: None,
            is_async: false,
            is_static: false,
            parent_symbol_id: None,
            docstring: None,
            pagerank_score: 0.0,
            parameters: Vec::new(),
        };
        let key = SymbolKey::from_record(&record);
        assert_eq!(key, SymbolKey::new("pkg.f", "pkg/mod.py", 1, 3, Some("def f()")));
    }
}
