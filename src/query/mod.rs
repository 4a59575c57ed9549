//! Query engines exposed to the MCP tool layer: lexical
//! search, reference/blast-radius/data-flow/change-impact traversal,
//! structure rendering, and context assembly, all fronted by a shared
//! TTL+LRU result cache.

pub mod blast;
pub mod context;
pub mod flow;
pub mod guards;
pub mod hybrid;
pub mod impact;
pub mod planner;
pub mod references;
pub mod search;
pub mod store_ext;
pub mod structure;
pub mod tokenizer;

pub use blast::{classify_risk, get_blast_radius, BlastHit, BlastRadiusResponse, RiskLevel};
pub use context::{get_context, ContextQuality, ContextRequest, ContextResponse, PackedFile, PackedSymbol};
pub use flow::{trace_data_flow, DataFlowResponse, FlowNode, FlowPath};
pub use impact::{change_impact, ChangeImpactResponse};
pub use planner::{CacheOutcome, QueryPlanner, QueryTrace};
pub use references::{get_references, ReferenceDirection, ReferenceHit, ReferencesResponse};
pub use search::{search_symbols, SearchHit, SearchRequest, SearchResponse};
pub use structure::get_structure;

use crate::config::RuntimeConfig;
use crate::error::StorageResult;
use crate::storage::GraphStore;
use std::path::Path;

/// Version token bumped by every mutation to the graph, used as the cache
/// key's invalidation axis so the planner never serves a stale result
/// after a re-index.
pub fn version_token(store: &GraphStore) -> StorageResult<u64> {
    let symbols = store.symbol_count()?;
    let edges = store.edge_count()?;
    let files = store.file_count()?;
    Ok(symbols.wrapping_mul(1_000_003) ^ edges.wrapping_mul(97) ^ files)
}

/// Thin facade the MCP tool handlers call into: owns nothing but a
/// reference to the store/config/planner, and dispatches each of the
/// seven tools through [`QueryPlanner::get_or_compute`].
pub struct QueryEngine<'a> {
    pub store: &'a GraphStore,
    pub repo_root: &'a Path,
    pub runtime: &'a RuntimeConfig,
    pub planner: &'a QueryPlanner,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a GraphStore, repo_root: &'a Path, runtime: &'a RuntimeConfig, planner: &'a QueryPlanner) -> Self {
        Self {
            store,
            repo_root,
            runtime,
            planner,
        }
    }

    fn version(&self) -> u64 {
        version_token(self.store).unwrap_or(0)
    }

    pub fn search_symbols(&self, request: &SearchRequest) -> StorageResult<(SearchResponse, CacheOutcome)> {
        let payload = serde_json::to_string(request).unwrap_or_default();
        let store = self.store;
        let runtime = self.runtime;
        let (value, outcome, _trace) = self.planner.get_or_compute("search_symbols", self.version(), &payload, || {
            let response = search_symbols(store, runtime, request).unwrap_or_default();
            serde_json::to_value(response).unwrap_or(serde_json::Value::Null)
        });
        Ok((serde_json::from_value(value).unwrap_or_default(), outcome))
    }

    pub fn get_references(
        &self,
        query: &str,
        direction: ReferenceDirection,
        depth: u32,
        include_snippets: bool,
    ) -> StorageResult<(ReferencesResponse, CacheOutcome)> {
        let payload = format!("{query}|{direction:?}|{depth}|{include_snippets}");
        let store = self.store;
        let repo_root = self.repo_root;
        let (value, outcome, _trace) = self.planner.get_or_compute("get_references", self.version(), &payload, || {
            let response = get_references(store, repo_root, query, direction, depth, include_snippets).unwrap_or_default();
            serde_json::to_value(response).unwrap_or(serde_json::Value::Null)
        });
        Ok((serde_json::from_value(value).unwrap_or_default(), outcome))
    }

    pub fn get_blast_radius(&self, query: &str, depth: u32) -> StorageResult<(BlastRadiusResponse, CacheOutcome)> {
        let payload = format!("{query}|{depth}");
        let store = self.store;
        let (value, outcome, _trace) = self.planner.get_or_compute("get_blast_radius", self.version(), &payload, || {
            let response = get_blast_radius(store, query, depth).unwrap_or_default();
            serde_json::to_value(response).unwrap_or(serde_json::Value::Null)
        });
        Ok((serde_json::from_value(value).unwrap_or_default(), outcome))
    }

    pub fn trace_data_flow(&self, query: &str, depth: u32) -> StorageResult<(DataFlowResponse, CacheOutcome)> {
        let payload = format!("{query}|{depth}");
        let store = self.store;
        let (value, outcome, _trace) = self.planner.get_or_compute("trace_data_flow", self.version(), &payload, || {
            let response = trace_data_flow(store, query, depth).unwrap_or_default();
            serde_json::to_value(response).unwrap_or(serde_json::Value::Null)
        });
        Ok((serde_json::from_value(value).unwrap_or_default(), outcome))
    }

    pub fn change_impact(&self, query: &str, depth: u32) -> StorageResult<(ChangeImpactResponse, CacheOutcome)> {
        let payload = format!("{query}|{depth}");
        let store = self.store;
        let (value, outcome, _trace) = self.planner.get_or_compute("change_impact", self.version(), &payload, || {
            let response = change_impact(store, query, depth).unwrap_or_default();
            serde_json::to_value(response).unwrap_or(serde_json::Value::Null)
        });
        Ok((serde_json::from_value(value).unwrap_or_default(), outcome))
    }

    pub fn get_structure(&self, path_prefix: &str, token_budget: usize) -> StorageResult<(String, CacheOutcome)> {
        let payload = format!("{path_prefix}|{token_budget}");
        let store = self.store;
        let (value, outcome, _trace) = self.planner.get_or_compute("get_structure", self.version(), &payload, || {
            let response = get_structure(store, path_prefix, token_budget).unwrap_or_default();
            serde_json::Value::String(response)
        });
        Ok((value.as_str().unwrap_or_default().to_string(), outcome))
    }

    pub fn get_context(&self, request: &ContextRequest) -> StorageResult<(ContextResponse, CacheOutcome)> {
        let payload = format!(
            "{}|{:?}|{}|{}|{}",
            request.query, request.entry_points, request.token_budget, request.expansion_depth, request.signatures_only
        );
        let store = self.store;
        let repo_root = self.repo_root;
        let (value, outcome, _trace) = self.planner.get_or_compute("get_context", self.version(), &payload, || {
            let response = get_context(store, repo_root, request).unwrap_or_default();
            serde_json::to_value(response).unwrap_or(serde_json::Value::Null)
        });
        Ok((serde_json::from_value(value).unwrap_or_default(), outcome))
    }
}
