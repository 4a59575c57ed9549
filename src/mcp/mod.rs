//! MCP tool surface: the seven tools `search_symbols`,
//! `get_references`, `get_context`, `get_structure`, `get_blast_radius`,
//! `trace_data_flow`, and `change_impact`, each wrapped by the query
//! planner's metric recording and TTL+LRU cache. Tool registration itself
//! is a thin `rmcp` shim; the real engineering is in [`crate::query`].

pub mod http;
pub mod stdio;

use crate::error::McpError as BombeMcpError;
use crate::indexing::IndexFacade;
use crate::query::{
    ContextRequest, QueryPlanner, QueryEngine, ReferenceDirection, SearchRequest,
};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

fn tool_error(reason: impl std::fmt::Display) -> McpError {
    let bombe_err = BombeMcpError::InvalidArguments { reason: reason.to_string() };
    McpError::internal_error(bombe_err.to_string(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(tool_error)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchSymbolsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub file_pattern: Option<String>,
}

fn default_search_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ReferencesParams {
    pub query: String,
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default)]
    pub include_snippets: bool,
}

fn default_direction() -> String {
    "callers".to_string()
}

fn default_depth() -> u32 {
    2
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct DepthQueryParams {
    pub query: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct StructureParams {
    pub path_prefix: String,
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
}

fn default_token_budget() -> usize {
    4_000
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ContextParams {
    pub query: String,
    #[serde(default)]
    pub entry_points: Vec<String>,
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    #[serde(default = "default_expansion_depth")]
    pub expansion_depth: u32,
    #[serde(default)]
    pub signatures_only: bool,
}

fn default_expansion_depth() -> u32 {
    2
}

fn parse_direction(s: &str) -> ReferenceDirection {
    match s {
        "callees" => ReferenceDirection::Callees,
        "both" => ReferenceDirection::Both,
        "implementors" => ReferenceDirection::Implementors,
        "supers" => ReferenceDirection::Supers,
        _ => ReferenceDirection::Callers,
    }
}

/// Owns the open [`IndexFacade`] (repo root, settings, graph store) and the
/// shared [`QueryPlanner`] cache, both wrapped for the `rmcp` async tool
/// methods below. The store is the sole mutable shared resource, so a
/// single `Mutex` — not a `RwLock` — guards it; `rusqlite::Connection`
/// isn't `Sync`, so a `RwLock<IndexFacade>` couldn't satisfy tokio's bounds
/// anyway.
#[derive(Clone)]
pub struct BombeServer {
    facade: Arc<Mutex<IndexFacade>>,
    planner: Arc<QueryPlanner>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BombeServer {
    pub fn new(facade: IndexFacade) -> Self {
        Self {
            facade: Arc::new(Mutex::new(facade)),
            planner: Arc::new(QueryPlanner::new()),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Search indexed symbols by name, qualified name, or free text, ranked by a hybrid lexical/structural/semantic score")]
    pub async fn search_symbols(
        &self,
        Parameters(params): Parameters<SearchSymbolsParams>,
    ) -> Result<CallToolResult, McpError> {
        let facade = self.facade.lock().await;
        let engine = QueryEngine::new(&facade.store, &facade.repo_root, facade.runtime(), &self.planner);
        let request = SearchRequest {
            query: params.query,
            limit: params.limit,
            kind: params.kind.as_deref().and_then(crate::types::SymbolKind::parse),
            file_pattern: params.file_pattern,
        };
        let (response, _outcome) = engine.search_symbols(&request).map_err(tool_error)?;
        json_result(&response)
    }

    #[tool(description = "Find callers, callees, implementors, or supertypes of a symbol via bounded BFS over CALLS/EXTENDS/IMPLEMENTS edges")]
    pub async fn get_references(
        &self,
        Parameters(params): Parameters<ReferencesParams>,
    ) -> Result<CallToolResult, McpError> {
        let facade = self.facade.lock().await;
        let engine = QueryEngine::new(&facade.store, &facade.repo_root, facade.runtime(), &self.planner);
        let (response, _outcome) = engine
            .get_references(&params.query, parse_direction(&params.direction), params.depth, params.include_snippets)
            .map_err(tool_error)?;
        json_result(&response)
    }

    #[tool(description = "Compute the blast radius (transitive caller set) of a symbol, classified by risk level")]
    pub async fn get_blast_radius(
        &self,
        Parameters(params): Parameters<DepthQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let facade = self.facade.lock().await;
        let engine = QueryEngine::new(&facade.store, &facade.repo_root, facade.runtime(), &self.planner);
        let (response, _outcome) = engine.get_blast_radius(&params.query, params.depth).map_err(tool_error)?;
        json_result(&response)
    }

    #[tool(description = "Trace data-flow-shaped call paths bidirectionally from a symbol")]
    pub async fn trace_data_flow(
        &self,
        Parameters(params): Parameters<DepthQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let facade = self.facade.lock().await;
        let engine = QueryEngine::new(&facade.store, &facade.repo_root, facade.runtime(), &self.planner);
        let (response, _outcome) = engine.trace_data_flow(&params.query, params.depth).map_err(tool_error)?;
        json_result(&response)
    }

    #[tool(description = "Assess the change impact of a symbol: blast radius plus one-hop type dependents")]
    pub async fn change_impact(
        &self,
        Parameters(params): Parameters<DepthQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let facade = self.facade.lock().await;
        let engine = QueryEngine::new(&facade.store, &facade.repo_root, facade.runtime(), &self.planner);
        let (response, _outcome) = engine.change_impact(&params.query, params.depth).map_err(tool_error)?;
        json_result(&response)
    }

    #[tool(description = "Render a PageRank-ordered structure map of symbols under a path prefix, packed to a token budget")]
    pub async fn get_structure(
        &self,
        Parameters(params): Parameters<StructureParams>,
    ) -> Result<CallToolResult, McpError> {
        let facade = self.facade.lock().await;
        let engine = QueryEngine::new(&facade.store, &facade.repo_root, facade.runtime(), &self.planner);
        let (text, _outcome) = engine.get_structure(&params.path_prefix, params.token_budget).map_err(tool_error)?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Assemble a token-budgeted, topology-ordered context bundle around seed symbols or a free-text query")]
    pub async fn get_context(
        &self,
        Parameters(params): Parameters<ContextParams>,
    ) -> Result<CallToolResult, McpError> {
        let facade = self.facade.lock().await;
        let engine = QueryEngine::new(&facade.store, &facade.repo_root, facade.runtime(), &self.planner);
        let request = ContextRequest {
            query: params.query,
            entry_points: params.entry_points,
            token_budget: params.token_budget,
            expansion_depth: params.expansion_depth,
            signatures_only: params.signatures_only,
        };
        let (response, _outcome) = engine.get_context(&request).map_err(tool_error)?;
        json_result(&response)
    }
}

#[tool_handler]
impl ServerHandler for BombeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bombe".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Bombe Code Retrieval".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Structure-aware retrieval over an indexed polyglot repository. Start with \
                 search_symbols to locate entry points, then get_context to assemble a \
                 token-budgeted bundle around them. Use get_references/get_blast_radius/ \
                 trace_data_flow/change_impact for targeted graph traversal, and get_structure \
                 for a PageRank-ordered overview of a path."
                    .to_string(),
            ),
        }
    }
}
