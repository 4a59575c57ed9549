//! `trace_data_flow`: bidirectional BFS over CALLS edges producing a node
//! set and deterministic path list.

use super::guards::{clamp_depth, MAX_FLOW_DEPTH};
use super::store_ext::{load_symbol, resolve_symbol, symbol_edges, EdgeDirection};
use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use crate::types::SymbolId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNode {
    pub symbol_id: u32,
    pub qualified_name: String,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowPath {
    pub from: String,
    pub to: String,
    pub line: Option<u32>,
    pub depth: u32,
    pub relationship: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataFlowResponse {
    pub resolved_symbol: Option<String>,
    pub nodes: Vec<FlowNode>,
    pub paths: Vec<FlowPath>,
}

pub fn trace_data_flow(store: &GraphStore, query: &str, depth: u32) -> StorageResult<DataFlowResponse> {
    let depth = clamp_depth(depth, MAX_FLOW_DEPTH);
    let conn = store.connection();
    let Some(root) = resolve_symbol(conn, query)? else {
        return Ok(DataFlowResponse::default());
    };
    let Some(root_id) = root.id else {
        return Ok(DataFlowResponse::default());
    };

    let mut min_depth: HashMap<u32, u32> = HashMap::new();
    min_depth.insert(root_id.to_u32(), 0);
    let mut queue: VecDeque<(SymbolId, u32)> = VecDeque::new();
    queue.push_back((root_id, 0));
    let mut paths: Vec<FlowPath> = Vec::new();
    let mut seen_pairs: HashSet<(u32, u32, Option<u32>)> = HashSet::new();

    while let Some((current, current_depth)) = queue.pop_front() {
        if current_depth >= depth {
            continue;
        }
        for direction in [EdgeDirection::Outbound, EdgeDirection::Inbound] {
            for (neighbor_id, line, _confidence) in
                symbol_edges(conn, current, &[RelationKind::Calls], direction)?
            {
                let (from_id, to_id) = match direction {
                    EdgeDirection::Outbound => (current, neighbor_id),
                    EdgeDirection::Inbound => (neighbor_id, current),
                };
                let dedupe_key = (from_id.to_u32(), to_id.to_u32(), line);
                if !seen_pairs.insert(dedupe_key) {
                    continue;
                }
                let Some(from_symbol) = load_symbol(conn, from_id)? else { continue };
                let Some(to_symbol) = load_symbol(conn, to_id)? else { continue };
                paths.push(FlowPath {
                    from: from_symbol.qualified_name,
                    to: to_symbol.qualified_name,
                    line,
                    depth: current_depth + 1,
                    relationship: RelationKind::Calls.as_str(),
                });

                let next_depth = current_depth + 1;
                let entry = min_depth.entry(neighbor_id.to_u32()).or_insert(u32::MAX);
                if next_depth < *entry {
                    *entry = next_depth;
                    queue.push_back((neighbor_id, next_depth));
                }
            }
        }
    }

    let mut node_ids: Vec<u32> = min_depth.keys().copied().collect();
    node_ids.sort_unstable();
    let mut nodes = Vec::with_capacity(node_ids.len());
    for id in node_ids {
        let Some(sid) = SymbolId::new(id) else { continue };
        let Some(symbol) = load_symbol(conn, sid)? else { continue };
        nodes.push(FlowNode {
            symbol_id: id,
            qualified_name: symbol.qualified_name,
            depth: min_depth[&id],
        });
    }

    paths.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.from.cmp(&b.from))
    });

    Ok(DataFlowResponse {
        resolved_symbol: Some(root.qualified_name),
        nodes,
        paths,
    })
}
