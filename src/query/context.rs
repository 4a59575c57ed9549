//! `get_context`: the context-assembly engine. Seed
//! selection, personalised PageRank over the reached subgraph,
//! topology-first ordering, and budget-aware packing.

use super::guards::{clamp_depth, clamp_seeds, clamp_token_budget, MAX_CONTEXT_EXPANSION_DEPTH, MAX_VISITED_NODES};
use super::store_ext::{
    load_symbol, load_symbol_by_qualified_name, load_symbols_by_exact_name, read_source_snippet, symbol_edges,
    symbol_from_row, EdgeDirection,
};
use super::tokenizer::{estimate_tokens, term_match_count, tokenize};
use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use crate::symbol::Symbol;
use crate::types::SymbolId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

const UNDIRECTED_RELATIONSHIPS: [RelationKind; 5] = [
    RelationKind::Calls,
    RelationKind::ImportsSymbol,
    RelationKind::Extends,
    RelationKind::Implements,
    RelationKind::HasMethod,
];

const DAMPING: f64 = 0.85;
const PPR_ITERATIONS: usize = 20;

#[derive(Debug, Clone)]
pub struct ContextRequest {
    pub query: String,
    pub entry_points: Vec<String>,
    pub token_budget: usize,
    pub expansion_depth: u32,
    pub signatures_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedSymbol {
    pub symbol_id: u32,
    pub qualified_name: String,
    pub file_path: String,
    pub start_line: u32,
    pub kind: &'static str,
    pub body: String,
    pub is_signature_only: bool,
    pub reason: &'static str,
    pub tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedFile {
    pub path: String,
    pub symbols: Vec<PackedSymbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContextQuality {
    pub seed_hit_rate: f64,
    pub connectedness: f64,
    pub token_efficiency: f64,
    pub avg_depth: f64,
    pub dedupe_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContextResponse {
    pub files: Vec<PackedFile>,
    pub quality: ContextQuality,
    pub relationship_map: String,
}

fn select_seeds(store: &GraphStore, request: &ContextRequest) -> StorageResult<Vec<Symbol>> {
    let conn = store.connection();
    if !request.entry_points.is_empty() {
        let mut seeds = Vec::new();
        for entry in clamp_seeds(request.entry_points.clone()) {
            if let Some(symbol) = load_symbol_by_qualified_name(conn, &entry)? {
                seeds.push(symbol);
            } else {
                let mut matches = load_symbols_by_exact_name(conn, &entry)?;
                if !matches.is_empty() {
                    seeds.push(matches.remove(0));
                }
            }
        }
        return Ok(seeds);
    }

    if store.fts_available() {
        let escaped = format!("\"{}\"", request.query.replace('"', "\"\""));
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, s.qualified_name, s.kind, s.file_path, s.start_line, s.end_line,
                    s.signature, s.return_type, s.visibility, s.is_async, s.is_static, s.parent_symbol_id,
                    s.docstring, s.pagerank_score
             FROM symbol_fts
             JOIN symbols s ON s.id = symbol_fts.symbol_id
             WHERE symbol_fts MATCH ?1
             ORDER BY bm25(symbol_fts) LIMIT 8;",
        )?;
        if let Ok(rows) = stmt.query_map(rusqlite::params![escaped], |row| symbol_from_row(row)) {
            let seeds: Vec<Symbol> = rows.filter_map(|r| r.ok()).collect();
            if !seeds.is_empty() {
                return Ok(seeds);
            }
        }
    }

    let tokens = tokenize(&request.query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let like = format!("%{}%", tokens[0]);
    let mut stmt = conn.prepare(
        "SELECT id, name, qualified_name, kind, file_path, start_line, end_line, signature,
                return_type, visibility, is_async, is_static, parent_symbol_id, docstring, pagerank_score
         FROM symbols WHERE LOWER(name) LIKE ?1 OR LOWER(qualified_name) LIKE ?1
         ORDER BY pagerank_score DESC LIMIT 8;",
    )?;
    let rows = stmt.query_map(rusqlite::params![like], |row| symbol_from_row(row))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn expand_subgraph(
    store: &GraphStore,
    seeds: &[Symbol],
    expansion_depth: u32,
) -> StorageResult<HashMap<u32, u32>> {
    let conn = store.connection();
    let mut min_depth: HashMap<u32, u32> = HashMap::new();
    let mut queue: VecDeque<(SymbolId, u32)> = VecDeque::new();
    for seed in seeds {
        if let Some(id) = seed.id {
            min_depth.insert(id.to_u32(), 0);
            queue.push_back((id, 0));
        }
    }

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= expansion_depth || min_depth.len() >= MAX_VISITED_NODES {
            continue;
        }
        let mut neighbors: HashSet<u32> = HashSet::new();
        for direction in [EdgeDirection::Outbound, EdgeDirection::Inbound] {
            for (neighbor_id, _line, _confidence) in symbol_edges(conn, current, &UNDIRECTED_RELATIONSHIPS, direction)? {
                neighbors.insert(neighbor_id.to_u32());
            }
        }
        for neighbor in neighbors {
            if min_depth.len() >= MAX_VISITED_NODES {
                break;
            }
            let next_depth = depth + 1;
            let entry = min_depth.entry(neighbor).or_insert(u32::MAX);
            if next_depth < *entry {
                let was_unvisited = *entry == u32::MAX;
                *entry = next_depth;
                if was_unvisited {
                    if let Some(sid) = SymbolId::new(neighbor) {
                        queue.push_back((sid, next_depth));
                    }
                }
            }
        }
    }
    Ok(min_depth)
}

fn build_adjacency(store: &GraphStore, node_ids: &HashSet<u32>) -> StorageResult<HashMap<u32, Vec<u32>>> {
    let conn = store.connection();
    let mut adjacency: HashMap<u32, Vec<u32>> = node_ids.iter().map(|id| (*id, Vec::new())).collect();
    for &id in node_ids {
        let Some(sid) = SymbolId::new(id) else { continue };
        let mut neighbors: HashSet<u32> = HashSet::new();
        for direction in [EdgeDirection::Outbound, EdgeDirection::Inbound] {
            for (neighbor_id, _line, _confidence) in symbol_edges(conn, sid, &UNDIRECTED_RELATIONSHIPS, direction)? {
                if node_ids.contains(&neighbor_id.to_u32()) {
                    neighbors.insert(neighbor_id.to_u32());
                }
            }
        }
        adjacency.insert(id, neighbors.into_iter().collect());
    }
    Ok(adjacency)
}

fn personalized_pagerank(adjacency: &HashMap<u32, Vec<u32>>, seed_ids: &HashSet<u32>) -> HashMap<u32, f64> {
    let node_count = adjacency.len().max(1) as f64;
    let restart_mass = 1.0 / seed_ids.len().max(1) as f64;
    let mut scores: HashMap<u32, f64> = adjacency.keys().map(|id| (*id, 1.0 / node_count)).collect();

    for _ in 0..PPR_ITERATIONS {
        let mut next: HashMap<u32, f64> = adjacency
            .keys()
            .map(|id| {
                let restart = if seed_ids.contains(id) { restart_mass } else { 0.0 };
                (*id, (1.0 - DAMPING) * restart)
            })
            .collect();

        let dangling_mass: f64 = adjacency
            .iter()
            .filter(|(_, neighbors)| neighbors.is_empty())
            .map(|(id, _)| scores[id])
            .sum();
        let dangling_share = DAMPING * dangling_mass / node_count;
        for value in next.values_mut() {
            *value += dangling_share;
        }

        for (node, neighbors) in adjacency {
            if neighbors.is_empty() {
                continue;
            }
            let share = DAMPING * scores[node] / neighbors.len() as f64;
            for neighbor in neighbors {
                if let Some(v) = next.get_mut(neighbor) {
                    *v += share;
                }
            }
        }
        scores = next;
    }
    scores
}

const fn proximity(depth: u32) -> f64 {
    match depth {
        0 => 1.0,
        1 => 0.7,
        2 => 0.4,
        _ => 0.25,
    }
}

struct ScoredNode {
    symbol: Symbol,
    depth: u32,
    score: f64,
}

pub fn get_context(store: &GraphStore, repo_root: &std::path::Path, request: &ContextRequest) -> StorageResult<ContextResponse> {
    let token_budget = clamp_token_budget(request.token_budget);
    let expansion_depth = clamp_depth(request.expansion_depth, MAX_CONTEXT_EXPANSION_DEPTH);

    let seeds = select_seeds(store, request)?;
    if seeds.is_empty() {
        return Ok(ContextResponse::default());
    }
    let seed_ids: HashSet<u32> = seeds.iter().filter_map(|s| s.id).map(|id| id.to_u32()).collect();

    let min_depth = expand_subgraph(store, &seeds, expansion_depth)?;
    let node_ids: HashSet<u32> = min_depth.keys().copied().collect();
    let adjacency = build_adjacency(store, &node_ids)?;
    let ppr = personalized_pagerank(&adjacency, &seed_ids);

    let query_tokens = tokenize(&request.query);
    let conn = store.connection();
    let mut scored_nodes: HashMap<u32, ScoredNode> = HashMap::new();
    for &id in &node_ids {
        let Some(sid) = SymbolId::new(id) else { continue };
        let Some(symbol) = load_symbol(conn, sid)? else { continue };
        let depth = min_depth[&id];
        let ppr_score = *ppr.get(&id).unwrap_or(&0.0);
        let haystack = format!(
            "{} {} {}",
            symbol.name,
            symbol.qualified_name,
            symbol.signature.as_deref().unwrap_or("")
        );
        let matches = term_match_count(&query_tokens, &haystack);
        let lexical_boost = 1.0 + (0.08 * matches as f64).min(0.25);
        let score = ppr_score * symbol.pagerank_score.max(1e-9) * proximity(depth) * lexical_boost;
        scored_nodes.insert(id, ScoredNode { symbol, depth, score });
    }

    // Topology-first ordering: BFS from seeds ordered by score, then append
    // any remaining ranked nodes as rank_fallback.
    let mut ordered_seed_ids: Vec<u32> = seed_ids.iter().copied().collect();
    ordered_seed_ids.sort_by(|a, b| {
        scored_nodes
            .get(b)
            .map(|n| n.score)
            .unwrap_or(0.0)
            .partial_cmp(&scored_nodes.get(a).map(|n| n.score).unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut order: Vec<(u32, &'static str)> = Vec::new();
    let mut emitted: HashSet<u32> = HashSet::new();
    let mut bfs_queue: VecDeque<u32> = VecDeque::new();
    for id in &ordered_seed_ids {
        if emitted.insert(*id) {
            order.push((*id, "seed"));
            bfs_queue.push_back(*id);
        }
    }
    while let Some(current) = bfs_queue.pop_front() {
        let mut neighbors: Vec<u32> = adjacency.get(&current).cloned().unwrap_or_default();
        neighbors.sort_by(|a, b| {
            scored_nodes
                .get(b)
                .map(|n| n.score)
                .unwrap_or(0.0)
                .partial_cmp(&scored_nodes.get(a).map(|n| n.score).unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for neighbor in neighbors {
            if emitted.insert(neighbor) {
                order.push((neighbor, "graph_neighbor"));
                bfs_queue.push_back(neighbor);
            }
        }
    }
    let mut remaining: Vec<u32> = node_ids.iter().copied().filter(|id| !emitted.contains(id)).collect();
    remaining.sort_by(|a, b| {
        scored_nodes
            .get(b)
            .map(|n| n.score)
            .unwrap_or(0.0)
            .partial_cmp(&scored_nodes.get(a).map(|n| n.score).unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for id in remaining {
        order.push((id, "rank_fallback"));
    }

    // Budget-aware packing.
    let mut used_tokens = 0usize;
    let mut seen_bodies: HashSet<(String, String, String)> = HashSet::new();
    let mut included_seeds: HashSet<u32> = HashSet::new();
    let mut included_nodes: HashSet<u32> = HashSet::new();
    let mut depth_sum = 0u64;
    let mut packed: Vec<PackedSymbol> = Vec::new();
    let mut dedupe_hits = 0usize;
    let mut candidates_seen = 0usize;

    for (id, reason) in &order {
        let Some(node) = scored_nodes.get(id) else { continue };
        candidates_seen += 1;
        let is_seed = seed_ids.contains(id);

        let full_source = if is_seed {
            read_source_snippet(repo_root, &node.symbol.file_path, node.symbol.range.start_line, node.symbol.range.end_line)
        } else {
            None
        };

        let (body, is_signature_only) = if request.signatures_only {
            (node.symbol.signature.clone().unwrap_or_default(), true)
        } else if let Some(src) = full_source {
            (src, false)
        } else {
            (node.symbol.signature.clone().unwrap_or_default(), true)
        };

        let dedupe_key = (node.symbol.qualified_name.clone(), node.symbol.file_path.clone(), body.clone());
        if !seen_bodies.insert(dedupe_key) {
            dedupe_hits += 1;
            continue;
        }

        let tokens = estimate_tokens(&body);
        if used_tokens + tokens > token_budget {
            if is_seed && !is_signature_only {
                let sig_body = node.symbol.signature.clone().unwrap_or_default();
                let sig_tokens = estimate_tokens(&sig_body);
                if used_tokens + sig_tokens <= token_budget {
                    used_tokens += sig_tokens;
                    included_nodes.insert(*id);
                    if is_seed {
                        included_seeds.insert(*id);
                    }
                    depth_sum += node.depth as u64;
                    packed.push(PackedSymbol {
                        symbol_id: *id,
                        qualified_name: node.symbol.qualified_name.clone(),
                        file_path: node.symbol.file_path.clone(),
                        start_line: node.symbol.range.start_line,
                        kind: node.symbol.kind.as_str(),
                        body: sig_body,
                        is_signature_only: true,
                        reason,
                        tokens: sig_tokens,
                    });
                    continue;
                }
            }
            continue;
        }

        used_tokens += tokens;
        included_nodes.insert(*id);
        if is_seed {
            included_seeds.insert(*id);
        }
        depth_sum += node.depth as u64;
        packed.push(PackedSymbol {
            symbol_id: *id,
            qualified_name: node.symbol.qualified_name.clone(),
            file_path: node.symbol.file_path.clone(),
            start_line: node.symbol.range.start_line,
            kind: node.symbol.kind.as_str(),
            body,
            is_signature_only,
            reason,
            tokens,
        });
    }

    let mut by_file: HashMap<String, Vec<PackedSymbol>> = HashMap::new();
    for symbol in packed {
        by_file.entry(symbol.file_path.clone()).or_default().push(symbol);
    }
    let mut files: Vec<PackedFile> = by_file
        .into_iter()
        .map(|(path, mut symbols)| {
            symbols.sort_by_key(|s| s.start_line);
            PackedFile { path, symbols }
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let seed_hit_rate = if seed_ids.is_empty() {
        0.0
    } else {
        included_seeds.len() as f64 / seed_ids.len() as f64
    };
    let connectedness = if included_nodes.is_empty() {
        0.0
    } else {
        let reachable = connected_from_seeds(&adjacency, &included_seeds, &included_nodes);
        reachable as f64 / included_nodes.len() as f64
    };
    let token_efficiency = if token_budget == 0 { 0.0 } else { used_tokens as f64 / token_budget as f64 };
    let avg_depth = if included_nodes.is_empty() {
        0.0
    } else {
        depth_sum as f64 / included_nodes.len() as f64
    };
    let dedupe_ratio = if candidates_seen == 0 {
        0.0
    } else {
        dedupe_hits as f64 / candidates_seen as f64
    };

    let mut relationship_names: Vec<String> = order
        .iter()
        .filter_map(|(id, _)| scored_nodes.get(id).map(|n| n.symbol.name.clone()))
        .take(8)
        .collect();
    relationship_names.dedup();
    let relationship_map = relationship_names.join("\u{2192}");

    Ok(ContextResponse {
        files,
        quality: ContextQuality {
            seed_hit_rate,
            connectedness,
            token_efficiency,
            avg_depth,
            dedupe_ratio,
        },
        relationship_map,
    })
}

/// Fraction of `included` reachable from `included_seeds` through edges
/// whose both endpoints are themselves in `included`.
fn connected_from_seeds(adjacency: &HashMap<u32, Vec<u32>>, seeds: &HashSet<u32>, included: &HashSet<u32>) -> usize {
    let mut visited: HashSet<u32> = HashSet::new();
    let mut queue: VecDeque<u32> = VecDeque::new();
    for &seed in seeds {
        if included.contains(&seed) && visited.insert(seed) {
            queue.push_back(seed);
        }
    }
    while let Some(current) = queue.pop_front() {
        for neighbor in adjacency.get(&current).cloned().unwrap_or_default() {
            if included.contains(&neighbor) && visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited.len()
}
