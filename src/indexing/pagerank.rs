//! Global PageRank over the symbol graph, restricted to the relationship
//! kinds that carry meaningful authority signal (call, symbol-level import,
//! inheritance). Dangling nodes redistribute their mass uniformly across
//! every node each iteration rather than only the reachable set; this is a
//! deliberate deviation from textbook PageRank that keeps disconnected
//! clusters (a standalone script, a vendored copy) from silently draining
//! score out of the graph.

use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use rusqlite::params;
use std::collections::HashMap;

const PAGERANK_RELATIONSHIPS: [RelationKind; 4] = [
    RelationKind::Calls,
    RelationKind::ImportsSymbol,
    RelationKind::Extends,
    RelationKind::Implements,
];

const DEFAULT_DAMPING: f64 = 0.85;
const DEFAULT_EPSILON: f64 = 1e-6;

/// Recomputes `symbols.pagerank_score` for every symbol in `store`, iterating
/// until the total absolute score delta between rounds falls below
/// `epsilon`. No-ops on an empty graph.
pub fn recompute_pagerank(store: &mut GraphStore) -> StorageResult<()> {
    recompute_pagerank_with(store, DEFAULT_DAMPING, DEFAULT_EPSILON)
}

pub fn recompute_pagerank_with(store: &mut GraphStore, damping: f64, epsilon: f64) -> StorageResult<()> {
    let conn = store.connection();

    let mut symbol_ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM symbols ORDER BY id;")?;
        stmt.query_map([], |row| row.get(0))?.collect::<Result<_, _>>()?
    };
    symbol_ids.sort_unstable();
    if symbol_ids.is_empty() {
        return Ok(());
    }

    let mut adjacency: HashMap<i64, Vec<i64>> = symbol_ids.iter().map(|id| (*id, Vec::new())).collect();

    let relationship_values: Vec<&'static str> =
        PAGERANK_RELATIONSHIPS.iter().map(|r| r.as_str()).collect();
    let placeholders = relationship_values
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT source_id, target_id FROM edges
         WHERE source_type = 'symbol' AND target_type = 'symbol'
           AND relationship IN ({placeholders});"
    );
    {
        let mut stmt = conn.prepare(&sql)?;
        let param_values: Vec<&dyn rusqlite::ToSql> =
            relationship_values.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(param_values.as_slice(), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (source, target) = row?;
            if let Some(targets) = adjacency.get_mut(&source) {
                if adjacency.contains_key(&target) {
                    targets.push(target);
                }
            }
        }
    }

    let node_count = symbol_ids.len() as f64;
    let base_score = 1.0 / node_count;
    let mut scores: HashMap<i64, f64> = symbol_ids.iter().map(|id| (*id, base_score)).collect();

    let mut delta = f64::INFINITY;
    while delta > epsilon {
        let mut next_scores: HashMap<i64, f64> = symbol_ids
            .iter()
            .map(|id| (*id, (1.0 - damping) / node_count))
            .collect();

        let dangling_mass: f64 = adjacency
            .iter()
            .filter(|(_, targets)| targets.is_empty())
            .map(|(id, _)| scores[id])
            .sum();
        let dangling_contrib = damping * dangling_mass / node_count;
        for id in &symbol_ids {
            *next_scores.get_mut(id).unwrap() += dangling_contrib;
        }

        for (source, targets) in &adjacency {
            if targets.is_empty() {
                continue;
            }
            let share = damping * scores[source] / targets.len() as f64;
            for target in targets {
                *next_scores.get_mut(target).unwrap() += share;
            }
        }

        delta = symbol_ids
            .iter()
            .map(|id| (next_scores[id] - scores[id]).abs())
            .sum();
        scores = next_scores;
    }

    let tx = store.connection_mut().transaction()?;
    for id in &symbol_ids {
        tx.execute(
            "UPDATE symbols SET pagerank_score = ?1 WHERE id = ?2;",
            params![scores[id], id],
        )?;
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::{Edge, NodeType};
    use crate::symbol::Symbol;
    use crate::types::{Range, SymbolKind};

    #[test]
    fn pagerank_favors_the_most_called_symbol() {
        let mut store = GraphStore::open_in_memory().unwrap();
        store
            .upsert_files(&[crate::storage::FileRecord {
                path: "m.py".into(),
                language: "python".into(),
                content_hash: "h".into(),
                size_bytes: None,
            }])
            .unwrap();
        let symbols = vec![
            Symbol::new("a", "m.a", SymbolKind::Function, "m.py", Range::new(1, 0, 2, 0)),
            Symbol::new("b", "m.b", SymbolKind::Function, "m.py", Range::new(3, 0, 4, 0)),
            Symbol::new("hot", "m.hot", SymbolKind::Function, "m.py", Range::new(5, 0, 6, 0)),
        ];
        store.replace_file_symbols("m.py", &symbols).unwrap();

        let a_id = store.symbol_id_for("m.a", "m.py").unwrap().unwrap().to_u32();
        let b_id = store.symbol_id_for("m.b", "m.py").unwrap().unwrap().to_u32();
        let hot_id = store.symbol_id_for("m.hot", "m.py").unwrap().unwrap().to_u32();

        let edges = vec![
            Edge::new(a_id, hot_id, NodeType::Symbol, NodeType::Symbol, RelationKind::Calls),
            Edge::new(b_id, hot_id, NodeType::Symbol, NodeType::Symbol, RelationKind::Calls),
        ];
        store.replace_file_edges("m.py", &edges).unwrap();

        recompute_pagerank(&mut store).unwrap();

        let hot_score: f64 = store
            .connection()
            .query_row(
                "SELECT pagerank_score FROM symbols WHERE id = ?1;",
                params![hot_id],
                |row| row.get(0),
            )
            .unwrap();
        let a_score: f64 = store
            .connection()
            .query_row(
                "SELECT pagerank_score FROM symbols WHERE id = ?1;",
                params![a_id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(hot_score > a_score);
    }
}
