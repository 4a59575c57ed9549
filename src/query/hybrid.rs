//! Hybrid lexical/structural/semantic ranking for `search_symbols`
//!.

use super::tokenizer::token_overlap;
use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub lexical: f64,
    pub structural: f64,
    pub semantic: f64,
}

pub const HYBRID_WEIGHTS: RankWeights = RankWeights {
    lexical: 0.55,
    structural: 0.35,
    semantic: 0.10,
};

/// Exact name match scores highest, then substring-in-name, then
/// substring-in-qualified_name, else token overlap against the name.
pub fn lexical_score(query: &str, symbol: &Symbol) -> f64 {
    let q = query.to_lowercase();
    let name = symbol.name.to_lowercase();
    let qualified = symbol.qualified_name.to_lowercase();
    if name == q {
        1.0
    } else if name.contains(&q) {
        0.9
    } else if qualified.contains(&q) {
        0.8
    } else {
        token_overlap(query, &symbol.name)
    }
}

/// `pagerank_score + 0.1 * log1p(callers + callees)`.
pub fn structural_score(symbol: &Symbol, callers: usize, callees: usize) -> f64 {
    symbol.pagerank_score + 0.1 * ((callers + callees) as f64).ln_1p()
}

/// Token overlap between the query and the symbol's signature+docstring;
/// a lexical stand-in for a real embedding-based semantic score
/// (`RuntimeConfig::semantic_vectors_enabled` gates whether this
/// contributes at all).
pub fn semantic_score(query: &str, symbol: &Symbol) -> f64 {
    let haystack = format!(
        "{} {}",
        symbol.signature.as_deref().unwrap_or(""),
        symbol.docstring.as_deref().unwrap_or("")
    );
    token_overlap(query, &haystack)
}

/// Combines the three components: when hybrid ranking (and therefore the
/// semantic term) is enabled, the weighted blend is used; otherwise the
/// score is pure structural rank.
pub fn combined_score(
    query: &str,
    symbol: &Symbol,
    callers: usize,
    callees: usize,
    hybrid_enabled: bool,
    semantic_enabled: bool,
) -> f64 {
    let structural = structural_score(symbol, callers, callees);
    if !hybrid_enabled {
        return structural;
    }
    let lexical = lexical_score(query, symbol);
    let semantic = if semantic_enabled { semantic_score(query, symbol) } else { 0.0 };
    HYBRID_WEIGHTS.lexical * lexical + HYBRID_WEIGHTS.structural * structural + HYBRID_WEIGHTS.semantic * semantic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Range, SymbolKind};

    #[test]
    fn exact_name_match_scores_highest() {
        let symbol = Symbol::new("run", "pkg.run", SymbolKind::Function, "pkg.py", Range::new(1, 0, 1, 0));
        assert_eq!(lexical_score("run", &symbol), 1.0);
        assert_eq!(lexical_score("ru", &symbol), 0.9);
    }
}
