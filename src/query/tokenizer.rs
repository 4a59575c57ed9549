//! Cheap token estimation and tokenization shared by search ranking and
//! context packing.
//!
//! The spec's `ceil(len/3.5)` estimator stands in for a real tokenizer
//! model; `RuntimeConfig::tokenizer_model` is recorded so a future backend
//! swap (a real BPE count) has somewhere to key off, but the estimate
//! itself is model-agnostic.

/// Estimates the token count of `text` using the `len/3.5` heuristic the
/// context packer and `get_structure` budget both rely on.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f64 / 3.5).ceil() as usize
}

/// Splits on non-alphanumeric boundaries and lowercases, the same
/// normalization used for both the query side and the
/// name/qualified_name/signature side of lexical matching.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Jaccard-ish overlap: `|intersection| / |union|` over token sets, used as
/// the lexical fallback when a query isn't an exact or substring match.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let a_tokens: std::collections::HashSet<String> = tokenize(a).into_iter().collect();
    let b_tokens: std::collections::HashSet<String> = tokenize(b).into_iter().collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }
    let intersection = a_tokens.intersection(&b_tokens).count();
    let union = a_tokens.union(&b_tokens).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Count of query tokens appearing anywhere in `haystack`, used for the
/// context assembly lexical boost.
pub fn term_match_count(query_tokens: &[String], haystack: &str) -> usize {
    let haystack_tokens: std::collections::HashSet<String> = tokenize(haystack).into_iter().collect();
    query_tokens.iter().filter(|t| haystack_tokens.contains(*t)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens(&"a".repeat(7)), 2);
    }

    #[test]
    fn overlap_is_symmetric_for_identical_text() {
        assert_eq!(token_overlap("foo bar", "foo bar"), 1.0);
        assert_eq!(token_overlap("foo", "completely_unrelated"), 0.0);
    }
}
