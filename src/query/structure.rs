//! `get_structure`: ranks symbols under a path prefix by PageRank and
//! renders a token-budgeted tree view.

use super::store_ext::symbols_under_prefix;
use super::tokenizer::estimate_tokens;
use crate::error::StorageResult;
use crate::storage::GraphStore;
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub fn get_structure(store: &GraphStore, path_prefix: &str, token_budget: usize) -> StorageResult<String> {
    let conn = store.connection();
    let mut symbols = symbols_under_prefix(conn, path_prefix)?;
    symbols.sort_by(|a, b| {
        b.pagerank_score
            .partial_cmp(&a.pagerank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.qualified_name.cmp(&b.qualified_name))
    });

    let mut by_file: BTreeMap<String, Vec<(&crate::symbol::Symbol, usize)>> = BTreeMap::new();
    for (rank, symbol) in symbols.iter().enumerate() {
        by_file.entry(symbol.file_path.clone()).or_default().push((symbol, rank + 1));
    }

    let mut out = String::new();
    let mut used_tokens = 0usize;
    'files: for (file_path, mut entries) in by_file {
        entries.sort_by_key(|(_, rank)| *rank);
        let header = format!("{file_path}\n");
        let header_tokens = estimate_tokens(&header);
        if used_tokens + header_tokens > token_budget {
            break;
        }
        out.push_str(&header);
        used_tokens += header_tokens;

        for (symbol, rank) in entries {
            let marker = if rank <= 10 { " [TOP]" } else { "" };
            let line = format!(
                "  [rank:{rank}] {} ({}){marker}\n",
                symbol.qualified_name,
                symbol.kind.as_str()
            );
            let line_tokens = estimate_tokens(&line);
            if used_tokens + line_tokens > token_budget {
                break 'files;
            }
            let _ = write!(out, "{line}");
            used_tokens += line_tokens;
        }
    }

    Ok(out)
}
