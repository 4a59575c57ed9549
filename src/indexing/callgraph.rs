//! Call-site detection and call-edge resolution.
//!
//! Resolution runs four tiers in order, each one only consulted if the
//! previous tier found nothing: same-file name match, import-scoped match
//! (using each file's import hints, including Python's `import x as y` and
//! `from m import x as y` aliases swapped back to the real name before
//! matching), a receiver-type hint match (`x =
//! Type(...)` / `new Type()` in the same scope, or `self.member = Type(...)`
//! followed by `self.member.method()`), and finally an unscoped global
//! fallback. Each tier's confidence drops when more than one candidate
//! ties at that tier.

use crate::parsing::{ParseTree, ParsedUnit};
use crate::relationship::{Edge, NodeType, RelationKind};
use crate::symbol::Symbol;
use crate::types::Language;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());
static PY_FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"from\s+([A-Za-z0-9_.]+)\s+import").unwrap());
static PY_FROM_IMPORT_ITEMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"from\s+[A-Za-z0-9_.]+\s+import\s+(.+)").unwrap());
static PY_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"import\s+([A-Za-z0-9_.]+)").unwrap());
static PY_IMPORT_AS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"import\s+([A-Za-z0-9_.]+)\s+as\s+([A-Za-z0-9_]+)").unwrap());
static TS_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import(?:\s+type)?\s+.*?\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static JAVA_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"import\s+([A-Za-z0-9_.*]+);").unwrap());
static GO_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static PY_INSTANTIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*=\s*([A-Z][A-Za-z0-9_]*)\s*\(").unwrap());
static TS_NEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*=\s*new\s+([A-Z][A-Za-z0-9_]*)\s*\(").unwrap());
static SELF_MEMBER_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"self\.([A-Za-z_][A-Za-z0-9_]*)\s*=\s*([A-Z][A-Za-z0-9_]*)\s*\(").unwrap());

const CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "return", "new", "function", "class", "catch",
];

struct CallSite {
    callee_name: String,
    line_number: u32,
}

fn extract_calls(parsed: &ParsedUnit) -> Vec<CallSite> {
    match (&parsed.language, &parsed.tree) {
        (Language::Python, ParseTree::PythonTree(tree)) => extract_python_calls(tree, parsed.source.as_bytes()),
        _ => extract_regex_calls(&parsed.source),
    }
}

fn extract_python_calls(tree: &tree_sitter::Tree, source: &[u8]) -> Vec<CallSite> {
    let mut sites = Vec::new();
    let mut cursor = tree.root_node().walk();
    visit_calls(&mut cursor, source, &mut sites);
    sites
}

fn visit_calls(cursor: &mut tree_sitter::TreeCursor, source: &[u8], sites: &mut Vec<CallSite>) {
    let node = cursor.node();
    if node.kind() == "call" {
        if let Some(func) = node.child_by_field_name("function") {
            let name = match func.kind() {
                "identifier" => Some(func.utf8_text(source).unwrap_or("").to_string()),
                "attribute" => func
                    .child_by_field_name("attribute")
                    .and_then(|n| n.utf8_text(source).ok())
                    .map(|s| s.to_string()),
                _ => None,
            };
            if let Some(name) = name {
                if !name.is_empty() {
                    sites.push(CallSite {
                        callee_name: name,
                        line_number: node.start_position().row as u32 + 1,
                    });
                }
            }
        }
    }
    if cursor.goto_first_child() {
        loop {
            visit_calls(cursor, source, sites);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

fn extract_regex_calls(source: &str) -> Vec<CallSite> {
    let mut sites = Vec::new();
    for (row, line) in source.lines().enumerate() {
        for cap in CALL_RE.captures_iter(line) {
            let m = cap.get(1).unwrap();
            let name = m.as_str();
            if CALL_KEYWORDS.contains(&name) {
                continue;
            }
            let prefix = line[..m.start()].trim_end();
            if prefix.ends_with("def")
                || prefix.ends_with("function")
                || prefix.ends_with("func")
                || prefix.ends_with("class")
                || prefix.ends_with("new")
            {
                continue;
            }
            sites.push(CallSite {
                callee_name: name.to_string(),
                line_number: row as u32 + 1,
            });
        }
    }
    sites
}

/// Import hints: the plain module/class tokens a line's import statement
/// exposes, plus Python `as`-aliases mapped back to their real name so an
/// alias-scoped call site (`np.array(...)` where `import numpy as np`)
/// still matches against the real module token.
fn import_hints(source: &str) -> HashSet<String> {
    let mut hints = HashSet::new();
    for line in source.lines() {
        let normalized = line.trim();

        if let Some(caps) = PY_FROM_RE.captures(normalized) {
            let value = caps[1].trim();
            hints.insert(value.to_string());
            if let Some(last) = value.split('.').next_back() {
                hints.insert(last.to_string());
            }
        }
        if normalized.starts_with("import ") {
            if let Some(caps) = PY_IMPORT_AS_RE.captures(normalized) {
                let real = caps[1].trim();
                hints.insert(real.to_string());
                if let Some(last) = real.split('.').next_back() {
                    hints.insert(last.to_string());
                }
            } else if let Some(caps) = PY_IMPORT_RE.captures(normalized) {
                let value = caps[1].trim();
                hints.insert(value.to_string());
                if let Some(last) = value.split('.').next_back() {
                    hints.insert(last.to_string());
                }
            }
        }
        if let Some(caps) = TS_IMPORT_RE.captures(normalized) {
            let value = caps[1].trim();
            hints.insert(value.to_string());
            if let Some(last) = value.split('/').next_back() {
                hints.insert(last.to_string());
            }
        }
        if let Some(caps) = JAVA_IMPORT_RE.captures(normalized) {
            let value = caps[1].trim().trim_end_matches(".*");
            hints.insert(value.to_string());
            if let Some(last) = value.split('.').next_back() {
                hints.insert(last.to_string());
            }
        }
        if normalized.starts_with("import ") && normalized.contains('"') {
            if let Some(caps) = GO_IMPORT_RE.captures(normalized) {
                let value = caps[1].trim();
                hints.insert(value.to_string());
                if let Some(last) = value.split('/').next_back() {
                    hints.insert(last.to_string());
                }
            }
        }
    }
    hints
}

/// Maps each `from module import real as alias` alias back to the real
/// name it stands for, so a call site written as `alias()` resolves
/// against the symbol actually named `real` rather than failing to match
/// anything (or, worse, matching an unrelated same-named distractor).
fn from_import_aliases(source: &str) -> HashMap<String, String> {
    let mut aliases = HashMap::new();
    for line in source.lines() {
        let normalized = line.trim();
        let Some(caps) = PY_FROM_IMPORT_ITEMS_RE.captures(normalized) else {
            continue;
        };
        let items = caps[1].trim().trim_start_matches('(').trim_end_matches(')');
        for item in items.split(',') {
            let item = item.trim();
            if let Some((real, alias)) = item.split_once(" as ") {
                aliases.insert(alias.trim().to_string(), real.trim().to_string());
            }
        }
    }
    aliases
}

/// `variable -> receiver type` hints gathered from same-scope instantiation
/// patterns: `x = Type(...)`, `x = new Type(...)`, `self.member = Type(...)`.
fn receiver_type_hints(source: &str) -> HashMap<String, String> {
    let mut hints = HashMap::new();
    for line in source.lines() {
        if let Some(caps) = PY_INSTANTIATION_RE.captures(line) {
            hints.insert(caps[1].to_string(), caps[2].to_string());
        }
        if let Some(caps) = TS_NEW_RE.captures(line) {
            hints.insert(caps[1].to_string(), caps[2].to_string());
        }
        if let Some(caps) = SELF_MEMBER_ASSIGN_RE.captures(line) {
            hints.insert(format!("self.{}", &caps[1]), caps[2].to_string());
        }
    }
    hints
}

fn caller_for_line(line_number: u32, file_symbols: &[Symbol]) -> Option<&Symbol> {
    file_symbols
        .iter()
        .filter(|s| s.range.start_line <= line_number && line_number <= s.range.end_line)
        .min_by_key(|s| s.range.end_line.saturating_sub(s.range.start_line))
}

struct Resolution<'a> {
    targets: Vec<&'a Symbol>,
    confidence: f64,
}

fn resolve_targets<'a>(
    callee_name: &str,
    caller: &Symbol,
    candidate_symbols: &'a [Symbol],
    hints: &HashSet<String>,
    receiver_hints: &HashMap<String, String>,
) -> Resolution<'a> {
    let matches: Vec<&Symbol> = candidate_symbols
        .iter()
        .filter(|s| s.name == callee_name)
        .collect();
    if matches.is_empty() {
        return Resolution {
            targets: Vec::new(),
            confidence: 0.0,
        };
    }

    // Tier 1: same file.
    let same_file: Vec<&Symbol> = matches
        .iter()
        .filter(|s| s.file_path == caller.file_path)
        .copied()
        .collect();
    if !same_file.is_empty() {
        let confidence = if same_file.len() == 1 { 1.0 } else { 0.8 };
        return Resolution {
            targets: same_file,
            confidence,
        };
    }

    // Tier 2: import-scoped.
    let import_scoped: Vec<&Symbol> = matches
        .iter()
        .filter(|s| {
            hints.iter().any(|hint| {
                !hint.is_empty()
                    && (s.qualified_name.contains(hint.as_str())
                        || s.file_path.ends_with(&format!("/{hint}.py"))
                        || s.file_path.ends_with(&format!("/{hint}.ts"))
                        || s.file_path.ends_with(&format!("/{hint}.go")))
            })
        })
        .copied()
        .collect();
    if !import_scoped.is_empty() {
        let confidence = if import_scoped.len() == 1 { 1.0 } else { 0.7 };
        return Resolution {
            targets: import_scoped,
            confidence,
        };
    }

    // Tier 3: receiver-type hint. `callee_name` here is a method name
    // reached through `receiver.method()`; the caller-file's variable ->
    // type map tells us which class's method this is, when the call
    // expression's receiver is one of the hinted variables.
    let receiver_scoped: Vec<&Symbol> = matches
        .iter()
        .filter(|s| {
            receiver_hints
                .values()
                .any(|ty| s.qualified_name.ends_with(&format!(".{ty}.{callee_name}")))
        })
        .copied()
        .collect();
    if !receiver_scoped.is_empty() {
        let confidence = if receiver_scoped.len() == 1 { 1.0 } else { 0.7 };
        return Resolution {
            targets: receiver_scoped,
            confidence,
        };
    }

    // Tier 4: global fallback.
    let confidence = if matches.len() == 1 { 1.0 } else { 0.5 };
    Resolution {
        targets: matches,
        confidence,
    }
}

/// A call edge before its logical `(qualified_name, file_path)` endpoints
/// have been resolved to store-assigned `SymbolId`s.
pub struct PendingCallEdge {
    pub edge: Edge,
    pub source_key: (String, String),
    pub target_key: (String, String),
}

/// Builds `CALLS` edges for one file, keyed by logical `(qualified_name,
/// file_path)` endpoints rather than store ids. `candidate_symbols` is the
/// full cross-file symbol set; `file_symbols` restricts caller lookup to
/// symbols declared in `parsed`'s own file. The pipeline resolves
/// `source_key`/`target_key` to `SymbolId`s once symbols have been
/// persisted.
pub fn build_pending_call_edges(
    parsed: &ParsedUnit,
    file_symbols: &[Symbol],
    candidate_symbols: &[Symbol],
) -> Vec<PendingCallEdge> {
    let callsites = extract_calls(parsed);
    let hints = import_hints(&parsed.source);
    let receiver_hints = receiver_type_hints(&parsed.source);
    let from_aliases = from_import_aliases(&parsed.source);

    let mut pending = Vec::new();
    let mut seen: HashSet<(String, String, u32)> = HashSet::new();

    for site in &callsites {
        let Some(caller) = caller_for_line(site.line_number, file_symbols) else {
            continue;
        };
        let resolved_name = from_aliases.get(&site.callee_name).map(String::as_str).unwrap_or(&site.callee_name);
        let resolution = resolve_targets(resolved_name, caller, candidate_symbols, &hints, &receiver_hints);
        for target in resolution.targets {
            let dedupe_key = (caller.qualified_name.clone(), target.qualified_name.clone(), site.line_number);
            if !seen.insert(dedupe_key) {
                continue;
            }
            let edge = Edge::new(0, 0, NodeType::Symbol, NodeType::Symbol, RelationKind::Calls)
                .with_location(parsed.path.clone(), site.line_number)
                .with_confidence(resolution.confidence);
            pending.push(PendingCallEdge {
                edge,
                source_key: caller.key(),
                target_key: target.key(),
            });
        }
    }

    pending.sort_by(|a, b| {
        (a.edge.line_number, &a.source_key, &a.target_key).cmp(&(b.edge.line_number, &b.source_key, &b.target_key))
    });
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Range, SymbolKind};

    #[test]
    fn caller_for_line_picks_innermost() {
        let outer = Symbol::new("outer", "m.outer", SymbolKind::Function, "m.py", Range::new(1, 0, 10, 0));
        let inner = Symbol::new("inner", "m.outer.inner", SymbolKind::Method, "m.py", Range::new(3, 0, 5, 0));
        let symbols = vec![outer, inner];
        let found = caller_for_line(4, &symbols).unwrap();
        assert_eq!(found.name, "inner");
    }

    #[test]
    fn from_import_aliases_maps_alias_back_to_real_name() {
        let source = "from app.auth import util as helper\n\ndef caller():\n    helper()\n";
        let aliases = from_import_aliases(source);
        assert_eq!(aliases.get("helper").map(String::as_str), Some("util"));
    }

    #[test]
    fn from_import_aliases_ignores_unaliased_items() {
        let source = "from app.auth import util, other as alt\n";
        let aliases = from_import_aliases(source);
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.get("alt").map(String::as_str), Some("other"));
        assert!(!aliases.contains_key("util"));
    }
}
