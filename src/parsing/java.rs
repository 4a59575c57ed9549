//! Java symbol/import extraction. Line-oriented regex matching rather than
//! tree-based traversal: javac-grade grammars drift too far from what a
//! lightweight tree-sitter grammar recovers on partially-written code, so
//! extraction reads the brace-tracked source directly.

use super::{ExtractionResult, ImportRecord, ParsedUnit};
use crate::symbol::{Parameter, Symbol};
use crate::types::{Range, SymbolKind, Visibility};
use regex::Regex;
use std::sync::LazyLock;

static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([A-Za-z0-9_.]+)\s*;").unwrap());
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+([A-Za-z0-9_.*]+)\s*;").unwrap());
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(public|private|protected)?\s*(?:abstract\s+|final\s+)?(class|interface|enum)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(public|private|protected)?\s*(static\s+)?(?:final\s+)?([A-Za-z0-9_<>\[\], ?]+)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*\{").unwrap()
});

fn parse_visibility(raw: Option<&str>) -> Visibility {
    match raw {
        Some("public") => Visibility::Public,
        Some("private") => Visibility::Private,
        Some("protected") => Visibility::Protected,
        _ => Visibility::Package,
    }
}

fn parse_parameters(params_raw: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    if params_raw.trim().is_empty() {
        return parameters;
    }
    for (index, chunk) in params_raw.split(',').enumerate() {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = chunk.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let name = tokens.last().unwrap().replace("...", "");
        let type_hint = if tokens.len() > 1 {
            Some(tokens[..tokens.len() - 1].join(" "))
        } else {
            None
        };
        parameters.push(Parameter {
            name,
            type_hint,
            position: index as u32,
            default_value: None,
        });
    }
    parameters
}

struct OpenClass {
    symbol_index: usize,
    name: String,
    depth: i32,
}

pub fn extract(parsed: &ParsedUnit) -> ExtractionResult {
    let file_path = &parsed.path;
    let mut package_name = String::new();
    let mut imports = Vec::new();
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut class_stack: Vec<OpenClass> = Vec::new();

    for (row, line) in parsed.source.lines().enumerate() {
        let index = row as u32 + 1;

        if let Some(caps) = PACKAGE_RE.captures(line) {
            package_name = caps[1].to_string();
        }

        if let Some(caps) = IMPORT_RE.captures(line) {
            let module_name = caps[1].to_string();
            imports.push(ImportRecord {
                source_file_path: file_path.clone(),
                import_statement: line.trim().to_string(),
                module_name,
                imported_names: Vec::new(),
                line_number: Some(index),
            });
        }

        if let Some(caps) = CLASS_RE.captures(line) {
            let visibility = parse_visibility(caps.get(1).map(|m| m.as_str()));
            let kind = if &caps[2] == "interface" {
                SymbolKind::Interface
            } else {
                SymbolKind::Class
            };
            let class_name = caps[3].to_string();
            let qualified_name = if package_name.is_empty() {
                class_name.clone()
            } else {
                format!("{package_name}.{class_name}")
            };
            let symbol_index = symbols.len();
            class_stack.push(OpenClass {
                symbol_index,
                name: class_name.clone(),
                depth: brace_delta(line),
            });
            symbols.push(
                Symbol::new(
                    class_name,
                    qualified_name,
                    kind,
                    file_path.clone(),
                    Range::new(index, 0, index, line.len() as u32),
                )
                .with_signature(line.trim())
                .with_visibility(visibility),
            );
            continue;
        }

        if !class_stack.is_empty() {
            if let Some(caps) = METHOD_RE.captures(line) {
                let visibility = parse_visibility(caps.get(1).map(|m| m.as_str()));
                let is_static = caps.get(2).is_some();
                let return_type = caps[3].trim().to_string();
                let method_name = caps[4].to_string();
                let parameters = parse_parameters(caps[5].trim());
                let current_class = &class_stack.last().unwrap().name;
                let class_prefix = if package_name.is_empty() {
                    current_class.clone()
                } else {
                    format!("{package_name}.{current_class}")
                };
                symbols.push(
                    Symbol::new(
                        method_name.clone(),
                        format!("{class_prefix}.{method_name}"),
                        SymbolKind::Method,
                        file_path.clone(),
                        Range::new(index, 0, index, line.len() as u32),
                    )
                    .with_signature(line.trim())
                    .with_return_type(return_type)
                    .with_visibility(visibility)
                    .with_parameters(parameters)
                    .static_flag(is_static),
                );
            }
        }

        if let Some(open) = class_stack.last_mut() {
            open.depth += brace_delta(line);
            while let Some(top) = class_stack.last() {
                if top.depth > 0 {
                    break;
                }
                let finished = class_stack.pop().unwrap();
                let range_end = index;
                if let Some(sym) = symbols.get_mut(finished.symbol_index) {
                    sym.range.end_line = range_end;
                }
            }
        }
    }

    ExtractionResult { symbols, imports }
}

fn brace_delta(line: &str) -> i32 {
    line.matches('{').count() as i32 - line.matches('}').count() as i32
}
