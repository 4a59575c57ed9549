//! TypeScript symbol/import extraction, line-oriented regex matching for
//! the same reason as [`super::java`]: JSX/decorators/generics make a
//! tree-sitter-driven extractor brittle against real-world style variance.

use super::{to_module_name, ExtractionResult, ImportRecord, ParsedUnit};
use crate::symbol::{Parameter, Symbol};
use crate::types::{Range, SymbolKind, Visibility};
use regex::Regex;
use std::sync::LazyLock;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import(?:\s+type)?\s+.*?\s+from\s+['"]([^'"]+)['"];?"#).unwrap()
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(class|interface|type)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(?::\s*([^{]+))?").unwrap()
});
static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:async\s+)?\(([^)]*)\)\s*(?::\s*([^=]+))?\s*=>").unwrap()
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:public|private|protected)?\s*(?:async\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(?::\s*([^=]+))?\s*\{?").unwrap()
});
static CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?const\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*[^=].*;").unwrap()
});

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
        let (name, type_hint) = if let Some((before, after)) = chunk.split_once(':') {
            (before.trim().to_string(), Some(after.trim().to_string()))
        } else {
            (chunk.to_string(), None)
        };
        if !name.is_empty() {
            parameters.push(Parameter {
                name,
                type_hint,
                position: index as u32,
                default_value: None,
            });
        }
    }
    parameters
}

fn normalize_type(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().trim_end_matches(';').to_string())
        .filter(|s| !s.is_empty())
}

fn brace_delta(line: &str) -> i32 {
    line.matches('{').count() as i32 - line.matches('}').count() as i32
}

pub fn extract(parsed: &ParsedUnit) -> ExtractionResult {
    let file_path = &parsed.path;
    let module_name = to_module_name(file_path);
    let mut imports = Vec::new();
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut class_stack: Vec<(String, i32)> = Vec::new();

    for (row, line) in parsed.source.lines().enumerate() {
        let index = row as u32 + 1;

        if let Some(caps) = IMPORT_RE.captures(line) {
            let module = caps[1].to_string();
            imports.push(ImportRecord {
                source_file_path: file_path.clone(),
                import_statement: line.trim().to_string(),
                module_name: module,
                imported_names: Vec::new(),
                line_number: Some(index),
            });
        }

        if let Some(caps) = CLASS_RE.captures(line) {
            let raw_kind = &caps[1];
            let kind = if raw_kind == "interface" || raw_kind == "type" {
                SymbolKind::Interface
            } else {
                SymbolKind::Class
            };
            let class_name = caps[2].to_string();
            symbols.push(
                Symbol::new(
                    class_name.clone(),
                    format!("{module_name}.{class_name}"),
                    kind,
                    file_path.clone(),
                    Range::new(index, 0, index, line.len() as u32),
                )
                .with_signature(line.trim())
                .with_visibility(Visibility::Public),
            );
            class_stack.push((class_name, brace_delta(line)));
            continue;
        }

        if let Some(caps) = FUNCTION_RE.captures(line) {
            let function_name = caps[1].to_string();
            let parameters = parse_parameters(&caps[2]);
            let return_type = normalize_type(caps.get(3).map(|m| m.as_str()));
            let mut sym = Symbol::new(
                function_name.clone(),
                format!("{module_name}.{function_name}"),
                SymbolKind::Function,
                file_path.clone(),
                Range::new(index, 0, index, line.len() as u32),
            )
            .with_signature(line.trim())
            .with_visibility(Visibility::Public)
            .with_parameters(parameters)
            .async_flag(line.contains("async "));
            if let Some(rt) = return_type {
                sym = sym.with_return_type(rt);
            }
            symbols.push(sym);
            continue;
        }

        if let Some(caps) = ARROW_RE.captures(line) {
            let function_name = caps[1].to_string();
            let parameters = parse_parameters(&caps[2]);
            let return_type = normalize_type(caps.get(3).map(|m| m.as_str()));
            let mut sym = Symbol::new(
                function_name.clone(),
                format!("{module_name}.{function_name}"),
                SymbolKind::Function,
                file_path.clone(),
                Range::new(index, 0, index, line.len() as u32),
            )
            .with_signature(line.trim())
            .with_visibility(Visibility::Public)
            .with_parameters(parameters)
            .async_flag(line.contains("async "));
            if let Some(rt) = return_type {
                sym = sym.with_return_type(rt);
            }
            symbols.push(sym);
            continue;
        }

        if !class_stack.is_empty() {
            if let Some(caps) = METHOD_RE.captures(line) {
                let method_name = caps[1].to_string();
                if method_name != "constructor" {
                    let parameters = parse_parameters(&caps[2]);
                    let return_type = normalize_type(caps.get(3).map(|m| m.as_str()));
                    let current_class = &class_stack.last().unwrap().0;
                    let mut sym = Symbol::new(
                        method_name.clone(),
                        format!("{module_name}.{current_class}.{method_name}"),
                        SymbolKind::Method,
                        file_path.clone(),
                        Range::new(index, 0, index, line.len() as u32),
                    )
                    .with_signature(line.trim())
                    .with_visibility(Visibility::Public)
                    .with_parameters(parameters)
                    .async_flag(line.contains("async "));
                    if let Some(rt) = return_type {
                        sym = sym.with_return_type(rt);
                    }
                    symbols.push(sym);
                }
            }
        }

        if let Some(caps) = CONST_RE.captures(line) {
            if !line.contains("=>") {
                let const_name = caps[1].to_string();
                symbols.push(
                    Symbol::new(
                        const_name.clone(),
                        format!("{module_name}.{const_name}"),
                        SymbolKind::Constant,
                        file_path.clone(),
                        Range::new(index, 0, index, line.len() as u32),
                    )
                    .with_signature(line.trim())
                    .with_visibility(Visibility::Public),
                );
            }
        }

        if let Some(top) = class_stack.last_mut() {
            top.1 += brace_delta(line);
            while let Some(top) = class_stack.last() {
                if top.1 > 0 {
                    break;
                }
                class_stack.pop();
            }
        }
    }

    ExtractionResult { symbols, imports }
}
