//! Go symbol/import extraction, line-oriented regex matching (same
//! rationale as [`super::java`] and [`super::typescript`]).

use super::{ExtractionResult, ImportRecord, ParsedUnit};
use crate::symbol::{Parameter, Symbol};
use crate::types::{Range, SymbolKind, Visibility};
use regex::Regex;
use std::sync::LazyLock;

static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static IMPORT_SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s+"([^"]+)""#).unwrap());
static IMPORT_BLOCK_START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*import\s*\(").unwrap());
static IMPORT_BLOCK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\s*"([^"]+)""#).unwrap());
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*type\s+([A-Za-z_][A-Za-z0-9_]*)\s+(struct|interface)\b").unwrap()
});
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*func\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*([A-Za-z0-9_*.\[\]]+)?").unwrap()
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*func\s*\(([^)]*)\)\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*([A-Za-z0-9_*.\[\]]+)?").unwrap()
});
static CONST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*const\s+([A-Za-z_][A-Za-z0-9_]*)\b").unwrap());

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
        let normalized = chunk.replace('\t', " ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        let name = parts[0].replace("...", "");
        let type_hint = if parts.len() > 1 {
            Some(parts[1..].join(" "))
        } else {
            None
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

fn visibility_for_go(name: &str) -> Visibility {
    if name.chars().next().is_some_and(|c| c.is_uppercase()) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

pub fn extract(parsed: &ParsedUnit) -> ExtractionResult {
    let file_path = &parsed.path;
    let mut package_name = String::new();
    let mut imports = Vec::new();
    let mut symbols = Vec::new();
    let mut import_block = false;

    for (row, line) in parsed.source.lines().enumerate() {
        let index = row as u32 + 1;

        if let Some(caps) = PACKAGE_RE.captures(line) {
            package_name = caps[1].to_string();
        }

        if IMPORT_BLOCK_START_RE.is_match(line) {
            import_block = true;
            continue;
        }
        if import_block {
            if line.trim() == ")" {
                import_block = false;
            } else if let Some(caps) = IMPORT_BLOCK_LINE_RE.captures(line) {
                let module_name = caps[1].to_string();
                imports.push(ImportRecord {
                    source_file_path: file_path.clone(),
                    import_statement: line.trim().to_string(),
                    module_name,
                    imported_names: Vec::new(),
                    line_number: Some(index),
                });
            }
            continue;
        }

        if let Some(caps) = IMPORT_SINGLE_RE.captures(line) {
            let module_name = caps[1].to_string();
            imports.push(ImportRecord {
                source_file_path: file_path.clone(),
                import_statement: line.trim().to_string(),
                module_name,
                imported_names: Vec::new(),
                line_number: Some(index),
            });
            continue;
        }

        if let Some(caps) = TYPE_RE.captures(line) {
            let type_name = caps[1].to_string();
            let kind = if &caps[2] == "interface" {
                SymbolKind::Interface
            } else {
                SymbolKind::Class
            };
            let qualified = if package_name.is_empty() {
                type_name.clone()
            } else {
                format!("{package_name}.{type_name}")
            };
            symbols.push(
                Symbol::new(
                    type_name.clone(),
                    qualified,
                    kind,
                    file_path.clone(),
                    Range::new(index, 0, index, line.len() as u32),
                )
                .with_signature(line.trim())
                .with_visibility(visibility_for_go(&type_name)),
            );
            continue;
        }

        if let Some(caps) = METHOD_RE.captures(line) {
            let receiver_raw = caps[1].trim();
            let method_name = caps[2].to_string();
            let params_raw = &caps[3];
            let return_type = caps.get(4).map(|m| m.as_str().trim().to_string());
            let receiver_tokens: Vec<&str> = receiver_raw.split(' ').filter(|s| !s.is_empty()).collect();
            let receiver_type = receiver_tokens
                .last()
                .map(|s| s.replace('*', ""))
                .unwrap_or_else(|| "Receiver".to_string());
            let parameters = parse_parameters(params_raw);
            let class_prefix = if package_name.is_empty() {
                receiver_type
            } else {
                format!("{package_name}.{receiver_type}")
            };
            let mut sym = Symbol::new(
                method_name.clone(),
                format!("{class_prefix}.{method_name}"),
                SymbolKind::Method,
                file_path.clone(),
                Range::new(index, 0, index, line.len() as u32),
            )
            .with_signature(line.trim())
            .with_visibility(visibility_for_go(&method_name))
            .with_parameters(parameters);
            if let Some(rt) = return_type {
                sym = sym.with_return_type(rt);
            }
            symbols.push(sym);
            continue;
        }

        if let Some(caps) = FUNCTION_RE.captures(line) {
            let function_name = caps[1].to_string();
            let params_raw = &caps[2];
            let return_type = caps.get(3).map(|m| m.as_str().trim().to_string());
            let parameters = parse_parameters(params_raw);
            let qualified = if package_name.is_empty() {
                function_name.clone()
            } else {
                format!("{package_name}.{function_name}")
            };
            let mut sym = Symbol::new(
                function_name.clone(),
                qualified,
                SymbolKind::Function,
                file_path.clone(),
                Range::new(index, 0, index, line.len() as u32),
            )
            .with_signature(line.trim())
            .with_visibility(visibility_for_go(&function_name))
            .with_parameters(parameters);
            if let Some(rt) = return_type {
                sym = sym.with_return_type(rt);
            }
            symbols.push(sym);
        }

        if let Some(caps) = CONST_RE.captures(line) {
            let const_name = caps[1].to_string();
            let qualified = if package_name.is_empty() {
                const_name.clone()
            } else {
                format!("{package_name}.{const_name}")
            };
            symbols.push(
                Symbol::new(
                    const_name.clone(),
                    qualified,
                    SymbolKind::Constant,
                    file_path.clone(),
                    Range::new(index, 0, index, line.len() as u32),
                )
                .with_signature(line.trim())
                .with_visibility(visibility_for_go(&const_name)),
            );
        }
    }

    ExtractionResult { symbols, imports }
}
