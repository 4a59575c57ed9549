//! Python symbol/import extraction, walking the tree-sitter parse tree
//! produced by the shared `parse_file` stage (falls back to an empty result
//! when the file failed to parse at all).

use super::{to_module_name, visibility_for, ExtractionResult, ImportRecord, ParseTree, ParsedUnit};
use crate::symbol::{Parameter, Symbol};
use crate::types::{Range, SymbolKind};
use tree_sitter::Node;

pub fn extract(parsed: &ParsedUnit) -> ExtractionResult {
    let tree = match &parsed.tree {
        ParseTree::PythonTree(tree) => tree,
        _ => {
            return ExtractionResult {
                symbols: Vec::new(),
                imports: Vec::new(),
            };
        }
    };

    let module = to_module_name(&parsed.path);
    let source = parsed.source.as_bytes();
    let root = tree.root_node();

    let mut symbols = Vec::new();
    let mut imports = Vec::new();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        walk_module_level(&child, source, &module, &parsed.path, &mut symbols, &mut imports);
    }

    ExtractionResult { symbols, imports }
}

fn text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn unwrap_decorated(node: &Node) -> Node {
    if node.kind() == "decorated_definition" {
        if let Some(def) = node.child_by_field_name("definition") {
            return def;
        }
    }
    *node
}

fn walk_module_level(
    node: &Node,
    source: &[u8],
    module: &str,
    file_path: &str,
    symbols: &mut Vec<Symbol>,
    imports: &mut Vec<ImportRecord>,
) {
    let node = unwrap_decorated(node);
    match node.kind() {
        "function_definition" => {
            if let Some(sym) = build_function(&node, source, module, file_path, None) {
                symbols.push(sym);
            }
        }
        "class_definition" => {
            build_class(&node, source, module, file_path, symbols);
        }
        "import_statement" => {
            imports.extend(build_import_statement(&node, source, file_path));
        }
        "import_from_statement" => {
            if let Some(import) = build_import_from(&node, source, file_path) {
                imports.push(import);
            }
        }
        "expression_statement" => {
            if let Some(sym) = build_constant(&node, source, module, file_path) {
                symbols.push(sym);
            }
        }
        _ => {}
    }
}

fn build_function(
    node: &Node,
    source: &[u8],
    qualifier: &str,
    file_path: &str,
    parent: Option<crate::types::SymbolId>,
) -> Option<Symbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(&name_node, source).to_string();
    let is_async = node
        .child(0)
        .map(|c| c.kind() == "async")
        .unwrap_or(false);

    let parameters = node
        .child_by_field_name("parameters")
        .map(|p| build_parameters(&p, source))
        .unwrap_or_default();

    let return_type = node
        .child_by_field_name("return_type")
        .map(|t| text(&t, source).to_string());

    let docstring = function_docstring(node, source);

    let qualified_name = format!("{qualifier}.{name}");
    let kind = if parent.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };
    let signature = build_signature(&name, &parameters, return_type.as_deref());

    let range = Range::new(
        node.start_position().row as u32 + 1,
        node.start_position().column as u32,
        node.end_position().row as u32 + 1,
        node.end_position().column as u32,
    );

    let mut sym = Symbol::new(name.clone(), qualified_name, kind, file_path, range)
        .with_signature(signature)
        .with_visibility(visibility_for(&name))
        .with_parameters(parameters)
        .async_flag(is_async);
    if let Some(rt) = return_type {
        sym = sym.with_return_type(rt);
    }
    if let Some(doc) = docstring {
        sym = sym.with_docstring(doc);
    }
    if let Some(parent) = parent {
        sym = sym.with_parent(parent);
    }
    Some(sym)
}

fn build_class(node: &Node, source: &[u8], module: &str, file_path: &str, symbols: &mut Vec<Symbol>) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = text(&name_node, source).to_string();
    let qualified_name = format!("{module}.{name}");
    let docstring = function_docstring(node, source);

    let range = Range::new(
        node.start_position().row as u32 + 1,
        node.start_position().column as u32,
        node.end_position().row as u32 + 1,
        node.end_position().column as u32,
    );

    let mut class_sym = Symbol::new(name.clone(), qualified_name.clone(), SymbolKind::Class, file_path, range)
        .with_signature(format!("class {name}"))
        .with_visibility(visibility_for(&name));
    if let Some(doc) = docstring {
        class_sym = class_sym.with_docstring(doc);
    }
    symbols.push(class_sym);

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        let child = unwrap_decorated(&child);
        if child.kind() == "function_definition" {
            if let Some(method) = build_function(&child, source, &qualified_name, file_path, None) {
                symbols.push(method);
            }
        }
    }
}

fn build_parameters(params_node: &Node, source: &[u8]) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut cursor = params_node.walk();
    let mut position = 0u32;
    for child in params_node.children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                parameters.push(Parameter {
                    name: text(&child, source).to_string(),
                    type_hint: None,
                    position,
                    default_value: None,
                });
                position += 1;
            }
            "typed_parameter" => {
                let name = child
                    .child(0)
                    .map(|n| text(&n, source).to_string())
                    .unwrap_or_default();
                let type_hint = child
                    .child_by_field_name("type")
                    .map(|n| text(&n, source).to_string());
                if !name.is_empty() {
                    parameters.push(Parameter {
                        name,
                        type_hint,
                        position,
                        default_value: None,
                    });
                    position += 1;
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| text(&n, source).to_string())
                    .unwrap_or_default();
                let type_hint = child
                    .child_by_field_name("type")
                    .map(|n| text(&n, source).to_string());
                let default_value = child
                    .child_by_field_name("value")
                    .map(|n| text(&n, source).to_string());
                if !name.is_empty() {
                    parameters.push(Parameter {
                        name,
                        type_hint,
                        position,
                        default_value,
                    });
                    position += 1;
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let name = text(&child, source)
                    .trim_start_matches('*')
                    .to_string();
                if !name.is_empty() {
                    parameters.push(Parameter {
                        name,
                        type_hint: None,
                        position,
                        default_value: None,
                    });
                    position += 1;
                }
            }
            _ => {}
        }
    }
    parameters
}

fn build_signature(name: &str, parameters: &[Parameter], return_type: Option<&str>) -> String {
    let args: Vec<String> = parameters
        .iter()
        .map(|p| match &p.type_hint {
            Some(t) => format!("{}: {t}", p.name),
            None => p.name.clone(),
        })
        .collect();
    match return_type {
        Some(rt) => format!("def {name}({}) -> {rt}", args.join(", ")),
        None => format!("def {name}({})", args.join(", ")),
    }
}

fn function_docstring(node: &Node, source: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let raw = text(&expr, source);
    Some(
        raw.trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_string(),
    )
}

fn build_constant(node: &Node, source: &[u8], module: &str, file_path: &str) -> Option<Symbol> {
    let expr = node.child(0)?;
    if expr.kind() != "assignment" {
        return None;
    }
    let left = expr.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = text(&left, source).to_string();
    if name != name.to_uppercase() || !name.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let range = Range::new(
        node.start_position().row as u32 + 1,
        node.start_position().column as u32,
        node.end_position().row as u32 + 1,
        node.end_position().column as u32,
    );
    Some(
        Symbol::new(
            name.clone(),
            format!("{module}.{name}"),
            SymbolKind::Constant,
            file_path,
            range,
        )
        .with_signature(name.clone())
        .with_visibility(visibility_for(&name)),
    )
}

fn build_import_statement(node: &Node, source: &[u8], file_path: &str) -> Vec<ImportRecord> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let module_name = text(&child, source).to_string();
                out.push(ImportRecord {
                    source_file_path: file_path.to_string(),
                    import_statement: format!("import {module_name}"),
                    module_name,
                    imported_names: Vec::new(),
                    line_number: Some(node.start_position().row as u32 + 1),
                });
            }
            "aliased_import" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let module_name = text(&name_node, source).to_string();
                    out.push(ImportRecord {
                        source_file_path: file_path.to_string(),
                        import_statement: text(&child, source).to_string(),
                        module_name,
                        imported_names: Vec::new(),
                        line_number: Some(node.start_position().row as u32 + 1),
                    });
                }
            }
            _ => {}
        }
    }
    out
}

fn build_import_from(node: &Node, source: &[u8], file_path: &str) -> Option<ImportRecord> {
    let module_node = node.child_by_field_name("module_name");
    let module_name = module_node
        .map(|n| text(&n, source).to_string())
        .unwrap_or_default();

    let mut imported_names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" if Some(child) != module_node => {
                imported_names.push(text(&child, source).to_string());
            }
            "aliased_import" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    imported_names.push(text(&name_node, source).to_string());
                }
            }
            "wildcard_import" => imported_names.push("*".to_string()),
            _ => {}
        }
    }

    Some(ImportRecord {
        source_file_path: file_path.to_string(),
        import_statement: text(node, source).to_string(),
        module_name,
        imported_names,
        line_number: Some(node.start_position().row as u32 + 1),
    })
}
