//! Source parsing and symbol/import extraction.
//!
//! Python gets a native tree-sitter parse attempt on every file (soft-failing
//! to `NoTree` on a syntax error); Java, TypeScript, and Go attempt a
//! tree-sitter parse for diagnostics but their actual symbol/import
//! extraction is line-oriented regex matching, not tree-based traversal —
//! the grammars for those languages are still too uneven across real-world
//! code style to drive extraction directly. `ParseTree` is the tagged enum
//! dispatch replacing the source's string-keyed `parsed.language` checks.

mod go;
mod java;
mod python;
mod typescript;

use crate::config::RuntimeConfig;
use crate::error::{IndexError, IndexResult};
use crate::symbol::Symbol;
use crate::types::Language;
use std::path::Path;

/// What a parse attempt produced. Python always gets `PythonTree` unless the
/// source has a syntax error tree-sitter can't recover from; Java/TS/Go get
/// `SyntaxTree` when the grammar parses cleanly, used only for diagnostics
/// today since extraction reads `source` directly.
pub enum ParseTree {
    PythonTree(tree_sitter::Tree),
    SyntaxTree(tree_sitter::Tree),
    NoTree,
}

pub struct ParsedUnit {
    pub path: String,
    pub language: Language,
    pub source: String,
    pub tree: ParseTree,
}

fn tree_sitter_language_for(language: Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
        Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
    }
}

/// Parses `path` as `language`. Grammar failures soft-fail to `NoTree`
/// unless `runtime.require_tree_sitter` is set, in which case they become a
/// hard `IndexError::ParseError`.
pub fn parse_file(path: &Path, language: Language, runtime: &RuntimeConfig) -> IndexResult<ParsedUnit> {
    let source = std::fs::read_to_string(path)
        .or_else(|_| {
            std::fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        })
        .map_err(|e| IndexError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut parser = tree_sitter::Parser::new();
    let tree = match tree_sitter_language_for(language) {
        Some(ts_lang) => {
            if parser.set_language(&ts_lang).is_err() {
                ParseTree::NoTree
            } else {
                match parser.parse(&source, None) {
                    Some(tree) if tree.root_node().has_error() && runtime.require_tree_sitter => {
                        return Err(IndexError::ParseError {
                            path: path.to_path_buf(),
                            language: language.as_str().to_string(),
                            reason: "syntax tree contains errors".to_string(),
                        });
                    }
                    Some(tree) => {
                        if matches!(language, Language::Python) {
                            ParseTree::PythonTree(tree)
                        } else {
                            ParseTree::SyntaxTree(tree)
                        }
                    }
                    None if runtime.require_tree_sitter => {
                        return Err(IndexError::ParseError {
                            path: path.to_path_buf(),
                            language: language.as_str().to_string(),
                            reason: "tree-sitter returned no tree".to_string(),
                        });
                    }
                    None => ParseTree::NoTree,
                }
            }
        }
        None => ParseTree::NoTree,
    };

    Ok(ParsedUnit {
        path: path.to_string_lossy().into_owned(),
        language,
        source,
        tree,
    })
}

pub struct ExtractionResult {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportRecord>,
}

#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub source_file_path: String,
    pub import_statement: String,
    pub module_name: String,
    pub imported_names: Vec<String>,
    pub line_number: Option<u32>,
}

/// Dispatches on the tagged `Language` the parse stage already classified;
/// replaces the source's string-keyed extractor dispatch.
pub fn extract_symbols(parsed: &ParsedUnit) -> ExtractionResult {
    match parsed.language {
        Language::Python => python::extract(parsed),
        Language::Java => java::extract(parsed),
        Language::TypeScript => typescript::extract(parsed),
        Language::Go => go::extract(parsed),
    }
}

/// Turns a relative file path into a dotted module name: strips the
/// extension, drops a leading root anchor, joins remaining components with
/// `.`. Shared by every extractor for qualified-name construction.
pub fn to_module_name(path: &str) -> String {
    let no_ext = Path::new(path).with_extension("");
    no_ext
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn visibility_for(name: &str) -> crate::types::Visibility {
    if name.starts_with('_') {
        crate::types::Visibility::Private
    } else {
        crate::types::Visibility::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_strips_extension_and_joins() {
        assert_eq!(to_module_name("pkg/sub/mod.py"), "pkg.sub.mod");
        assert_eq!(to_module_name("main.go"), "main");
    }
}
