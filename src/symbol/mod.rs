//! Symbol and parameter records, the unit the graph store and the query
//! layer both operate on.

use crate::types::{Range, SymbolId, SymbolKind, Visibility};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub position: u32,
    pub default_value: Option<String>,
}

/// A symbol extracted from source. `id` is only populated once the symbol
/// has been persisted to the graph store (bulk-replace operations assign
/// ids on insert); freshly parsed symbols carry `id: None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: Option<SymbolId>,
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub range: Range,
    pub signature: Option<String>,
    pub return_type: Option<String>,
    pub visibility: Visibility,
    pub is_async: bool,
    pub is_static: bool,
    pub parent_symbol_id: Option<SymbolId>,
    pub docstring: Option<String>,
    pub pagerank_score: f64,
    pub parameters: Vec<Parameter>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        kind: SymbolKind,
        file_path: impl Into<String>,
        range: Range,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            qualified_name: qualified_name.into(),
            kind,
            file_path: file_path.into(),
            range,
            signature: None,
            return_type: None,
            visibility: Visibility::Public,
            is_async: false,
            is_static: false,
            parent_symbol_id: None,
            docstring: None,
            pagerank_score: 0.0,
            parameters: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    pub fn with_parent(mut self, parent: SymbolId) -> Self {
        self.parent_symbol_id = Some(parent);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn async_flag(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn static_flag(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Key identity used for `symbols(qualified_name, file_path)` uniqueness
    /// and for de-duplicating the same logical symbol across incremental
    /// re-index passes.
    pub fn key(&self) -> (String, String) {
        (self.qualified_name.clone(), self.file_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> Range {
        Range::new(1, 0, 3, 1)
    }

    #[test]
    fn builder_chain_sets_fields() {
        let sym = Symbol::new("run", "pkg.run", SymbolKind::Function, "pkg/mod.py", range())
            .with_signature("def run(x: int) -> int")
            .with_return_type("int")
            .async_flag(true);

        assert_eq!(sym.signature.as_deref(), Some("def run(x: int) -> int"));
        assert_eq!(sym.return_type.as_deref(), Some("int"));
        assert!(sym.is_async);
        assert_eq!(sym.key(), ("pkg.run".to_string(), "pkg/mod.py".to_string()));
    }
}
