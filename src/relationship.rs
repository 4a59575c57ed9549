//! Edge kinds connecting symbols and files in the dependency graph.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Calls,
    Imports,
    ImportsSymbol,
    Extends,
    Implements,
    HasMethod,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "CALLS",
            Self::Imports => "IMPORTS",
            Self::ImportsSymbol => "IMPORTS_SYMBOL",
            Self::Extends => "EXTENDS",
            Self::Implements => "IMPLEMENTS",
            Self::HasMethod => "HAS_METHOD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CALLS" => Some(Self::Calls),
            "IMPORTS" => Some(Self::Imports),
            "IMPORTS_SYMBOL" => Some(Self::ImportsSymbol),
            "EXTENDS" => Some(Self::Extends),
            "IMPLEMENTS" => Some(Self::Implements),
            "HAS_METHOD" => Some(Self::HasMethod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Symbol,
    File,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "symbol" => Some(Self::Symbol),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// A directed edge between two graph nodes (symbol or file ids), carrying
/// the provenance (source file/line) and resolution confidence the
/// call-graph and import resolvers attach when they can't be fully certain
/// of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: u32,
    pub target_id: u32,
    pub source_type: NodeType,
    pub target_type: NodeType,
    pub relationship: RelationKind,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    pub confidence: f64,
}

impl Edge {
    pub fn new(
        source_id: u32,
        target_id: u32,
        source_type: NodeType,
        target_type: NodeType,
        relationship: RelationKind,
    ) -> Self {
        Self {
            source_id,
            target_id,
            source_type,
            target_type,
            relationship,
            file_path: None,
            line_number: None,
            confidence: 1.0,
        }
    }

    pub fn with_location(mut self, file_path: impl Into<String>, line_number: u32) -> Self {
        self.file_path = Some(file_path.into());
        self.line_number = Some(line_number);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_kind_round_trips() {
        for kind in [
            RelationKind::Calls,
            RelationKind::Imports,
            RelationKind::ImportsSymbol,
            RelationKind::Extends,
            RelationKind::Implements,
            RelationKind::HasMethod,
        ] {
            assert_eq!(RelationKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn confidence_is_clamped() {
        let edge = Edge::new(1, 2, NodeType::Symbol, NodeType::Symbol, RelationKind::Calls)
            .with_confidence(1.5);
        assert_eq!(edge.confidence, 1.0);
    }
}
