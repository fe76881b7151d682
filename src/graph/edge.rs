use serde::{Deserialize, Serialize};

/// The kind of directed edge between two nodes in the change hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Aggregator -> child: defines the hierarchy.
    Expansion,
    /// Hunk -> hunk: chains a hunk to its enclosing location or semantic context.
    Context,
    /// Hunk -> hunk: links a sequential chain headed by a `SUCCESSIVE` aggregator.
    Succession,
    /// Definition hunk -> use hunk.
    DefUse,
    /// Hunk -> hunk: structurally similar edits.
    Similarity,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::Expansion,
        EdgeKind::Context,
        EdgeKind::Succession,
        EdgeKind::DefUse,
        EdgeKind::Similarity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Expansion => "EXPANSION",
            EdgeKind::Context => "CONTEXT",
            EdgeKind::Succession => "SUCCESSION",
            EdgeKind::DefUse => "DEF_USE",
            EdgeKind::Similarity => "SIMILARITY",
        }
    }
}

/// Serialized form of an edge: `{sourceId, targetId, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyEdge {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl HierarchyEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
        }
    }
}
