use serde::{Deserialize, Serialize};

/// An inclusive 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// Move tracking: where a block of lines came from and where it landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMapping {
    pub source: LineRange,
    pub destination: LineRange,
}

/// Payload shared by every hunk variant: a concrete unit of changed or contextual code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkInfo {
    /// Path of the file the hunk lives in.
    pub file_path: String,
    /// 1-based first line of the hunk.
    pub start_line: usize,
    /// 1-based last line of the hunk (inclusive).
    pub end_line: usize,
    /// Text of the hunk in the new version.
    #[serde(default)]
    pub content: String,
    /// Text of the hunk in the previous version, if it existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_mappings: Option<Vec<RangeMapping>>,
}

/// Why a `COMPONENT` aggregator groups its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonType {
    /// The children share common code (hunks or nodes).
    Common,
    /// The children are similar to one another.
    Similar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub reason_type: ReasonType,
    /// Node ids or code snippets motivating the grouping.
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Subtype of a hierarchy node, discriminated by `nodeType` on the wire.
///
/// The first four variants are hunks (leaves); the rest are aggregators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Base(HunkInfo),
    LocationContext(HunkInfo),
    SemanticContext(HunkInfo),
    Extension(HunkInfo),
    Successive,
    Usage,
    Similarity,
    Component(ComponentInfo),
    Singular,
    Cluster,
    Root,
}

/// Field-less mirror of [`NodeKind`] used for counting, filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Base,
    LocationContext,
    SemanticContext,
    Extension,
    Successive,
    Usage,
    Similarity,
    Component,
    Singular,
    Cluster,
    Root,
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        NodeType::Base,
        NodeType::LocationContext,
        NodeType::SemanticContext,
        NodeType::Extension,
        NodeType::Successive,
        NodeType::Usage,
        NodeType::Similarity,
        NodeType::Component,
        NodeType::Singular,
        NodeType::Cluster,
        NodeType::Root,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Base => "BASE",
            NodeType::LocationContext => "LOCATION_CONTEXT",
            NodeType::SemanticContext => "SEMANTIC_CONTEXT",
            NodeType::Extension => "EXTENSION",
            NodeType::Successive => "SUCCESSIVE",
            NodeType::Usage => "USAGE",
            NodeType::Similarity => "SIMILARITY",
            NodeType::Component => "COMPONENT",
            NodeType::Singular => "SINGULAR",
            NodeType::Cluster => "CLUSTER",
            NodeType::Root => "ROOT",
        }
    }
}

/// A node in the change hierarchy: a hunk or an aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub id: String,
    /// Short heading, written by the external generation driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Generated explanation, written by the external generation driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ids of the aggregators owning this node. A node may have several parents.
    #[serde(default)]
    pub aggregator_ids: Vec<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl HierarchyNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            aggregator_ids: Vec::new(),
            kind,
        }
    }

    /// Builder-style helper to set the owning aggregators.
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregator_ids = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Base(_) => NodeType::Base,
            NodeKind::LocationContext(_) => NodeType::LocationContext,
            NodeKind::SemanticContext(_) => NodeType::SemanticContext,
            NodeKind::Extension(_) => NodeType::Extension,
            NodeKind::Successive => NodeType::Successive,
            NodeKind::Usage => NodeType::Usage,
            NodeKind::Similarity => NodeType::Similarity,
            NodeKind::Component(_) => NodeType::Component,
            NodeKind::Singular => NodeType::Singular,
            NodeKind::Cluster => NodeType::Cluster,
            NodeKind::Root => NodeType::Root,
        }
    }

    /// The hunk payload, if this node is any hunk variant.
    pub fn hunk(&self) -> Option<&HunkInfo> {
        match &self.kind {
            NodeKind::Base(info)
            | NodeKind::LocationContext(info)
            | NodeKind::SemanticContext(info)
            | NodeKind::Extension(info) => Some(info),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<&ComponentInfo> {
        match &self.kind {
            NodeKind::Component(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_hunk(&self) -> bool {
        self.hunk().is_some()
    }

    pub fn is_aggregator(&self) -> bool {
        !self.is_hunk()
    }

    /// `BASE` and `EXTENSION` hunks carry actual edits; context hunks only surround them.
    pub fn is_change_hunk(&self) -> bool {
        matches!(self.kind, NodeKind::Base(_) | NodeKind::Extension(_))
    }

    pub fn is_context_hunk(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::LocationContext(_) | NodeKind::SemanticContext(_)
        )
    }

    /// Best human-readable label: the title if generated, else the id.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}
