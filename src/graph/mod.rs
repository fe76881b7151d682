pub mod edge;
pub mod metrics;
pub mod node;

use std::collections::HashMap;

use parking_lot::RwLock;
use petgraph::Directed;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use edge::{EdgeKind, HierarchyEdge};
use metrics::DescendantHunks;
use node::{HierarchyNode, NodeKind};

/// Serialized hierarchy: the engine's only input and the shape `serialize()` returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchySnapshot {
    pub nodes: Vec<HierarchyNode>,
    pub edges: Vec<HierarchyEdge>,
}

/// Lazily-populated derived metrics, keyed by node index.
///
/// Filled on first access and kept until `invalidate_caches`.
#[derive(Default)]
pub(crate) struct GraphCaches {
    pub(crate) branch_weight: RwLock<HashMap<NodeIndex, usize>>,
    pub(crate) descendants: RwLock<HashMap<NodeIndex, DescendantHunks>>,
    pub(crate) dependency_closure: RwLock<HashMap<NodeIndex, Vec<NodeIndex>>>,
}

/// The Graph Store: a directed petgraph StableGraph with O(1) id lookup and memoized metrics.
pub struct HierarchyGraph {
    /// The underlying directed graph. Node insertion order matches snapshot order.
    pub graph: StableGraph<HierarchyNode, EdgeKind, Directed>,
    /// Maps node ids to their indices.
    pub id_index: HashMap<String, NodeIndex>,
    /// Maps an aggregator to every node listing it in `aggregatorIds`, in node order.
    pub children_index: HashMap<NodeIndex, Vec<NodeIndex>>,
    root: NodeIndex,
    pub(crate) caches: GraphCaches,
}

impl HierarchyGraph {
    /// Build the store from a deserialized hierarchy.
    ///
    /// Fails fast on a missing or duplicated `ROOT`, duplicate ids, and edges or
    /// `aggregatorIds` that reference unknown nodes.
    pub fn from_snapshot(snapshot: HierarchySnapshot) -> Result<Self> {
        let HierarchySnapshot { nodes, edges } = snapshot;

        let mut graph: StableGraph<HierarchyNode, EdgeKind, Directed> =
            StableGraph::with_capacity(nodes.len(), edges.len());
        let mut id_index: HashMap<String, NodeIndex> = HashMap::with_capacity(nodes.len());
        let mut root: Option<NodeIndex> = None;

        for node in nodes {
            if id_index.contains_key(&node.id) {
                return Err(GraphError::DuplicateId(node.id));
            }
            let is_root = matches!(node.kind, NodeKind::Root);
            let id = node.id.clone();
            let idx = graph.add_node(node);
            if is_root {
                if let Some(existing) = root {
                    return Err(GraphError::MultipleRoots(graph[existing].id.clone(), id));
                }
                root = Some(idx);
            }
            id_index.insert(id, idx);
        }

        let root = root.ok_or(GraphError::MissingRoot)?;

        for edge in edges {
            let (Some(&src), Some(&dst)) =
                (id_index.get(&edge.source_id), id_index.get(&edge.target_id))
            else {
                return Err(GraphError::UnknownEdgeEndpoint {
                    source_id: edge.source_id,
                    target_id: edge.target_id,
                });
            };
            graph.add_edge(src, dst, edge.kind);
        }

        let mut children_index: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
        for idx in graph.node_indices() {
            for parent in &graph[idx].aggregator_ids {
                let Some(&parent_idx) = id_index.get(parent) else {
                    return Err(GraphError::UnknownAggregator {
                        node: graph[idx].id.clone(),
                        aggregator: parent.clone(),
                    });
                };
                children_index.entry(parent_idx).or_default().push(idx);
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            root = %graph[root].id,
            "built change hierarchy"
        );

        Ok(Self {
            graph,
            id_index,
            children_index,
            root,
            caches: GraphCaches::default(),
        })
    }

    /// Resolve an id to its node index, or `NotFound`.
    pub fn index_of(&self, id: &str) -> Result<NodeIndex> {
        self.id_index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::not_found(id))
    }

    /// Look up a node by id, or `NotFound`.
    pub fn node_by_id(&self, id: &str) -> Result<&HierarchyNode> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// All nodes in snapshot order.
    pub fn nodes(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// All edges in snapshot order, in their serialized form.
    pub fn edges(&self) -> Vec<HierarchyEdge> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (src, dst) = self.graph.edge_endpoints(e)?;
                Some(HierarchyEdge::new(
                    self.graph[src].id.clone(),
                    self.graph[dst].id.clone(),
                    self.graph[e],
                ))
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_id(&self) -> &str {
        &self.graph[self.root].id
    }

    /// Direct `EXPANSION` targets of `idx`, in edge insertion order, without duplicates.
    pub fn expansion_targets(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.targets_of_kind(idx, EdgeKind::Expansion)
    }

    /// Outgoing neighbours over edges of `kind`, in edge insertion order, without duplicates.
    pub fn targets_of_kind(&self, idx: NodeIndex, kind: EdgeKind) -> Vec<NodeIndex> {
        // petgraph yields outgoing edges newest-first.
        let mut targets: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| *e.weight() == kind)
            .map(|e| e.target())
            .collect();
        targets.reverse();
        dedup_in_order(&mut targets);
        targets
    }

    /// Incoming neighbours over edges of `kind`, in edge insertion order, without duplicates.
    pub fn sources_of_kind(&self, idx: NodeIndex, kind: EdgeKind) -> Vec<NodeIndex> {
        let mut sources: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| *e.weight() == kind)
            .map(|e| e.source())
            .collect();
        sources.reverse();
        dedup_in_order(&mut sources);
        sources
    }

    /// Nodes that list `idx` among their `aggregatorIds`.
    pub fn children_of(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.children_index
            .get(&idx)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_aggregator(&self, idx: NodeIndex) -> bool {
        self.graph[idx].is_aggregator()
    }

    pub fn set_title(&mut self, id: &str, title: impl Into<String>) -> Result<()> {
        let idx = self.index_of(id)?;
        self.graph[idx].title = Some(title.into());
        Ok(())
    }

    pub fn set_description(&mut self, id: &str, description: impl Into<String>) -> Result<()> {
        let idx = self.index_of(id)?;
        self.graph[idx].description = Some(description.into());
        Ok(())
    }

    /// Drop every memoized metric. Nothing is invalidated automatically.
    pub fn invalidate_caches(&self) {
        self.caches.branch_weight.write().clear();
        self.caches.descendants.write().clear();
        self.caches.dependency_closure.write().clear();
        tracing::debug!("invalidated derived hierarchy caches");
    }

    /// Snapshot of the current node and edge set, including mutated titles and descriptions.
    pub fn serialize(&self) -> HierarchySnapshot {
        HierarchySnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges(),
        }
    }
}

fn dedup_in_order(items: &mut Vec<NodeIndex>) {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items.retain(|idx| seen.insert(*idx));
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::edge::{EdgeKind, HierarchyEdge};
    use super::node::{ComponentInfo, HierarchyNode, HunkInfo, NodeKind, ReasonType};
    use super::{HierarchyGraph, HierarchySnapshot};

    /// Small builder for hand-made hierarchies in unit tests.
    #[derive(Default)]
    pub struct HierarchyBuilder {
        snapshot: HierarchySnapshot,
    }

    pub fn hunk(file: &str, line: usize) -> HunkInfo {
        HunkInfo {
            file_path: file.to_owned(),
            start_line: line,
            end_line: line + 2,
            content: format!("line {line}"),
            previous_content: None,
            range_mappings: None,
        }
    }

    pub fn component(reason_type: ReasonType, reasons: &[&str]) -> NodeKind {
        NodeKind::Component(ComponentInfo {
            reason_type,
            reasons: reasons.iter().map(|r| (*r).to_owned()).collect(),
        })
    }

    impl HierarchyBuilder {
        pub fn new() -> Self {
            Self::default().node("root", NodeKind::Root, &[])
        }

        /// Add a node with the given parents. `EXPANSION` edges from each parent are added too.
        pub fn node(mut self, id: &str, kind: NodeKind, parents: &[&str]) -> Self {
            self.snapshot
                .nodes
                .push(HierarchyNode::new(id, kind).with_parents(parents.iter().copied()));
            for parent in parents {
                self.snapshot
                    .edges
                    .push(HierarchyEdge::new(*parent, id, EdgeKind::Expansion));
            }
            self
        }

        pub fn base(self, id: &str, parents: &[&str]) -> Self {
            self.node(id, NodeKind::Base(hunk("src/lib.rs", 1)), parents)
        }

        pub fn edge(mut self, source: &str, target: &str, kind: EdgeKind) -> Self {
            self.snapshot
                .edges
                .push(HierarchyEdge::new(source, target, kind));
            self
        }

        pub fn snapshot(self) -> HierarchySnapshot {
            self.snapshot
        }

        pub fn build(self) -> HierarchyGraph {
            HierarchyGraph::from_snapshot(self.snapshot).expect("test hierarchy is well-formed")
        }
    }
}
