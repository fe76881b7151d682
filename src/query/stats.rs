use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::HierarchyGraph;
use crate::graph::node::NodeType;
use crate::query::narrative::Narrative;

/// Aggregated hierarchy statistics.
#[derive(Debug, Serialize)]
pub struct HierarchyStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub hunks: usize,
    pub aggregators: usize,
    /// Node count per `nodeType`; types with no nodes are omitted.
    pub nodes_by_type: BTreeMap<&'static str, usize>,
    /// Edge count per edge type; types with no edges are omitted.
    pub edges_by_type: BTreeMap<&'static str, usize>,
    /// Number of chapters in the narrative.
    pub story_length: usize,
    /// Nodes whose descriptions are generated on their own.
    pub generated_nodes: usize,
}

/// Compute statistics from a built `HierarchyGraph` and its narrative.
pub fn hierarchy_stats(graph: &HierarchyGraph, narrative: &Narrative) -> HierarchyStats {
    let mut by_type: BTreeMap<NodeType, usize> = BTreeMap::new();
    for node in graph.nodes() {
        *by_type.entry(node.node_type()).or_insert(0) += 1;
    }

    let mut by_edge: BTreeMap<&'static str, usize> = BTreeMap::new();
    for e in graph.graph.edge_indices() {
        *by_edge.entry(graph.graph[e].as_str()).or_insert(0) += 1;
    }

    let hunks = by_type
        .iter()
        .filter(|(t, _)| {
            matches!(
                t,
                NodeType::Base
                    | NodeType::LocationContext
                    | NodeType::SemanticContext
                    | NodeType::Extension
            )
        })
        .map(|(_, n)| n)
        .sum();

    HierarchyStats {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        hunks,
        aggregators: graph.node_count() - hunks,
        nodes_by_type: by_type.into_iter().map(|(t, n)| (t.as_str(), n)).collect(),
        edges_by_type: by_edge,
        story_length: narrative.len(),
        generated_nodes: graph.generation_workload(),
    }
}
