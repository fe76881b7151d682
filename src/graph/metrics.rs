use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::NodeIndex;
use serde::Serialize;

use super::HierarchyGraph;
use crate::error::Result;

/// Raw edits summarized by an abstraction, split by distance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescendantHunks {
    /// Change hunks in the first hop (below the subject) that contains any.
    pub first_generation: Vec<String>,
    /// Change hunks of every later hop.
    pub extended_generations: Vec<String>,
}

impl HierarchyGraph {
    /// Recursive count of aggregator descendants of `id` over `EXPANSION` edges.
    ///
    /// A node with no aggregator children weighs 0; otherwise its weight is the number of
    /// direct aggregator children plus the sum of their weights. Memoized per node.
    pub fn branch_weight(&self, id: &str) -> Result<usize> {
        let idx = self.index_of(id)?;
        Ok(self.branch_weight_of(idx))
    }

    pub fn branch_weight_of(&self, idx: NodeIndex) -> usize {
        if let Some(&weight) = self.caches.branch_weight.read().get(&idx) {
            return weight;
        }

        let mut computed: HashMap<NodeIndex, usize> = HashMap::new();
        {
            let cache = self.caches.branch_weight.read();
            let known = |n: &NodeIndex, computed: &HashMap<NodeIndex, usize>| {
                computed.get(n).or_else(|| cache.get(n)).copied()
            };

            // Iterative postorder: (node, children_pushed).
            let mut stack: Vec<(NodeIndex, bool)> = vec![(idx, false)];
            let mut on_stack: HashSet<NodeIndex> = HashSet::new();

            while let Some((node, expanded)) = stack.pop() {
                let children = self.aggregator_children(node);
                if expanded {
                    on_stack.remove(&node);
                    // A child still on the recursion stack would be a cycle; it counts as 0.
                    let nested: usize = children
                        .iter()
                        .map(|c| known(c, &computed).unwrap_or(0))
                        .sum();
                    computed.insert(node, children.len() + nested);
                    continue;
                }
                if known(&node, &computed).is_some() || on_stack.contains(&node) {
                    continue;
                }
                on_stack.insert(node);
                stack.push((node, true));
                for child in children {
                    if known(&child, &computed).is_none() && !on_stack.contains(&child) {
                        stack.push((child, false));
                    }
                }
            }
        }

        let weight = computed.get(&idx).copied().unwrap_or(0);
        self.caches.branch_weight.write().extend(computed);
        weight
    }

    /// Direct `EXPANSION` targets of `idx` that are aggregators.
    pub fn aggregator_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.expansion_targets(idx)
            .into_iter()
            .filter(|&child| self.is_aggregator(child))
            .collect()
    }

    /// Layer the nodes below `id` breadth-first by `aggregatorIds` and report which
    /// `BASE`/`EXTENSION` hunks it summarizes directly versus transitively.
    pub fn descendant_hunks(&self, id: &str) -> Result<DescendantHunks> {
        let idx = self.index_of(id)?;
        Ok(self.descendant_hunks_of(idx))
    }

    pub fn descendant_hunks_of(&self, idx: NodeIndex) -> DescendantHunks {
        if let Some(found) = self.caches.descendants.read().get(&idx) {
            return found.clone();
        }

        let mut result = DescendantHunks::default();
        let mut first_found = false;
        let mut visited: HashSet<NodeIndex> = HashSet::from([idx]);
        let mut frontier: Vec<NodeIndex> = vec![idx];

        loop {
            let mut hop: Vec<NodeIndex> = Vec::new();
            for &parent in &frontier {
                for &child in self.children_of(parent) {
                    if visited.insert(child) {
                        hop.push(child);
                    }
                }
            }
            if hop.is_empty() {
                break;
            }

            let hunks = hop
                .iter()
                .filter(|&&n| self.graph[n].is_change_hunk())
                .map(|&n| self.graph[n].id.clone());
            if first_found {
                result.extended_generations.extend(hunks);
            } else {
                result.first_generation.extend(hunks);
                first_found = !result.first_generation.is_empty();
            }
            frontier = hop;
        }

        self.caches
            .descendants
            .write()
            .insert(idx, result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::EdgeKind;
    use crate::graph::node::{HierarchyNode, NodeKind, ReasonType};
    use crate::graph::test_support::{HierarchyBuilder, component, hunk};

    fn layered() -> HierarchyGraph {
        // root -> a -> {b, h1}; b -> {c, h2}; c -> h3; a also owns context hunk ctx.
        HierarchyBuilder::new()
            .node("a", component(ReasonType::Common, &[]), &["root"])
            .node("b", NodeKind::Usage, &["a"])
            .base("h1", &["a"])
            .node("ctx", NodeKind::LocationContext(hunk("src/a.rs", 3)), &["a"])
            .node("c", NodeKind::Similarity, &["b"])
            .node("h2", NodeKind::Extension(hunk("src/b.rs", 9)), &["b"])
            .base("h3", &["c"])
            .build()
    }

    #[test]
    fn test_leaf_aggregator_weighs_zero() {
        let graph = layered();
        assert_eq!(graph.branch_weight("c").unwrap(), 0);
        assert_eq!(graph.branch_weight("h1").unwrap(), 0, "hunks have no aggregator children");
    }

    #[test]
    fn test_branch_weight_counts_aggregator_descendants() {
        let graph = layered();
        assert_eq!(graph.branch_weight("b").unwrap(), 1);
        assert_eq!(graph.branch_weight("a").unwrap(), 2);
        assert_eq!(graph.branch_weight("root").unwrap(), 3);
    }

    #[test]
    fn test_branch_weight_shared_child_counted_per_parent() {
        let graph = HierarchyBuilder::new()
            .node("p", NodeKind::Cluster, &["root"])
            .node("q", NodeKind::Cluster, &["root"])
            .node("shared", NodeKind::Usage, &["p", "q"])
            .node("leaf", NodeKind::Usage, &["shared"])
            .build();
        assert_eq!(graph.branch_weight("shared").unwrap(), 1);
        assert_eq!(graph.branch_weight("p").unwrap(), 2);
        // root: p(2) + q(2) + 2 direct children.
        assert_eq!(graph.branch_weight("root").unwrap(), 6);
    }

    #[test]
    fn test_branch_weight_tolerates_cycle() {
        let graph = HierarchyBuilder::new()
            .node("a", NodeKind::Usage, &["root"])
            .node("b", NodeKind::Usage, &["a"])
            .edge("b", "a", EdgeKind::Expansion)
            .build();
        // Terminates; the back edge contributes a direct child but no nested weight.
        assert_eq!(graph.branch_weight("a").unwrap(), 2);
    }

    #[test]
    fn test_branch_weight_is_memoized_until_invalidated() {
        let graph = layered();
        let a = graph.index_of("a").unwrap();
        graph.branch_weight_of(a);
        assert!(graph.caches.branch_weight.read().contains_key(&a));
        graph.invalidate_caches();
        assert!(graph.caches.branch_weight.read().is_empty());
    }

    #[test]
    fn test_descendant_generations_split_first_and_extended() {
        let graph = layered();
        let found = graph.descendant_hunks("a").unwrap();
        assert_eq!(found.first_generation, vec!["h1"]);
        assert_eq!(found.extended_generations, vec!["h2", "h3"]);
    }

    #[test]
    fn test_first_generation_skips_hops_without_hunks() {
        let graph = layered();
        let found = graph.descendant_hunks("root").unwrap();
        // hop 1 = {a}: no hunks. hop 2 = {b, h1, ctx}: first hunk hop.
        assert_eq!(found.first_generation, vec!["h1"]);
        assert_eq!(found.extended_generations, vec!["h2", "h3"]);
    }

    #[test]
    fn test_descendant_generations_disjoint_over_shared_hunk() {
        let mut snapshot = HierarchyBuilder::new()
            .node("a", NodeKind::Usage, &["root"])
            .node("b", NodeKind::Usage, &["a"])
            .snapshot();
        snapshot
            .nodes
            .push(HierarchyNode::new("h", NodeKind::Base(hunk("x.rs", 1))).with_parents(["a", "b"]));
        let graph = HierarchyGraph::from_snapshot(snapshot).unwrap();
        let found = graph.descendant_hunks("a").unwrap();
        assert_eq!(found.first_generation, vec!["h"]);
        assert!(found.extended_generations.is_empty(), "h must not appear twice");
    }

    #[test]
    fn test_descendants_of_hunk_are_empty() {
        let graph = layered();
        assert_eq!(graph.descendant_hunks("h3").unwrap(), DescendantHunks::default());
        assert!(graph.descendant_hunks("nope").is_err());
    }
}
