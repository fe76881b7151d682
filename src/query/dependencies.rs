use std::collections::HashSet;

use petgraph::stable_graph::NodeIndex;

use crate::error::Result;
use crate::graph::HierarchyGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{HierarchyNode, NodeKind};

/// Per-variant generation capability: whether a node's description is produced by the
/// model on its own, and which nodes must have content before it can be produced.
pub trait Generative {
    /// True for patterns whose description is independently generated.
    fn should_generate(&self) -> bool;

    /// Immediate "depends-on" set of the node stored at `idx`.
    fn direct_dependencies(&self, graph: &HierarchyGraph, idx: NodeIndex) -> Vec<NodeIndex>;
}

impl Generative for HierarchyNode {
    fn should_generate(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Successive | NodeKind::Usage | NodeKind::Similarity
        )
    }

    fn direct_dependencies(&self, graph: &HierarchyGraph, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut deps = match self.kind {
            // A hunk is explained together with its enclosing context.
            NodeKind::Base(_)
            | NodeKind::LocationContext(_)
            | NodeKind::SemanticContext(_)
            | NodeKind::Extension(_) => graph.targets_of_kind(idx, EdgeKind::Context),
            NodeKind::Successive => {
                let mut deps = graph.expansion_targets(idx);
                let chain: Vec<NodeIndex> = deps
                    .iter()
                    .flat_map(|&child| graph.targets_of_kind(child, EdgeKind::Succession))
                    .collect();
                deps.extend(chain);
                deps
            }
            NodeKind::Usage => {
                let children = graph.expansion_targets(idx);
                let mut deps = children.clone();
                for child in children {
                    for definition in graph.sources_of_kind(child, EdgeKind::DefUse) {
                        deps.push(definition);
                        // The usage pattern that owns a definition must be described first.
                        deps.extend(
                            graph.graph[definition]
                                .aggregator_ids
                                .iter()
                                .filter_map(|id| graph.id_index.get(id).copied())
                                .filter(|&owner| {
                                    owner != idx
                                        && matches!(graph.graph[owner].kind, NodeKind::Usage)
                                }),
                        );
                    }
                }
                deps
            }
            NodeKind::Similarity
            | NodeKind::Component(_)
            | NodeKind::Singular
            | NodeKind::Cluster
            | NodeKind::Root => graph.expansion_targets(idx),
        };
        let mut seen = HashSet::new();
        deps.retain(|d| *d != idx && seen.insert(*d));
        deps
    }
}

impl HierarchyGraph {
    /// Every node transitively reached from `id`'s dependencies whose content is
    /// independently generated, in discovery order. Memoized per node.
    pub fn dependency_closure(&self, id: &str) -> Result<Vec<String>> {
        let idx = self.index_of(id)?;
        Ok(self
            .dependency_closure_of(idx)
            .into_iter()
            .map(|n| self.graph[n].id.clone())
            .collect())
    }

    pub fn dependency_closure_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        if let Some(found) = self.caches.dependency_closure.read().get(&idx) {
            return found.clone();
        }

        let mut closure: Vec<NodeIndex> = Vec::new();
        let mut visited: HashSet<NodeIndex> = HashSet::from([idx]);
        let mut stack: Vec<NodeIndex> = self.graph[idx].direct_dependencies(self, idx);
        stack.reverse();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            let data = &self.graph[node];
            if data.should_generate() {
                closure.push(node);
            }
            let mut next = data.direct_dependencies(self, node);
            next.retain(|n| !visited.contains(n));
            next.reverse();
            stack.extend(next);
        }

        self.caches
            .dependency_closure
            .write()
            .insert(idx, closure.clone());
        closure
    }

    /// Number of nodes across the hierarchy whose descriptions are generated on their own.
    pub fn generation_workload(&self) -> usize {
        self.nodes().filter(|n| n.should_generate()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::ReasonType;
    use crate::graph::test_support::{HierarchyBuilder, component};

    fn review() -> HierarchyGraph {
        // root -> comp -> {usage, succ}; usage -> use_h; succ -> {s1}; s1 -SUCCESSION-> s2
        // def_h (owned by def_usage) -DEF_USE-> use_h
        HierarchyBuilder::new()
            .node("comp", component(ReasonType::Common, &[]), &["root"])
            .node("usage", NodeKind::Usage, &["comp"])
            .node("succ", NodeKind::Successive, &["comp"])
            .node("def_usage", NodeKind::Usage, &["root"])
            .base("use_h", &["usage"])
            .base("def_h", &["def_usage"])
            .base("s1", &["succ"])
            .base("s2", &["succ"])
            .edge("def_h", "use_h", EdgeKind::DefUse)
            .edge("s1", "s2", EdgeKind::Succession)
            .build()
    }

    #[test]
    fn test_should_generate_only_for_patterns() {
        let graph = review();
        let generated: Vec<&str> = graph
            .nodes()
            .filter(|n| n.should_generate())
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(generated, vec!["usage", "succ", "def_usage"]);
        assert_eq!(graph.generation_workload(), 3);
    }

    #[test]
    fn test_usage_depends_on_definition_owner() {
        let graph = review();
        assert_eq!(graph.dependency_closure("usage").unwrap(), vec!["def_usage"]);
    }

    #[test]
    fn test_component_closure_collects_generated_descendants() {
        let graph = review();
        let closure = graph.dependency_closure("comp").unwrap();
        assert_eq!(closure, vec!["usage", "def_usage", "succ"]);
    }

    #[test]
    fn test_closure_excludes_subject_and_tolerates_sharing() {
        let graph = HierarchyBuilder::new()
            .node("a", NodeKind::Similarity, &["root"])
            .node("b", NodeKind::Similarity, &["root"])
            .node("shared", NodeKind::Usage, &["a", "b"])
            .build();
        assert_eq!(graph.dependency_closure("root").unwrap(), vec!["a", "shared", "b"]);
        assert_eq!(graph.dependency_closure("shared").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_closure_is_memoized() {
        let graph = review();
        let idx = graph.index_of("comp").unwrap();
        let first = graph.dependency_closure_of(idx);
        assert!(graph.caches.dependency_closure.read().contains_key(&idx));
        assert_eq!(graph.dependency_closure_of(idx), first);
        assert!(graph.dependency_closure("missing").is_err());
    }
}
