use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::NodeIndex;
use serde::Serialize;

use crate::graph::HierarchyGraph;

/// The linear narrative over the aggregation hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    /// Aggregator ids in chapter order (postorder, heavier branches first, ROOT last).
    pub story: Vec<String>,
    /// Chapter id -> wrapper ids elided into it, innermost first.
    pub represents: HashMap<String, Vec<String>>,
}

struct Frame {
    node: NodeIndex,
    children: Vec<NodeIndex>,
    next: usize,
}

impl Narrative {
    /// Weighted depth-first postorder traversal of the `EXPANSION` hierarchy from ROOT.
    ///
    /// Children are narrated heaviest branch first (ties keep edge order). A non-root
    /// node whose only `EXPANSION` target is an aggregator is a wrapper: it is left out
    /// of the story and recorded as represented by the chapter that stands for its child.
    pub fn build(graph: &HierarchyGraph) -> Self {
        let root = graph.root();
        let mut story: Vec<NodeIndex> = Vec::new();
        let mut emitted: HashSet<NodeIndex> = HashSet::new();
        let mut on_stack: HashSet<NodeIndex> = HashSet::from([root]);
        let mut representative: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut elided: Vec<NodeIndex> = Vec::new();
        let mut stack: Vec<Frame> = vec![Self::frame(graph, root)];

        while let Some(top) = stack.last_mut() {
            if top.next < top.children.len() {
                let child = top.children[top.next];
                top.next += 1;
                if !emitted.contains(&child) && on_stack.insert(child) {
                    stack.push(Self::frame(graph, child));
                }
                continue;
            }

            let node = top.node;
            stack.pop();
            on_stack.remove(&node);

            let targets = graph.expansion_targets(node);
            let is_wrapper =
                node != root && targets.len() == 1 && graph.is_aggregator(targets[0]);
            if is_wrapper {
                let rep = representative
                    .get(&targets[0])
                    .copied()
                    .unwrap_or(targets[0]);
                representative.insert(node, rep);
                elided.push(node);
                emitted.insert(node);
            } else if emitted.insert(node) {
                story.push(node);
            }
        }

        let mut represents: HashMap<String, Vec<String>> = HashMap::new();
        for wrapper in elided {
            let rep = representative[&wrapper];
            represents
                .entry(graph.graph[rep].id.clone())
                .or_default()
                .push(graph.graph[wrapper].id.clone());
        }

        let story: Vec<String> = story
            .into_iter()
            .map(|idx| graph.graph[idx].id.clone())
            .collect();
        tracing::debug!(chapters = story.len(), elided = represents.len(), "built story");

        Self { story, represents }
    }

    fn frame(graph: &HierarchyGraph, node: NodeIndex) -> Frame {
        let mut children = graph.aggregator_children(node);
        // Stable: equal weights keep edge-encounter order.
        children.sort_by_key(|&child| Reverse(graph.branch_weight_of(child)));
        Frame {
            node,
            children,
            next: 0,
        }
    }

    /// Chapter position of `id`, or `None` when it is not a chapter (e.g. a raw hunk).
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.story.iter().position(|s| s == id)
    }

    /// Wrappers elided into chapter `id`.
    pub fn represented_by(&self, id: &str) -> &[String] {
        self.represents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.story.len()
    }

    pub fn is_empty(&self) -> bool {
        self.story.is_empty()
    }
}

type Listener = Box<dyn FnMut(Option<&str>) + Send>;

/// A cursor over a fixed story. Every move notifies subscribers with the new current id
/// (`None` means no chapter is selected).
pub struct StoryCursor {
    story: Vec<String>,
    position: Option<usize>,
    listeners: Vec<Listener>,
}

impl StoryCursor {
    pub fn new(story: Vec<String>) -> Self {
        Self {
            story,
            position: None,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(Option<&str>) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn current(&self) -> Option<&str> {
        self.position
            .and_then(|p| self.story.get(p))
            .map(String::as_str)
    }

    pub fn first(&mut self) -> Option<&str> {
        let target = if self.story.is_empty() { None } else { Some(0) };
        self.move_to(target)
    }

    /// Advance one chapter; stays on the last chapter at the end.
    pub fn next(&mut self) -> Option<&str> {
        let target = match self.position {
            None if self.story.is_empty() => None,
            None => Some(0),
            Some(p) => Some((p + 1).min(self.story.len() - 1)),
        };
        self.move_to(target)
    }

    /// Step back one chapter; stays on the first chapter at the start.
    pub fn previous(&mut self) -> Option<&str> {
        let target = self.position.map(|p| p.saturating_sub(1));
        self.move_to(target)
    }

    /// Jump to `index`. Out of range leaves the cursor where it is and returns `None`.
    pub fn goto_index(&mut self, index: usize) -> Option<&str> {
        if index >= self.story.len() {
            return None;
        }
        self.move_to(Some(index))
    }

    /// Select an externally chosen id. Ids outside the story clear the selection.
    pub fn select(&mut self, id: &str) -> Option<usize> {
        let target = self.story.iter().position(|s| s == id);
        self.move_to(target);
        target
    }

    fn move_to(&mut self, target: Option<usize>) -> Option<&str> {
        self.position = target;
        let current = self
            .position
            .and_then(|p| self.story.get(p))
            .map(String::as_str);
        for listener in &mut self.listeners {
            listener(current);
        }
        current
    }
}
