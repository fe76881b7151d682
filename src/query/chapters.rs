use std::collections::HashSet;

use serde::Serialize;

use crate::error::Result;
use crate::graph::HierarchyGraph;
use crate::graph::node::{HierarchyNode, NodeKind, ReasonType};
use crate::query::narrative::Narrative;

/// A story entry, optionally nesting the chapters consumed by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub node_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_story: Vec<Chapter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub represents: Option<Vec<String>>,
}

impl Chapter {
    fn flat(narrative: &Narrative, id: &str) -> Self {
        let represented = narrative.represented_by(id);
        Self {
            node_id: id.to_owned(),
            sub_story: Vec::new(),
            represents: (!represented.is_empty()).then(|| represented.to_vec()),
        }
    }

    /// Ids this chapter stands for: its own plus any elided wrappers.
    fn ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.node_id.as_str())
            .chain(self.represents.iter().flatten().map(String::as_str))
    }
}

/// Which structurally significant nodes a pruned story nests its chapters under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterView {
    /// `USAGE` nodes not nested inside another usage pattern.
    Requirements,
    /// `COMMON` components whose reasons reference no context hunk.
    CommonHunks,
    /// `SIMILAR` components.
    Similar,
    /// Every `COMMON` component.
    CommonNodes,
}

impl ChapterView {
    pub const ALL: [ChapterView; 4] = [
        ChapterView::Requirements,
        ChapterView::CommonHunks,
        ChapterView::Similar,
        ChapterView::CommonNodes,
    ];

    /// Root-selection predicate for this view.
    pub fn is_root(&self, graph: &HierarchyGraph, node: &HierarchyNode) -> Result<bool> {
        let reason_type = node.component().map(|c| c.reason_type);
        match self {
            ChapterView::Requirements => {
                if !matches!(node.kind, NodeKind::Usage) {
                    return Ok(false);
                }
                for parent in &node.aggregator_ids {
                    if matches!(graph.node_by_id(parent)?.kind, NodeKind::Usage) {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ChapterView::CommonHunks => {
                let Some(info) = node.component() else {
                    return Ok(false);
                };
                if info.reason_type != ReasonType::Common {
                    return Ok(false);
                }
                // Reasons may be snippets rather than ids; only resolvable ids are checked.
                let cites_context = info.reasons.iter().any(|reason| {
                    graph
                        .node_by_id(reason)
                        .is_ok_and(HierarchyNode::is_context_hunk)
                });
                Ok(!cites_context)
            }
            ChapterView::Similar => Ok(reason_type == Some(ReasonType::Similar)),
            ChapterView::CommonNodes => Ok(reason_type == Some(ReasonType::Common)),
        }
    }
}

/// The four alternate granularity presentations of one narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrunedStories {
    pub requirements_story: Vec<Chapter>,
    pub common_hunks_story: Vec<Chapter>,
    pub similar_story: Vec<Chapter>,
    pub common_nodes_story: Vec<Chapter>,
}

impl PrunedStories {
    pub fn build(graph: &HierarchyGraph, narrative: &Narrative) -> Result<Self> {
        Ok(Self {
            requirements_story: prune_story(graph, narrative, ChapterView::Requirements)?,
            common_hunks_story: prune_story(graph, narrative, ChapterView::CommonHunks)?,
            similar_story: prune_story(graph, narrative, ChapterView::Similar)?,
            common_nodes_story: prune_story(graph, narrative, ChapterView::CommonNodes)?,
        })
    }

    pub fn view(&self, view: ChapterView) -> &[Chapter] {
        match view {
            ChapterView::Requirements => &self.requirements_story,
            ChapterView::CommonHunks => &self.common_hunks_story,
            ChapterView::Similar => &self.similar_story,
            ChapterView::CommonNodes => &self.common_nodes_story,
        }
    }
}

/// Nest the story under the roots selected by `view`.
///
/// Each root collects the aggregators reachable from it over `EXPANSION` edges (in story
/// order) into its `subStory`, followed by itself. Roots found inside another root's
/// subtree are dropped, and a chapter shared by two roots goes to the earlier one.
pub fn prune_story(
    graph: &HierarchyGraph,
    narrative: &Narrative,
    view: ChapterView,
) -> Result<Vec<Chapter>> {
    let chapters: Vec<Chapter> = narrative
        .story
        .iter()
        .map(|id| Chapter::flat(narrative, id))
        .collect();

    // Candidate roots, each with the story-ordered aggregators below it.
    let mut candidates: Vec<(usize, Vec<String>)> = Vec::new();
    for (pos, chapter) in chapters.iter().enumerate() {
        let mut matched = false;
        for id in chapter.ids() {
            if view.is_root(graph, graph.node_by_id(id)?)? {
                matched = true;
                break;
            }
        }
        if matched {
            let reachable = reachable_aggregators(graph, &chapter.node_id)?;
            let sub_ids: Vec<String> = narrative
                .story
                .iter()
                .filter(|id| reachable.contains(id.as_str()))
                .cloned()
                .collect();
            candidates.push((pos, sub_ids));
        }
    }

    // A candidate inside another candidate's subtree is not a root.
    let nested: HashSet<&str> = candidates
        .iter()
        .flat_map(|(_, subs)| subs.iter().map(String::as_str))
        .collect();
    let roots: Vec<&(usize, Vec<String>)> = candidates
        .iter()
        .filter(|(pos, _)| !nested.contains(chapters[*pos].node_id.as_str()))
        .collect();

    // The first root in story order claims a shared chapter.
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut sub_stories: Vec<Option<Vec<Chapter>>> = vec![None; chapters.len()];
    for (pos, subs) in roots {
        let mut sub_story: Vec<Chapter> = Vec::new();
        for id in subs {
            if claimed.insert(id.as_str()) {
                sub_story.push(Chapter::flat(narrative, id));
            }
        }
        sub_story.push(chapters[*pos].clone());
        sub_stories[*pos] = Some(sub_story);
    }

    let pruned: Vec<Chapter> = chapters
        .iter()
        .zip(sub_stories)
        .filter_map(|(chapter, sub_story)| match sub_story {
            Some(sub_story) => Some(Chapter {
                sub_story,
                ..chapter.clone()
            }),
            None if claimed.contains(chapter.node_id.as_str()) => None,
            None => Some(chapter.clone()),
        })
        .collect();

    tracing::debug!(
        ?view,
        roots = pruned.iter().filter(|c| !c.sub_story.is_empty()).count(),
        chapters = pruned.len(),
        "pruned story"
    );
    Ok(pruned)
}

/// Aggregators reachable from `id` by hops over `EXPANSION` edges, excluding `id` itself.
fn reachable_aggregators(graph: &HierarchyGraph, id: &str) -> Result<HashSet<String>> {
    let start = graph.index_of(id)?;
    let mut visited = HashSet::from([start]);
    let mut frontier = vec![start];
    let mut found: HashSet<String> = HashSet::new();

    while !frontier.is_empty() {
        let mut hop = Vec::new();
        for node in frontier {
            for child in graph.aggregator_children(node) {
                if visited.insert(child) {
                    found.insert(graph.graph[child].id.clone());
                    hop.push(child);
                }
            }
        }
        frontier = hop;
    }
    Ok(found)
}
