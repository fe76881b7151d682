use anyhow::Result;
use regex::RegexBuilder;

use crate::graph::HierarchyGraph;
use crate::graph::node::NodeType;

/// A single node matching a `find_nodes` pattern.
#[derive(Debug, Clone)]
pub struct FindResult {
    pub id: String,
    pub node_type: NodeType,
    pub title: Option<String>,
    /// `file:start-end` for hunks.
    pub location: Option<String>,
}

/// Find nodes whose id, title, or hunk file path matches `pattern` (a regex).
///
/// Results are returned in snapshot order.
pub fn find_nodes(
    graph: &HierarchyGraph,
    pattern: &str,
    case_insensitive: bool,
) -> Result<Vec<FindResult>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| anyhow::anyhow!("invalid pattern '{}': {}", pattern, e))?;

    let results = graph
        .nodes()
        .filter(|node| {
            re.is_match(&node.id)
                || node.title.as_deref().is_some_and(|t| re.is_match(t))
                || node.hunk().is_some_and(|h| re.is_match(&h.file_path))
        })
        .map(|node| FindResult {
            id: node.id.clone(),
            node_type: node.node_type(),
            title: node.title.clone(),
            location: node
                .hunk()
                .map(|h| format!("{}:{}-{}", h.file_path, h.start_line, h.end_line)),
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::NodeKind;
    use crate::graph::test_support::{HierarchyBuilder, hunk};

    fn graph() -> HierarchyGraph {
        let mut graph = HierarchyBuilder::new()
            .node("usage-1", NodeKind::Usage, &["root"])
            .node("h1", NodeKind::Base(hunk("src/Parser.rs", 4)), &["usage-1"])
            .build();
        graph.set_title("usage-1", "Thread the tokenizer through").unwrap();
        graph
    }

    #[test]
    fn test_find_by_id_title_and_path() {
        let graph = graph();
        let by_id = find_nodes(&graph, "^usage", false).unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].node_type, NodeType::Usage);

        let by_title = find_nodes(&graph, "tokenizer", false).unwrap();
        assert_eq!(by_title[0].id, "usage-1");

        let by_path = find_nodes(&graph, "parser", true).unwrap();
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].location.as_deref(), Some("src/Parser.rs:4-6"));
        assert!(find_nodes(&graph, "parser", false).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let graph = graph();
        assert!(find_nodes(&graph, "(", false).is_err());
    }
}
