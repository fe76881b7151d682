use thiserror::Error;

/// Errors raised while building or querying a change hierarchy.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node id did not resolve. Callers treat this as a construction bug.
    #[error("node not found: {0}")]
    NotFound(String),
    /// The hierarchy has no `ROOT` node.
    #[error("hierarchy has no ROOT node")]
    MissingRoot,
    /// The hierarchy declares more than one `ROOT` node.
    #[error("hierarchy has more than one ROOT node: {0} and {1}")]
    MultipleRoots(String, String),
    /// Two nodes share the same id.
    #[error("duplicate node id: {0}")]
    DuplicateId(String),
    /// An edge references an id that is not in the node table.
    #[error("edge {source_id} -> {target_id} references an unknown node")]
    UnknownEdgeEndpoint { source_id: String, target_id: String },
    /// A node lists an aggregator id that is not in the node table.
    #[error("node {node} lists unknown aggregator {aggregator}")]
    UnknownAggregator { node: String, aggregator: String },
    /// The hierarchy JSON could not be decoded or encoded.
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
    /// I/O error while reading or writing a snapshot.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        GraphError::NotFound(id.into())
    }
}
