//! Error types for fact-graph resolution.

/// Boxed error raised inside a node's compute function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration errors raised while resolving a fact graph.
///
/// All of these are fatal to the resolution run that raised them.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A node id was requested that the graph does not declare.
    #[error("node not found: {id}{}", requested_suffix(.requested_by))]
    NodeNotFound {
        id: String,
        requested_by: Option<String>,
    },

    /// A node was requested while it was still being computed.
    #[error("cyclic dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// Two nodes were declared with the same id.
    #[error("duplicate node: {id}")]
    DuplicateNode { id: String },

    /// A compute function failed for a reason of its own.
    #[error("node {node} failed: {source}")]
    Compute {
        node: String,
        #[source]
        source: BoxError,
    },
}

fn requested_suffix(requested_by: &Option<String>) -> String {
    match requested_by {
        Some(parent) => format!(" (requested by {parent})"),
        None => String::new(),
    }
}

impl GraphError {
    pub fn compute(node: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GraphError::Compute {
            node: node.into(),
            source: source.into(),
        }
    }
}
