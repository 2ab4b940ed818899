use super::node::NodeId;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// Error during parsing (e.g., syntax error)
    ParseError {
        /// A human-readable message explaining the error
        message: String,
        /// The line number (1-based)
        line: usize,
        /// The column number (1-based)
        column: usize,
        /// The snippet of input where the error occurred
        snippet: String,
    },
    /// Logical error (e.g., invalid operation on this kind of node)
    LogicError(String),
    /// No live node with this id
    NodeNotFound(NodeId),
    /// A named tip is not in the tree
    MissingTaxon(String),
    /// A new tip would repeat an existing taxon name
    DuplicateTaxon(String),
    /// Non-positive or non-finite factor, threshold or location
    InvalidFactor { what: &'static str, value: f64 },
    /// Fewer than 2 tips would remain
    InsufficientTaxa(usize),
    /// An outgroup taxon is not in the tree
    UnknownOutgroup(String),
    /// `parent` is `node` itself or one of its descendants
    Cycle { node: NodeId, parent: NodeId },
    /// The root has no parent to detach from
    RootDetach(NodeId),
    /// The node must be detached before it can be attached elsewhere
    AlreadyAttached { node: NodeId, parent: NodeId },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::ParseError {
                message,
                line,
                column,
                snippet,
            } => {
                write!(
                    f,
                    "Parse error at line {}, column {}:\n{}\nSnippet: \"{}\"",
                    line, column, message, snippet
                )
            }
            TreeError::LogicError(msg) => write!(f, "Tree logic error: {}", msg),
            TreeError::NodeNotFound(id) => write!(f, "Node {} not found or deleted", id),
            TreeError::MissingTaxon(name) => write!(f, "Taxon, {}, not found in tree", name),
            TreeError::DuplicateTaxon(name) => {
                write!(f, "Taxon, {}, is already present in tree", name)
            }
            TreeError::InvalidFactor { what, value } => {
                write!(f, "Invalid {}: {} (should be > 0.0)", what, value)
            }
            TreeError::InsufficientTaxa(n) => write!(
                f,
                "At least 2 taxa must remain in the tree, found {}",
                n
            ),
            TreeError::UnknownOutgroup(name) => {
                write!(f, "Outgroup, {}, not found in the tree", name)
            }
            TreeError::Cycle { node, parent } => write!(
                f,
                "Cannot attach node {} under {}: would create a cycle",
                node, parent
            ),
            TreeError::RootDetach(id) => write!(f, "Cannot detach root node {}", id),
            TreeError::AlreadyAttached { node, parent } => {
                write!(f, "Node {} already has parent {}", node, parent)
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// What to do when a named taxon is not found in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Stop with `TreeError::MissingTaxon` before anything is changed
    #[default]
    Fail,
    /// Leave the name out and count it
    Skip,
}

impl MissingPolicy {
    pub fn from_ignore(ignore_missing: bool) -> Self {
        if ignore_missing {
            MissingPolicy::Skip
        } else {
            MissingPolicy::Fail
        }
    }
}
