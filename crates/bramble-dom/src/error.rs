//! Hard errors raised by tree operations.

use thiserror::Error;

use crate::NodeId;

/// A precondition violation or a resource limit hit by a tree operation.
///
/// Malformed markup never produces one of these; the parser records those
/// problems as soft errors instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The reference node is not a child of the node being modified.
    #[error("node {reference:?} is not a child of node {parent:?}")]
    NotAChild {
        /// Node whose children were searched.
        parent: NodeId,
        /// Node that was expected among them.
        reference: NodeId,
    },

    /// Text, comment and other leaf nodes cannot hold children.
    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),

    /// The operation needs an element.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// The operation needs a text or comment node.
    #[error("node {0:?} does not hold text")]
    NotText(NodeId),

    /// Inserting the node would make it its own ancestor, or move the document node.
    #[error("node {node:?} cannot be inserted under node {parent:?}")]
    WouldCycle {
        /// Node being inserted.
        node: NodeId,
        /// Intended parent.
        parent: NodeId,
    },

    /// The handle does not belong to this tree.
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// Id lookups need `use_id_attribute` enabled.
    #[error("the id index is disabled; enable use_id_attribute to look up nodes by id")]
    IdIndexDisabled,

    /// Element and attribute names must not be empty.
    #[error("{0:?} is not a valid name")]
    InvalidName(String),

    /// Nesting went past the configured `max_depth`.
    #[error("The document is too complex to parse: depth limit of {limit} exceeded")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
}
