//! Scene graph errors

use super::NodeId;
use crate::physics::PhysicsError;

/// Errors raised by structural scene operations
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// A fixed slot of this kind is already occupied
    #[error("node {parent:?} already has a `{kind}` component")]
    ComponentConflict {
        /// Node whose slot is occupied
        parent: NodeId,
        /// Conflicting kind
        kind: &'static str,
    },

    /// No component of the requested kind
    #[error("node {node:?} has no `{kind}` component")]
    ComponentNotFound {
        /// Node that was searched
        node: NodeId,
        /// Requested kind
        kind: &'static str,
    },

    /// An operation was attempted on a node in the wrong state
    #[error("structural precondition violated: {0}")]
    StructuralPrecondition(String),

    /// The id does not name a live node
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// Physics registration failed
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),
}

/// Result alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
