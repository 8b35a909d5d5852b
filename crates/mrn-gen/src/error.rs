//! Compiler-pass error type.

use mrn_core::{LinkId, MovementId, NodeId};
use mrn_net::NetError;
use thiserror::Error;

/// Errors surfaced by the generation passes.
///
/// Lookup failures carry the pass/site that performed the lookup; they are
/// fatal for the compile, and the caller discards any partial network.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("link {id} not found ({context})")]
    LinkNotFound { id: LinkId, context: String },

    #[error("node {id} not found ({context})")]
    NodeNotFound { id: NodeId, context: String },

    #[error("movement {id} not found ({context})")]
    MovementNotFound { id: MovementId, context: String },

    /// A mesoscopic entity ended up with neither a parent link nor a parent
    /// node — a bug in a prior pass.
    #[error("bad parent information: {0}")]
    BadParentInfo(String),

    #[error("not implemented yet: {0}")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Net(#[from] NetError),
}

pub type GenResult<T> = Result<T, GenError>;

impl GenError {
    pub(crate) fn link_not_found(id: LinkId, context: impl Into<String>) -> Self {
        GenError::LinkNotFound { id, context: context.into() }
    }

    pub(crate) fn node_not_found(id: NodeId, context: impl Into<String>) -> Self {
        GenError::NodeNotFound { id, context: context.into() }
    }

    pub(crate) fn movement_not_found(id: MovementId, context: impl Into<String>) -> Self {
        GenError::MovementNotFound { id, context: context.into() }
    }
}
