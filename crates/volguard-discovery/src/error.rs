//! Host and audio graph errors.

use thiserror::Error;

use crate::{ElementId, GainNodeId};

/// Failure reading or subscribing to the document.
#[derive(Debug, Error)]
pub enum HostError {
    /// The handle does not refer to a live node.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    /// The host refused the operation (cross-origin frame, sandboxed node).
    #[error("host denied access to {element}: {reason}")]
    Denied {
        /// Element the access was attempted on.
        element: ElementId,
        /// Host-supplied explanation.
        reason: String,
    },

    /// Observer installation failed.
    #[error("cannot observe {0}")]
    ObserveFailed(ElementId),
}

impl HostError {
    /// Create a denied-access error.
    pub fn denied(element: ElementId, reason: impl Into<String>) -> Self {
        Self::Denied {
            element,
            reason: reason.into(),
        }
    }
}

/// Failure building or driving the audio graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The element already feeds a source node elsewhere.
    #[error("{0} is already connected to an audio graph")]
    AlreadyConnected(ElementId),

    /// The platform will not create an audio context.
    #[error("audio graph unavailable: {0}")]
    Unavailable(String),

    /// The platform rejected a graph operation.
    #[error("graph operation rejected: {0}")]
    Rejected(String),

    /// The gain node handle is stale.
    #[error("unknown gain node {0:?}")]
    UnknownNode(GainNodeId),
}

impl GraphError {
    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Create a rejected error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_element() {
        let err = HostError::denied(ElementId(4), "cross-origin");
        assert_eq!(
            err.to_string(),
            "host denied access to element#4: cross-origin"
        );
        assert_eq!(
            GraphError::AlreadyConnected(ElementId(2)).to_string(),
            "element#2 is already connected to an audio graph"
        );
    }
}
