//! Agent errors.

use thiserror::Error;
use volguard_core::AgentPhase;
use volguard_discovery::GraphError;

/// Why a page agent could not start.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The audio graph could not be built. The agent is now `Failed`.
    #[error("audio graph construction failed: {0}")]
    Graph(#[from] GraphError),

    /// `init` was called outside `Idle`.
    #[error("agent already {0}")]
    AlreadyStarted(AgentPhase),
}
