//! Page agent lifecycle.

use core::fmt;

/// Initialization state of a page agent.
///
/// ```text
/// Idle ──begin_init──▶ Initializing ──mark_ready──▶ Ready
///                           │
///                           └──mark_failed──▶ Failed (terminal)
/// ```
///
/// Only [`Ready`](AgentPhase::Ready) runs the tick loop. Transition methods
/// return `false` and leave the phase untouched when the move is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AgentPhase {
    /// Constructed, nothing started.
    #[default]
    Idle,
    /// Config requested, graph being built.
    Initializing,
    /// Graph built, tick loop running.
    Ready,
    /// Audio graph could not be constructed. Terminal.
    Failed,
}

impl AgentPhase {
    /// `Idle → Initializing`.
    pub fn begin_init(&mut self) -> bool {
        self.transition(Self::Idle, Self::Initializing)
    }

    /// `Initializing → Ready`.
    pub fn mark_ready(&mut self) -> bool {
        self.transition(Self::Initializing, Self::Ready)
    }

    /// `Initializing → Failed`.
    pub fn mark_failed(&mut self) -> bool {
        self.transition(Self::Initializing, Self::Failed)
    }

    /// Whether the tick loop should run.
    pub fn is_running(self) -> bool {
        self == Self::Ready
    }

    /// Whether the phase can never change again.
    pub fn is_terminal(self) -> bool {
        self == Self::Failed
    }

    fn transition(&mut self, from: Self, to: Self) -> bool {
        if *self != from {
            return false;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(from = %from, to = %to, "agent phase");
        *self = to;
        true
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
