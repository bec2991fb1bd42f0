//! Engine lifecycle: Uninitialized → Ready → Stopping → Uninitialized.

use parking_lot::RwLock;
use tracing::{info, warn};

/// All possible engine lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Stopping,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Uninitialized => write!(f, "Uninitialized"),
            EngineState::Ready => write!(f, "Ready"),
            EngineState::Stopping => write!(f, "Stopping"),
        }
    }
}

impl EngineState {
    /// Returns whether transitioning from `self` to `next` is valid.
    pub fn can_transition_to(self, next: EngineState) -> bool {
        matches!(
            (self, next),
            (EngineState::Uninitialized, EngineState::Ready)
                | (EngineState::Ready, EngineState::Stopping)
                | (EngineState::Stopping, EngineState::Uninitialized)
        )
    }

    /// Work already dequeued may finish while stopping.
    pub fn accepts_work(self) -> bool {
        matches!(self, EngineState::Ready | EngineState::Stopping)
    }
}

/// Thread-safe lifecycle holder.
pub struct StateMachine {
    state: RwLock<EngineState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::Uninitialized),
        }
    }

    /// Current state (non-blocking read).
    pub fn current(&self) -> EngineState {
        *self.state.read()
    }

    /// Attempt a state transition. Returns Ok(new_state) or Err with reason.
    pub fn transition(&self, next: EngineState) -> Result<EngineState, String> {
        let mut state = self.state.write();
        let current = *state;
        if !current.can_transition_to(next) {
            let msg = format!("invalid transition: {} -> {}", current, next);
            warn!("{}", msg);
            return Err(msg);
        }
        *state = next;
        info!(from = %current, to = %next, "state_transition");
        Ok(next)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
