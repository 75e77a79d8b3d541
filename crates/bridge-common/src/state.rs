//! Bridge lifecycle state machine.
//!
//! The bridge replaces process-wide globals with an explicit context
//! object, so its lifecycle is explicit too:
//! UNINIT → READY → TORN_DOWN → READY (re-init) ...

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeState {
    /// Constructed; registry and queue exist but nothing is wired up.
    #[default]
    Uninit,
    /// Initialized; ticks, samples and interpreter cycles are serviced.
    Ready,
    /// Torn down; registry cleared, sensors disabled, queue discarded.
    TornDown,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninit => write!(f, "UNINIT"),
            Self::Ready => write!(f, "READY"),
            Self::TornDown => write!(f, "TORN_DOWN"),
        }
    }
}

impl BridgeState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: BridgeState) -> bool {
        use BridgeState::{Ready, TornDown, Uninit};

        matches!(
            (self, target),
            (Uninit, Ready)
                | (Ready, TornDown)
                // Re-init after teardown
                | (TornDown, Ready)
                // Teardown of a never-initialized bridge is harmless
                | (Uninit, TornDown)
        )
    }

    /// Returns true if the bridge accepts registrations and cycles.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// State machine wrapper with transition history tracking.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    current: BridgeState,
    previous: Option<BridgeState>,
    transition_count: u64,
}

impl StateMachine {
    /// Create a new state machine starting in UNINIT.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    #[must_use]
    pub fn state(&self) -> BridgeState {
        self.current
    }

    /// Get the previous state (if any transition occurred).
    #[must_use]
    pub fn previous_state(&self) -> Option<BridgeState> {
        self.previous
    }

    /// Get total number of transitions.
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt a state transition.
    pub fn transition(&mut self, target: BridgeState) -> BridgeResult<()> {
        if self.current.can_transition_to(target) {
            self.previous = Some(self.current);
            self.current = target;
            self.transition_count += 1;
            Ok(())
        } else {
            Err(BridgeError::InvalidStateTransition {
                from: self.current.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Fail with [`BridgeError::NotReady`] unless the bridge is READY.
    pub fn require_ready(&self, operation: &str) -> BridgeResult<()> {
        if self.current.is_ready() {
            Ok(())
        } else {
            Err(BridgeError::NotReady(format!(
                "{operation} requires READY, bridge is {}",
                self.current
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.state(), BridgeState::Uninit);

        sm.transition(BridgeState::Ready).unwrap();
        sm.transition(BridgeState::TornDown).unwrap();
        sm.transition(BridgeState::Ready).unwrap();

        assert_eq!(sm.state(), BridgeState::Ready);
        assert_eq!(sm.previous_state(), Some(BridgeState::TornDown));
        assert_eq!(sm.transition_count(), 3);
    }

    #[test]
    fn test_double_init_rejected() {
        let mut sm = StateMachine::new();
        sm.transition(BridgeState::Ready).unwrap();

        let err = sm.transition(BridgeState::Ready).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidStateTransition {
                from: "READY".into(),
                to: "READY".into(),
            }
        );
        assert_eq!(sm.transition_count(), 1);
    }

    #[test]
    fn test_require_ready() {
        let mut sm = StateMachine::new();
        assert!(matches!(
            sm.require_ready("service"),
            Err(BridgeError::NotReady(_))
        ));

        sm.transition(BridgeState::Ready).unwrap();
        assert!(sm.require_ready("service").is_ok());

        sm.transition(BridgeState::TornDown).unwrap();
        assert!(sm.require_ready("service").is_err());
    }

    #[test]
    fn test_teardown_without_init() {
        let mut sm = StateMachine::new();
        assert!(sm.transition(BridgeState::TornDown).is_ok());
    }
}
