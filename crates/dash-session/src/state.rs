//! Lifecycle State Machine
//!
//! ```text
//! Idle ─▶ Creating ─▶ Attaching ─▶ Attached
//!   │        │            │           │
//!   │        ▼            ▼           ▼
//!   └──────▶ Attaching   Lost ◀──────┘
//!                         │
//!                         └─▶ Creating | Attaching (after the retry delay)
//! ```
//! A new attempt may supersede any in-flight one, so Creating, Attaching and
//! Attached can also move straight to Creating or Attaching.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Idle,
    /// Waiting for the backend to provision a session
    Creating,
    /// Waiting for the WebSocket handshake
    Attaching,
    /// Connection open, relaying I/O
    Attached,
    /// Connection gone, a retry is scheduled
    Lost,
}

impl LifecycleState {
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        use LifecycleState::*;

        match (self, target) {
            (_, Idle) => false,
            // Starting, retrying and superseding all begin a new attempt
            (_, Creating) | (_, Attaching) => true,
            (Attaching, Attached) => true,
            (Creating, Lost) | (Attaching, Lost) | (Attached, Lost) => true,
            _ => false,
        }
    }

    /// Whether a creation or attach is in flight
    pub fn is_pending(&self) -> bool {
        matches!(self, LifecycleState::Creating | LifecycleState::Attaching)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Creating => "creating",
            LifecycleState::Attaching => "attaching",
            LifecycleState::Attached => "attached",
            LifecycleState::Lost => "lost",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(LifecycleState::Idle.can_transition_to(LifecycleState::Creating));
        assert!(LifecycleState::Idle.can_transition_to(LifecycleState::Attaching));
        assert!(LifecycleState::Creating.can_transition_to(LifecycleState::Attaching));
        assert!(LifecycleState::Attaching.can_transition_to(LifecycleState::Attached));
        assert!(LifecycleState::Attached.can_transition_to(LifecycleState::Lost));
        assert!(LifecycleState::Lost.can_transition_to(LifecycleState::Creating));
        assert!(LifecycleState::Lost.can_transition_to(LifecycleState::Attaching));
        assert!(LifecycleState::Attached.can_transition_to(LifecycleState::Attaching));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!LifecycleState::Idle.can_transition_to(LifecycleState::Attached));
        assert!(!LifecycleState::Idle.can_transition_to(LifecycleState::Lost));
        assert!(!LifecycleState::Creating.can_transition_to(LifecycleState::Attached));
        assert!(!LifecycleState::Lost.can_transition_to(LifecycleState::Attached));
        assert!(!LifecycleState::Lost.can_transition_to(LifecycleState::Lost));
        assert!(!LifecycleState::Attached.can_transition_to(LifecycleState::Idle));
    }

    #[test]
    fn test_pending_states() {
        assert!(LifecycleState::Creating.is_pending());
        assert!(LifecycleState::Attaching.is_pending());
        assert!(!LifecycleState::Attached.is_pending());
        assert!(!LifecycleState::Lost.is_pending());
    }
}
