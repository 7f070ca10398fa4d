//! State machine trait for lifecycle phase enums.
//!
//! Gives every phase enum the same validated `transition_to` so callers
//! cannot skip or reverse a lifecycle step by accident.

use super::ValidationError;

/// Trait for phase enums that represent state machines.
///
/// Implementors list their legal transitions; validated transitions and
/// terminal-state detection come for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for HandshakePhase {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (AwaitingInit, Ready) | (AwaitingInit, Failed))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             AwaitingInit => vec![Ready, Failed],
///             Ready | Failed => vec![],
///         }
///     }
/// }
///
/// let phase = HandshakePhase::AwaitingInit.transition_to(HandshakePhase::Ready)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
