//! Handshake lifecycle phases.

use std::fmt;

use crate::domain::foundation::StateMachine;

/// Phase of a connection's initial handshake.
///
/// `AwaitingInit` is the only non-terminal phase. A failed handshake is
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    AwaitingInit,
    Ready,
    Failed,
}

impl StateMachine for HandshakePhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use HandshakePhase::*;
        matches!((self, target), (AwaitingInit, Ready) | (AwaitingInit, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use HandshakePhase::*;
        match self {
            AwaitingInit => vec![Ready, Failed],
            Ready | Failed => vec![],
        }
    }
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandshakePhase::AwaitingInit => "awaiting-init",
            HandshakePhase::Ready => "ready",
            HandshakePhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awaiting_init_can_become_ready_or_failed() {
        let phase = HandshakePhase::AwaitingInit;
        assert_eq!(phase.transition_to(HandshakePhase::Ready), Ok(HandshakePhase::Ready));
        assert_eq!(phase.transition_to(HandshakePhase::Failed), Ok(HandshakePhase::Failed));
    }

    #[test]
    fn failed_is_terminal() {
        assert!(HandshakePhase::Failed.is_terminal());
        assert!(HandshakePhase::Failed
            .transition_to(HandshakePhase::AwaitingInit)
            .is_err());
    }

    #[test]
    fn ready_cannot_fall_back() {
        assert!(HandshakePhase::Ready.is_terminal());
        assert!(HandshakePhase::Ready.transition_to(HandshakePhase::Failed).is_err());
    }

    #[test]
    fn display_uses_kebab_case() {
        assert_eq!(HandshakePhase::AwaitingInit.to_string(), "awaiting-init");
    }
}
