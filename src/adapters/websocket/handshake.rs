//! Connection handshake: the first message decides who a client is.
//!
//! ```text
//!                 first message, valid ──▶ Ready(UserIdentity)
//! AwaitingInit ──┤
//!                 timer / bad payload / close ──▶ Failed(HandshakeError)
//! ```
//!
//! Exactly one of the timer or the first message wins. There are no
//! retries: a failed handshake dooms the connection.

use std::time::Duration;

use crate::domain::foundation::StateMachine;
use crate::domain::relay::{HandshakeError, HandshakePhase, UserIdentity};
use crate::ports::MessageSource;

/// Handshake settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// How long a new connection has to send its init payload.
    pub timeout: Duration,
    /// Reject identities with an empty `connectionId` or `roomId`.
    pub require_identity_fields: bool,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            require_identity_fields: false,
        }
    }
}

/// Wait for the init payload and parse it into an identity.
///
/// On error the caller owns closing the connection.
pub async fn perform_handshake<S>(
    source: &mut S,
    config: &HandshakeConfig,
) -> Result<UserIdentity, HandshakeError>
where
    S: MessageSource + ?Sized,
{
    let phase = HandshakePhase::AwaitingInit;
    tracing::debug!(timeout = ?config.timeout, phase = %phase, "waiting for init payload");

    let outcome = await_identity(source, config).await;

    let next = if outcome.is_ok() {
        HandshakePhase::Ready
    } else {
        HandshakePhase::Failed
    };
    // AwaitingInit has edges to both outcomes, so this cannot fail.
    let phase = phase.transition_to(next).unwrap_or(HandshakePhase::Failed);

    match &outcome {
        Ok(identity) => tracing::debug!(
            phase = %phase,
            connection_id = %identity.connection_id,
            room_id = %identity.room_id,
            "handshake complete"
        ),
        Err(e) => tracing::debug!(phase = %phase, reason = e.kind(), "handshake failed: {}", e),
    }

    outcome
}

async fn await_identity<S>(
    source: &mut S,
    config: &HandshakeConfig,
) -> Result<UserIdentity, HandshakeError>
where
    S: MessageSource + ?Sized,
{
    let first = tokio::time::timeout(config.timeout, source.next_message())
        .await
        .map_err(|_| HandshakeError::Timeout(config.timeout))?;

    let raw = match first {
        Some(result) => result?,
        None => return Err(HandshakeError::ConnectionClosed),
    };

    let identity: UserIdentity = serde_json::from_slice(&raw)?;
    if config.require_identity_fields {
        identity.validate()?;
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::relay::TransportError;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Source that replays scripted reads, then either closes or hangs.
    struct ScriptedSource {
        reads: VecDeque<Result<Vec<u8>, TransportError>>,
        hang_when_empty: bool,
    }

    impl ScriptedSource {
        fn sending(payload: &str) -> Self {
            Self {
                reads: VecDeque::from([Ok(payload.as_bytes().to_vec())]),
                hang_when_empty: false,
            }
        }

        fn silent() -> Self {
            Self {
                reads: VecDeque::new(),
                hang_when_empty: true,
            }
        }
    }

    #[async_trait]
    impl MessageSource for ScriptedSource {
        async fn next_message(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
            match self.reads.pop_front() {
                Some(read) => Some(read),
                None if self.hang_when_empty => std::future::pending().await,
                None => None,
            }
        }
    }

    #[tokio::test]
    async fn valid_payload_reaches_ready() {
        let mut source =
            ScriptedSource::sending(r#"{"connectionId":"c1","username":"alice","roomId":"r1"}"#);

        let identity = perform_handshake(&mut source, &HandshakeConfig::default())
            .await
            .unwrap();

        assert_eq!(identity, UserIdentity::new("c1", "alice", "r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out() {
        let mut source = ScriptedSource::silent();
        let config = HandshakeConfig {
            timeout: Duration::from_secs(10),
            ..Default::default()
        };

        let err = perform_handshake(&mut source, &config).await.unwrap_err();

        assert!(matches!(err, HandshakeError::Timeout(d) if d == Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn malformed_payload_fails() {
        let mut source = ScriptedSource::sending("{not json");

        let err = perform_handshake(&mut source, &HandshakeConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, HandshakeError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn close_before_payload_fails() {
        let mut source = ScriptedSource {
            reads: VecDeque::new(),
            hang_when_empty: false,
        };

        let err = perform_handshake(&mut source, &HandshakeConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, HandshakeError::ConnectionClosed));
    }

    #[tokio::test]
    async fn transport_error_fails() {
        let mut source = ScriptedSource {
            reads: VecDeque::from([Err(TransportError::Receive("reset".into()))]),
            hang_when_empty: false,
        };

        let err = perform_handshake(&mut source, &HandshakeConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, HandshakeError::Transport(TransportError::Receive(_))));
    }

    #[tokio::test]
    async fn empty_fields_are_accepted_by_default() {
        let mut source = ScriptedSource::sending("{}");

        let identity = perform_handshake(&mut source, &HandshakeConfig::default())
            .await
            .unwrap();

        assert!(identity.room_id.is_empty());
    }

    #[tokio::test]
    async fn empty_fields_rejected_when_required() {
        let mut source = ScriptedSource::sending(r#"{"connectionId":"c1","username":"a"}"#);
        let config = HandshakeConfig {
            require_identity_fields: true,
            ..Default::default()
        };

        let err = perform_handshake(&mut source, &config).await.unwrap_err();

        assert!(matches!(err, HandshakeError::InvalidIdentity(_)));
    }
}
