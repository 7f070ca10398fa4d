//! Relay timing and routing configuration

use serde::{Deserialize, Deserializer};
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::websocket::{DeliveryConfig, HandshakeConfig};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Seconds a new connection has to send its identity payload
    #[serde(default = "default_timeout_secs", deserialize_with = "lenient_secs")]
    pub handshake_timeout_secs: u64,

    /// Seconds allowed for a single outbound send
    #[serde(default = "default_timeout_secs", deserialize_with = "lenient_secs")]
    pub write_timeout_secs: u64,

    /// Upper bound on sends in flight across all rooms
    #[serde(default = "default_max_concurrent_deliveries")]
    pub max_concurrent_deliveries: usize,

    /// Reject handshakes with an empty connectionId or roomId
    #[serde(default)]
    pub require_identity_fields: bool,
}

impl RelayConfig {
    /// Handshake window as a duration
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Per-send write deadline as a duration
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Settings for the connection handshake
    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            timeout: self.handshake_timeout(),
            require_identity_fields: self.require_identity_fields,
        }
    }

    /// Settings for the room manager's delivery fan-out
    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            write_timeout: self.write_timeout(),
            max_concurrent_deliveries: self.max_concurrent_deliveries,
        }
    }

    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_deliveries == 0 {
            return Err(ValidationError::InvalidDeliveryLimit);
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: default_timeout_secs(),
            write_timeout_secs: default_timeout_secs(),
            max_concurrent_deliveries: default_max_concurrent_deliveries(),
            require_identity_fields: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_concurrent_deliveries() -> usize {
    1024
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SecsInput {
    Number(u64),
    Text(String),
}

/// Accepts a positive whole number of seconds; anything else falls back to
/// the default with a warning instead of failing startup.
fn lenient_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match SecsInput::deserialize(deserializer) {
        Ok(SecsInput::Number(n)) => Some(n),
        Ok(SecsInput::Text(s)) => s.trim().parse::<u64>().ok(),
        Err(_) => None,
    };

    match parsed {
        Some(secs) if secs > 0 => Ok(secs),
        _ => {
            tracing::warn!(
                default = DEFAULT_TIMEOUT_SECS,
                "invalid timeout value, using default seconds"
            );
            Ok(DEFAULT_TIMEOUT_SECS)
        }
    }
}
