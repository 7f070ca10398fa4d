//! WebSocket message types for room relay.
//!
//! Defines the protocol between server and connected clients:
//! - Client → Server → Client: routed envelopes (broadcast or targeted)
//! - Server → Client: membership snapshots (`user_list_update`)

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::relay::{ConnectionId, UserIdentity};

/// Wire `type` of the membership snapshot message.
pub const USER_LIST_UPDATE: &str = "user_list_update";

// ============================================
// Routed Envelope (Client ↔ Client)
// ============================================

/// Envelope for messages relayed between room members.
///
/// Any JSON object parses: `type` defaults to `""` and `payload` to `null`.
/// Extra top-level fields (the browser client puts `action`, `time` and
/// `text` there) are carried through untouched. An inbound `sender` of any
/// JSON type is discarded; the relay stamps it before forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedMessage {
    #[serde(rename = "type", default)]
    pub message_type: String,

    #[serde(default)]
    pub payload: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ConnectionId>,

    #[serde(
        default,
        deserialize_with = "discard_sender",
        skip_serializing_if = "Option::is_none"
    )]
    pub sender: Option<ConnectionId>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn discard_sender<'de, D>(deserializer: D) -> Result<Option<ConnectionId>, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(None)
}

impl RoutedMessage {
    /// Parses raw bytes as an envelope.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Overwrites whatever sender the client claimed.
    pub fn stamp_sender(&mut self, sender: &ConnectionId) {
        self.sender = Some(sender.clone());
    }

    /// Returns the delivery target, treating an empty string as absent.
    pub fn delivery_target(&self) -> Option<&ConnectionId> {
        self.target.as_ref().filter(|t| !t.is_empty())
    }

    /// Serializes the envelope for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ============================================
// Server → Client Messages
// ============================================

/// Messages originated by the server itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full roster of a room, sent on every membership change.
    UserListUpdate(UserListUpdateMessage),
}

/// Body of a `user_list_update` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListUpdateMessage {
    pub payload: UserListPayload,
}

/// Current members of a room. Clients replace their view wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListPayload {
    pub users: Vec<UserIdentity>,
}

impl ServerMessage {
    /// Builds a membership snapshot from the current roster.
    pub fn user_list(users: Vec<UserIdentity>) -> Self {
        ServerMessage::UserListUpdate(UserListUpdateMessage {
            payload: UserListPayload { users },
        })
    }

    /// Serializes the message for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_envelope() {
        let msg = RoutedMessage::parse(br#"{"type":"chat","payload":"hi"}"#).unwrap();

        assert_eq!(msg.message_type, "chat");
        assert_eq!(msg.payload, json!("hi"));
        assert!(msg.delivery_target().is_none());
        assert!(msg.extra.is_empty());
    }

    #[test]
    fn any_json_object_parses() {
        let msg = RoutedMessage::parse(b"{}").unwrap();

        assert_eq!(msg.message_type, "");
        assert!(msg.payload.is_null());
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(RoutedMessage::parse(b"\"hello\"").is_err());
        assert!(RoutedMessage::parse(b"[1,2,3]").is_err());
        assert!(RoutedMessage::parse(b"not json").is_err());
    }

    #[test]
    fn wrong_type_for_type_field_is_rejected() {
        assert!(RoutedMessage::parse(br#"{"type":42}"#).is_err());
    }

    #[test]
    fn empty_target_means_broadcast() {
        let msg = RoutedMessage::parse(br#"{"type":"x","target":""}"#).unwrap();
        assert!(msg.delivery_target().is_none());

        let msg = RoutedMessage::parse(br#"{"type":"x","target":"c2"}"#).unwrap();
        assert_eq!(msg.delivery_target().map(ConnectionId::as_str), Some("c2"));
    }

    #[test]
    fn stamp_sender_overwrites_forged_value() {
        let mut msg = RoutedMessage::parse(br#"{"type":"x","sender":"mallory"}"#).unwrap();
        msg.stamp_sender(&ConnectionId::from("c1"));

        let out: Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(out["sender"], "c1");
    }

    #[test]
    fn sender_of_any_type_is_discarded_on_input() {
        for raw in [
            &br#"{"type":"x","sender":1}"#[..],
            br#"{"type":"x","sender":{}}"#,
            br#"{"type":"x","sender":[]}"#,
            br#"{"type":"x","sender":null}"#,
            br#"{"type":"x","sender":"mallory"}"#,
        ] {
            let msg = RoutedMessage::parse(raw).unwrap();
            assert!(msg.sender.is_none());
            assert!(!msg.extra.contains_key("sender"));
        }
    }

    #[test]
    fn explicit_null_payload_is_kept() {
        let mut msg = RoutedMessage::parse(br#"{"type":"ping","payload":null}"#).unwrap();
        msg.stamp_sender(&ConnectionId::from("c1"));

        let out: Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(out, json!({"type": "ping", "payload": null, "sender": "c1"}));
    }

    #[test]
    fn extra_fields_survive_reserialization() {
        let mut msg =
            RoutedMessage::parse(br#"{"type":"video_action","action":"seek","time":12.5}"#)
                .unwrap();
        msg.stamp_sender(&ConnectionId::from("c1"));

        let out: Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(
            out,
            json!({
                "type": "video_action",
                "payload": null,
                "action": "seek",
                "time": 12.5,
                "sender": "c1"
            })
        );
    }

    #[test]
    fn user_list_update_wire_shape() {
        let msg = ServerMessage::user_list(vec![UserIdentity::new("c1", "alice", "r1")]);

        let out: Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(
            out,
            json!({
                "type": "user_list_update",
                "payload": {"users": [{"connectionId": "c1", "username": "alice", "roomId": "r1"}]}
            })
        );
        assert_eq!(out["type"], USER_LIST_UPDATE);
    }

    #[test]
    fn user_list_update_round_trips_for_clients() {
        let msg = ServerMessage::user_list(vec![
            UserIdentity::new("c1", "alice", "r1"),
            UserIdentity::new("c2", "bob", "r1"),
        ]);

        let parsed: ServerMessage = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }
}
