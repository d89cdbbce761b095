//! RTVI protocol messages sent over the app-message channel.

use crate::config::RTVI_MESSAGE_LABEL;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An RTVI message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtviMessage {
    /// Unique message id.
    pub id: String,
    /// Protocol label, always `rtvi-ai` for messages this client sends.
    pub label: String,
    /// Message type, e.g. `client-ready`.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl RtviMessage {
    /// Create a message with a fresh id.
    pub fn new(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: RTVI_MESSAGE_LABEL.to_string(),
            message_type: message_type.into(),
            data,
        }
    }

    /// The handshake sent once the bot can hear us.
    pub fn client_ready() -> Self {
        Self::new("client-ready", Value::Object(Default::default()))
    }

    /// Whether this is a `client-ready` message.
    pub fn is_client_ready(&self) -> bool {
        self.message_type == "client-ready"
    }

    /// Encode as a JSON value for the outbound queue.
    pub fn to_value(&self) -> Value {
        // Plain string/object fields cannot fail to serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ready_shape() {
        let msg = RtviMessage::client_ready();
        let json = msg.to_value();
        assert_eq!(json["label"], "rtvi-ai");
        assert_eq!(json["type"], "client-ready");
        assert!(json["data"].is_object());
        assert_eq!(json["id"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(RtviMessage::client_ready().id, RtviMessage::client_ready().id);
    }

    #[test]
    fn test_parse_inbound_message() {
        let msg: RtviMessage = serde_json::from_str(
            r#"{"id":"1","label":"rtvi-ai","type":"bot-ready","data":{"version":"0.2"}}"#,
        )
        .unwrap();
        assert_eq!(msg.message_type, "bot-ready");
        assert!(!msg.is_client_ready());
        assert_eq!(msg.data["version"], "0.2");
    }
}
