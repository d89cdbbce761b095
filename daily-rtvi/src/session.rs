//! Connection info handed to [`DailyTransport::connect`](crate::DailyTransport::connect).

use crate::error::{Result, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Room to join and the token authorizing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Daily room URL.
    pub room_url: String,
    /// Meeting token.
    pub token: String,
}

impl SessionInfo {
    /// Create session info.
    pub fn new(room_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { room_url: room_url.into(), token: token.into() }
    }

    /// Extract session info from the connection payload returned by a bot
    /// start endpoint. Extra fields are ignored.
    pub fn from_value(info: &Value) -> Result<Self> {
        let field = |name: &str| info.get(name).and_then(Value::as_str);
        match (field("room_url"), field("token")) {
            (Some(room_url), Some(token)) => Ok(Self::new(room_url, token)),
            _ => Err(TransportError::session_info("missing `room_url` or `token`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_ignores_extra_fields() {
        let info = SessionInfo::from_value(&json!({
            "room_url": "https://example.daily.co/room",
            "token": "abc",
            "config": []
        }))
        .unwrap();
        assert_eq!(info, SessionInfo::new("https://example.daily.co/room", "abc"));
    }

    #[test]
    fn test_missing_or_mistyped_fields_rejected() {
        for info in [
            json!({"room_url": "https://example.daily.co/room"}),
            json!({"token": "abc"}),
            json!({"room_url": 1, "token": "abc"}),
            json!("https://example.daily.co/room"),
            Value::Null,
        ] {
            let err = SessionInfo::from_value(&info).unwrap_err();
            assert!(matches!(err, TransportError::InvalidSessionInfo(_)), "{info}");
        }
    }
}
