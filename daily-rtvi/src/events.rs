//! Inbound event records raised by the native call client.
//!
//! The engine reports everything as a JSON object whose `action` field
//! selects the event kind. Decoding happens in two steps: the raw record is
//! parsed with serde, then `action` is looked up in a table built once from
//! [`EventAction::ALL`]. Lookup is by exact string equality, so unknown or
//! near-miss actions never alias a known one.

use crate::completion::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

// ── Participants ────────────────────────────────────────────────────────

/// State of a participant's media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    /// Permission or policy prevents the track.
    Blocked,
    /// Track is turned off.
    Off,
    /// Track can be sent but is not yet receivable.
    Sendable,
    /// Track is loading.
    Loading,
    /// Track was interrupted.
    Interrupted,
    /// Track is flowing and can be played.
    Playable,
    /// Any state this client does not know about.
    #[serde(other)]
    Unknown,
}

/// A single media track entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaTrack {
    /// Current track state.
    pub state: TrackState,
    /// Remaining engine-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Media state of a participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantMedia {
    /// Microphone track, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microphone: Option<MediaTrack>,
    /// Remaining tracks (camera, screen, custom).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Identity details of a participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    /// Whether this is the local participant.
    #[serde(default)]
    pub is_local: bool,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Remaining engine-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A call participant as reported by the engine.
///
/// Fields this layer does not interpret are kept in `extra` so callbacks
/// receive the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Session-unique participant id.
    pub id: String,
    /// Identity details.
    #[serde(default)]
    pub info: ParticipantInfo,
    /// Media state.
    #[serde(default)]
    pub media: ParticipantMedia,
    /// Remaining engine-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Participant {
    /// Create a remote participant with no media.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            info: ParticipantInfo::default(),
            media: ParticipantMedia::default(),
            extra: Map::new(),
        }
    }

    /// Whether this is the local participant.
    pub fn is_local(&self) -> bool {
        self.info.is_local
    }

    /// Current microphone state, if reported.
    pub fn microphone_state(&self) -> Option<TrackState> {
        self.media.microphone.as_ref().map(|m| m.state)
    }
}

// ── Actions ─────────────────────────────────────────────────────────────

/// Discriminator values this client handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventAction {
    /// A participant joined the call.
    ParticipantJoined,
    /// A participant's state changed.
    ParticipantUpdated,
    /// A participant left the call.
    ParticipantLeft,
    /// An app message arrived.
    AppMessage,
    /// The engine reported an error.
    Error,
    /// A previously issued request completed.
    RequestCompleted,
}

impl EventAction {
    /// Every known action, in table order.
    pub const ALL: [EventAction; 6] = [
        Self::ParticipantJoined,
        Self::ParticipantUpdated,
        Self::ParticipantLeft,
        Self::AppMessage,
        Self::Error,
        Self::RequestCompleted,
    ];

    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParticipantJoined => "participant-joined",
            Self::ParticipantUpdated => "participant-updated",
            Self::ParticipantLeft => "participant-left",
            Self::AppMessage => "app-message",
            Self::Error => "error",
            Self::RequestCompleted => "request-completed",
        }
    }

    /// Look up an action by its exact wire name.
    pub fn lookup(action: &str) -> Option<Self> {
        ACTION_TABLE.get(action).copied()
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static ACTION_TABLE: LazyLock<HashMap<&'static str, EventAction>> = LazyLock::new(|| {
    let mut table = HashMap::with_capacity(EventAction::ALL.len());
    for action in EventAction::ALL {
        let previous = table.insert(action.as_str(), action);
        assert!(previous.is_none(), "duplicate event action `{}`", action.as_str());
    }
    table
});

// ── Records ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RequestIdRecord {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    action: String,
    #[serde(default)]
    participant: Option<Participant>,
    #[serde(default)]
    left_reason: Option<String>,
    #[serde(default)]
    msg_data: Option<Value>,
    #[serde(default)]
    request_id: Option<RequestIdRecord>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// A decoded engine event.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    /// A participant joined.
    ParticipantJoined(Participant),
    /// A participant changed.
    ParticipantUpdated(Participant),
    /// A participant left, with the engine's reason.
    ParticipantLeft {
        /// The departing participant.
        participant: Participant,
        /// Human-readable reason.
        reason: String,
    },
    /// An app message with its `msgData` payload.
    AppMessage(Value),
    /// An engine error report.
    Error(Map<String, Value>),
    /// Completion of a native request.
    RequestCompleted(RequestId),
    /// An action this client does not handle.
    Unknown(String),
}

/// Why an event record could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    /// Not a JSON object with a string `action`.
    #[error("malformed event record: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A known action without the field it requires.
    #[error("`{action}` event is missing `{field}`")]
    MissingField {
        /// The action being decoded.
        action: EventAction,
        /// The absent field.
        field: &'static str,
    },
}

impl NativeEvent {
    /// Decode one JSON event record.
    pub fn from_json(event_json: &str) -> Result<Self, EventDecodeError> {
        let raw: RawEvent = serde_json::from_str(event_json)?;
        Self::from_raw(raw)
    }

    /// Decode an already parsed event record.
    pub fn from_value(event: Value) -> Result<Self, EventDecodeError> {
        let raw: RawEvent = serde_json::from_value(event)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEvent) -> Result<Self, EventDecodeError> {
        let Some(action) = EventAction::lookup(&raw.action) else {
            return Ok(Self::Unknown(raw.action));
        };
        let missing = |field| EventDecodeError::MissingField { action, field };

        Ok(match action {
            EventAction::ParticipantJoined => {
                Self::ParticipantJoined(raw.participant.ok_or_else(|| missing("participant"))?)
            }
            EventAction::ParticipantUpdated => {
                Self::ParticipantUpdated(raw.participant.ok_or_else(|| missing("participant"))?)
            }
            EventAction::ParticipantLeft => Self::ParticipantLeft {
                participant: raw.participant.ok_or_else(|| missing("participant"))?,
                reason: raw.left_reason.unwrap_or_default(),
            },
            EventAction::AppMessage => {
                Self::AppMessage(raw.msg_data.ok_or_else(|| missing("msgData"))?)
            }
            EventAction::Error => Self::Error(raw.rest),
            EventAction::RequestCompleted => Self::RequestCompleted(RequestId::new(
                raw.request_id.ok_or_else(|| missing("requestId"))?.id,
            )),
        })
    }

    /// The action this event was decoded from, if known.
    pub fn action(&self) -> Option<EventAction> {
        match self {
            Self::ParticipantJoined(_) => Some(EventAction::ParticipantJoined),
            Self::ParticipantUpdated(_) => Some(EventAction::ParticipantUpdated),
            Self::ParticipantLeft { .. } => Some(EventAction::ParticipantLeft),
            Self::AppMessage(_) => Some(EventAction::AppMessage),
            Self::Error(_) => Some(EventAction::Error),
            Self::RequestCompleted(_) => Some(EventAction::RequestCompleted),
            Self::Unknown(_) => None,
        }
    }
}
