//! Callback interfaces implemented by the application.
//!
//! Session lifecycle and inbound protocol messages are separate
//! capabilities, so an application can observe one without the other.
//! Callbacks run on whichever thread produced them (the caller of
//! `connect`/`disconnect`, or the engine's event thread) and should return
//! quickly.

use crate::events::Participant;
use serde_json::Value;

/// Observer of session and bot lifecycle.
pub trait SessionObserver: Send + Sync {
    /// The transport joined the room.
    fn on_connected(&self) {}

    /// The transport left the room.
    fn on_disconnected(&self) {}

    /// The first remote participant joined and was taken as the bot.
    fn on_bot_connected(&self, _bot: &Participant) {}

    /// The bot left the room.
    fn on_bot_disconnected(&self, _bot: &Participant, _reason: &str) {}
}

/// Observer of inbound protocol messages.
pub trait MessageObserver: Send + Sync {
    /// An app message with the recognized label arrived. `message` is the
    /// whole `msgData` object.
    fn on_transport_message(&self, message: &Value);
}

/// Default no-op observer.
#[derive(Debug, Clone, Default)]
pub struct NoOpObserver;

impl SessionObserver for NoOpObserver {}

impl MessageObserver for NoOpObserver {
    fn on_transport_message(&self, _message: &Value) {}
}
