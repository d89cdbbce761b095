//! Routing of native events to the components that handle them.

use crate::callbacks::MessageObserver;
use crate::completion::PendingOperations;
use crate::events::NativeEvent;
use crate::native::CallClientDelegate;
use crate::participants::ParticipantTracker;
use serde_json::Value;
use std::sync::Arc;

/// Decodes engine events and routes them by action.
///
/// Runs on the engine's delivery thread. Unknown actions, engine error
/// reports and app messages with a foreign label are dropped.
pub struct EventDispatcher {
    completions: Arc<PendingOperations>,
    participants: Arc<ParticipantTracker>,
    message_observer: Option<Arc<dyn MessageObserver>>,
    message_label: String,
}

impl EventDispatcher {
    /// Create a dispatcher.
    pub fn new(
        completions: Arc<PendingOperations>,
        participants: Arc<ParticipantTracker>,
        message_observer: Option<Arc<dyn MessageObserver>>,
        message_label: impl Into<String>,
    ) -> Self {
        Self { completions, participants, message_observer, message_label: message_label.into() }
    }

    /// Handle one decoded event.
    pub fn dispatch(&self, event: NativeEvent) {
        match event {
            NativeEvent::ParticipantJoined(participant) => self.participants.on_joined(participant),
            NativeEvent::ParticipantUpdated(participant) => {
                self.participants.on_updated(participant)
            }
            NativeEvent::ParticipantLeft { participant, reason } => {
                self.participants.on_left(participant, &reason)
            }
            NativeEvent::AppMessage(msg_data) => self.on_app_message(&msg_data),
            NativeEvent::RequestCompleted(request_id) => {
                if let Err(e) = self.completions.resolve(request_id) {
                    tracing::error!(request_id = %request_id, error = %e, "request correlation failed");
                }
            }
            NativeEvent::Error(details) => {
                tracing::debug!(?details, "native engine reported an error");
            }
            NativeEvent::Unknown(action) => {
                tracing::trace!(action = %action, "ignoring unhandled native event");
            }
        }
    }

    fn on_app_message(&self, msg_data: &Value) {
        let label = msg_data.get("label").and_then(Value::as_str);
        if label != Some(self.message_label.as_str()) {
            return;
        }
        if let Some(observer) = &self.message_observer {
            observer.on_transport_message(msg_data);
        }
    }
}

impl CallClientDelegate for EventDispatcher {
    fn on_event(&self, event_json: &str) {
        match NativeEvent::from_json(event_json) {
            Ok(event) => self.dispatch(event),
            Err(e) => tracing::warn!(error = %e, "dropping undecodable native event"),
        }
    }
}
