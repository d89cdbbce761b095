//! Tracking of the remote participant acting as the bot.
//!
//! The first remote participant seen after connecting is taken as the bot
//! and kept until it leaves or the session disconnects. Once the bot's
//! microphone becomes playable it can hear us, and a `client-ready` message
//! is queued to start the conversation.

use crate::callbacks::SessionObserver;
use crate::events::{Participant, TrackState};
use crate::message::RtviMessage;
use crate::queue::OutboundMessageQueue;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct BotSlot {
    bot: Option<Participant>,
    microphone: Option<TrackState>,
}

/// Bot identity and readiness state machine.
pub struct ParticipantTracker {
    slot: Mutex<BotSlot>,
    observer: Arc<dyn SessionObserver>,
    outbound: Arc<OutboundMessageQueue>,
}

impl ParticipantTracker {
    /// Create a tracker reporting to `observer` and queueing readiness
    /// signals on `outbound`.
    pub fn new(observer: Arc<dyn SessionObserver>, outbound: Arc<OutboundMessageQueue>) -> Self {
        Self { slot: Mutex::new(BotSlot::default()), observer, outbound }
    }

    /// The current bot, if one is assigned.
    pub fn bot(&self) -> Option<Participant> {
        self.slot.lock().bot.clone()
    }

    /// Forget the bot. Called on connect and disconnect.
    pub fn reset(&self) {
        *self.slot.lock() = BotSlot::default();
    }

    /// A participant joined.
    pub fn on_joined(&self, participant: Participant) {
        if participant.is_local() {
            return;
        }

        let assigned = {
            let mut slot = self.slot.lock();
            if slot.bot.is_some() {
                false
            } else {
                slot.bot = Some(participant.clone());
                // Readiness is detected on the first update, not the join.
                slot.microphone = None;
                true
            }
        };

        if assigned {
            tracing::info!(participant_id = %participant.id, "bot connected");
            self.observer.on_bot_connected(&participant);
        } else {
            tracing::debug!(participant_id = %participant.id, "ignoring additional remote participant");
        }
    }

    /// A participant's state changed.
    pub fn on_updated(&self, participant: Participant) {
        if participant.is_local() {
            return;
        }

        let mut slot = self.slot.lock();
        let is_bot = slot.bot.as_ref().is_some_and(|bot| bot.id == participant.id);
        if !is_bot {
            return;
        }

        let current = participant.microphone_state();
        slot.bot = Some(participant);
        // Updates without a microphone track say nothing about readiness.
        let Some(current) = current else {
            return;
        };

        if current == TrackState::Playable && slot.microphone != Some(TrackState::Playable) {
            // Pushed under the slot lock so each edge queues exactly once.
            if !self.outbound.push(RtviMessage::client_ready().to_value()) {
                tracing::debug!("client-ready dropped, waiting for the next playable update");
                return;
            }
            tracing::debug!("bot microphone playable, sent client-ready");
        }
        slot.microphone = Some(current);
    }

    /// A participant left. Only the bot's departure is reported.
    pub fn on_left(&self, participant: Participant, reason: &str) {
        let was_bot = {
            let mut slot = self.slot.lock();
            if slot.bot.as_ref().is_some_and(|bot| bot.id == participant.id) {
                *slot = BotSlot::default();
                true
            } else {
                false
            }
        };

        if was_bot {
            tracing::info!(participant_id = %participant.id, reason, "bot disconnected");
            self.observer.on_bot_disconnected(&participant, reason);
        } else {
            tracing::debug!(participant_id = %participant.id, reason, "non-bot participant left");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MediaTrack;
    use serde_json::Map;

    #[derive(Default)]
    struct Recorder {
        connected: Mutex<Vec<String>>,
        disconnected: Mutex<Vec<(String, String)>>,
    }

    impl SessionObserver for Recorder {
        fn on_bot_connected(&self, bot: &Participant) {
            self.connected.lock().push(bot.id.clone());
        }

        fn on_bot_disconnected(&self, bot: &Participant, reason: &str) {
            self.disconnected.lock().push((bot.id.clone(), reason.to_string()));
        }
    }

    fn tracker() -> (ParticipantTracker, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let tracker =
            ParticipantTracker::new(recorder.clone(), Arc::new(OutboundMessageQueue::new()));
        (tracker, recorder)
    }

    fn open_tracker() -> (ParticipantTracker, Arc<OutboundMessageQueue>) {
        let outbound = Arc::new(OutboundMessageQueue::new());
        outbound.open();
        let tracker = ParticipantTracker::new(Arc::new(Recorder::default()), outbound.clone());
        (tracker, outbound)
    }

    fn with_mic(id: &str, state: TrackState) -> Participant {
        let mut p = Participant::new(id);
        p.media.microphone = Some(MediaTrack { state, extra: Map::new() });
        p
    }

    #[test]
    fn test_first_remote_participant_is_bot() {
        let (tracker, recorder) = tracker();
        tracker.on_joined(Participant::new("p1"));
        tracker.on_joined(Participant::new("p2"));
        assert_eq!(tracker.bot().unwrap().id, "p1");
        assert_eq!(*recorder.connected.lock(), vec!["p1".to_string()]);
    }

    #[test]
    fn test_local_participant_is_never_bot() {
        let (tracker, recorder) = tracker();
        let mut local = Participant::new("me");
        local.info.is_local = true;
        tracker.on_joined(local);
        assert!(tracker.bot().is_none());
        assert!(recorder.connected.lock().is_empty());
    }

    #[test]
    fn test_update_of_other_participant_is_ignored() {
        let (tracker, _) = tracker();
        tracker.on_joined(Participant::new("p1"));
        tracker.on_updated(with_mic("p2", TrackState::Playable));
        assert_eq!(tracker.bot().unwrap().microphone_state(), None);
    }

    #[test]
    fn test_update_refreshes_bot_record() {
        let (tracker, _) = tracker();
        tracker.on_joined(Participant::new("p1"));
        tracker.on_updated(with_mic("p1", TrackState::Loading));
        assert_eq!(tracker.bot().unwrap().microphone_state(), Some(TrackState::Loading));
    }

    #[test]
    fn test_client_ready_once_per_playable_edge() {
        let (tracker, outbound) = open_tracker();
        tracker.on_joined(Participant::new("bot1"));
        tracker.on_updated(with_mic("bot1", TrackState::Playable));
        tracker.on_updated(with_mic("bot1", TrackState::Playable));
        assert_eq!(outbound.len(), 1);

        tracker.on_updated(with_mic("bot1", TrackState::Off));
        tracker.on_updated(with_mic("bot1", TrackState::Playable));
        assert_eq!(outbound.len(), 2);
    }

    #[test]
    fn test_update_without_microphone_keeps_readiness() {
        let (tracker, outbound) = open_tracker();
        tracker.on_joined(Participant::new("bot1"));
        tracker.on_updated(with_mic("bot1", TrackState::Playable));

        let mut renamed = Participant::new("bot1");
        renamed.info.user_name = Some("Bot".to_string());
        tracker.on_updated(renamed);
        assert_eq!(tracker.bot().unwrap().info.user_name.as_deref(), Some("Bot"));

        tracker.on_updated(with_mic("bot1", TrackState::Playable));
        assert_eq!(outbound.len(), 1);
    }

    #[test]
    fn test_dropped_client_ready_is_retried() {
        let outbound = Arc::new(OutboundMessageQueue::new());
        let tracker = ParticipantTracker::new(Arc::new(Recorder::default()), outbound.clone());
        tracker.on_joined(Participant::new("bot1"));
        tracker.on_updated(with_mic("bot1", TrackState::Playable));
        assert_eq!(outbound.len(), 0);

        outbound.open();
        tracker.on_updated(with_mic("bot1", TrackState::Playable));
        assert_eq!(outbound.len(), 1);
    }

    #[test]
    fn test_bot_left_clears_slot_and_reports() {
        let (tracker, recorder) = tracker();
        tracker.on_joined(Participant::new("bot1"));
        tracker.on_left(Participant::new("bot1"), "ended");
        assert!(tracker.bot().is_none());
        assert_eq!(
            *recorder.disconnected.lock(),
            vec![("bot1".to_string(), "ended".to_string())]
        );

        tracker.on_joined(Participant::new("bot2"));
        assert_eq!(tracker.bot().unwrap().id, "bot2");
    }

    #[test]
    fn test_other_participant_left_is_silent() {
        let (tracker, recorder) = tracker();
        tracker.on_left(Participant::new("ghost"), "ended");
        tracker.on_joined(Participant::new("bot1"));
        tracker.on_left(Participant::new("p2"), "hidden");
        assert!(recorder.disconnected.lock().is_empty());
        assert_eq!(tracker.bot().unwrap().id, "bot1");
    }

    #[test]
    fn test_reset_forgets_bot() {
        let (tracker, _) = tracker();
        tracker.on_joined(Participant::new("p1"));
        tracker.reset();
        assert!(tracker.bot().is_none());
    }
}
