//! Native call-engine surface consumed by the transport.
//!
//! The engine itself (codecs, networking, signaling) lives outside this
//! crate. These traits describe exactly the calls the transport makes and
//! the events it expects back, so the engine can be bound through FFI in
//! production and replaced by a recording fake in tests.
//!
//! Every method that takes a [`RequestId`] is asynchronous on the engine
//! side: it returns immediately and the engine later delivers a
//! `request-completed` event carrying the same id to the
//! [`CallClientDelegate`] the client was created with.

use crate::completion::RequestId;
use crate::config::AboutClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Verbosity of the engine's own logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NativeLogLevel {
    /// Engine logging disabled.
    #[default]
    Off,
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages.
    Info,
    /// Debug output.
    Debug,
    /// Everything.
    Trace,
}

/// Receives events raised by a [`CallClient`].
///
/// Called on the engine's own delivery thread, in delivery order.
pub trait CallClientDelegate: Send + Sync {
    /// Handle one JSON-encoded event record.
    fn on_event(&self, event_json: &str);
}

/// Process-level entry points of the native engine.
pub trait NativeEngine: Send + Sync {
    /// Set the engine's internal log level.
    fn set_log_level(&self, level: NativeLogLevel);

    /// Create the engine context, identifying this client library.
    fn create_context(&self, about: &AboutClient) -> Result<()>;

    /// Create a virtual speaker the engine plays remote audio into.
    fn create_speaker(
        &self,
        name: &str,
        sample_rate: u32,
        channels: u8,
    ) -> Result<Box<dyn VirtualSpeaker>>;

    /// Create a virtual microphone the engine captures local audio from.
    fn create_microphone(
        &self,
        name: &str,
        sample_rate: u32,
        channels: u8,
    ) -> Result<Box<dyn VirtualMicrophone>>;

    /// Create a call client delivering its events to `delegate`.
    fn create_call_client(
        &self,
        delegate: Arc<dyn CallClientDelegate>,
    ) -> Result<Box<dyn CallClient>>;
}

/// A single call session. Dropping the handle destroys the native client.
pub trait CallClient: Send + Sync {
    /// Update track subscription profiles (JSON object).
    fn update_subscription_profiles(&self, request_id: RequestId, profiles: &str);

    /// Join a room with the given client settings (JSON object).
    fn join(&self, request_id: RequestId, room_url: &str, token: &str, settings: &str);

    /// Leave the current room.
    fn leave(&self, request_id: RequestId);

    /// Broadcast an application message (JSON value) to all participants.
    fn send_app_message(&self, request_id: RequestId, payload: &str);
}

/// Engine-side sink for bot audio.
pub trait VirtualSpeaker: Send + Sync {
    /// Read up to `frames.len() / channels` frames, blocking until audio is
    /// available. Returns the number of frames read.
    fn read_frames(&self, frames: &mut [i16], request_id: RequestId) -> usize;
}

/// Engine-side source for user audio.
pub trait VirtualMicrophone: Send + Sync {
    /// Write interleaved frames. Returns the number of frames accepted.
    fn write_frames(&self, frames: &[i16], request_id: RequestId) -> usize;
}
