//! The Daily transport: one call session driven through the native engine.

use crate::audio::{AudioSink, AudioSource};
use crate::callbacks::{MessageObserver, NoOpObserver, SessionObserver};
use crate::completion::{PendingOperations, RequestId};
use crate::config::{AboutClient, TransportConfig};
use crate::dispatch::EventDispatcher;
use crate::error::{Result, TransportError};
use crate::events::Participant;
use crate::native::{CallClient, CallClientDelegate, NativeEngine, VirtualMicrophone, VirtualSpeaker};
use crate::participants::ParticipantTracker;
use crate::queue::OutboundMessageQueue;
use crate::session::SessionInfo;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Lifecycle of a [`DailyTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Native devices not provisioned yet.
    Uninitialized,
    /// Ready to connect.
    Initialized,
    /// Configuring and joining the room.
    Connecting,
    /// In the room.
    Connected,
    /// Leaving the room.
    Disconnecting,
    /// Left the room; may connect again.
    Disconnected,
}

impl SessionState {
    /// Whether `initialize` has completed.
    pub fn is_initialized(self) -> bool {
        self != SessionState::Uninitialized
    }
}

struct Devices {
    speaker: Box<dyn VirtualSpeaker>,
    microphone: Box<dyn VirtualMicrophone>,
}

/// Builder for [`DailyTransport`].
pub struct DailyTransportBuilder {
    engine: Arc<dyn NativeEngine>,
    config: TransportConfig,
    observer: Option<Arc<dyn SessionObserver>>,
    message_observer: Option<Arc<dyn MessageObserver>>,
}

impl DailyTransportBuilder {
    /// Create a builder for a transport over `engine`.
    pub fn new(engine: Arc<dyn NativeEngine>) -> Self {
        Self { engine, config: TransportConfig::default(), observer: None, message_observer: None }
    }

    /// Set the transport configuration.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the session lifecycle observer.
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the inbound protocol message observer.
    pub fn message_observer(mut self, observer: Arc<dyn MessageObserver>) -> Self {
        self.message_observer = Some(observer);
        self
    }

    /// Build the transport (does not initialize or connect).
    pub fn build(self) -> DailyTransport {
        let observer = self.observer.unwrap_or_else(|| Arc::new(NoOpObserver));
        let completions = Arc::new(PendingOperations::new());
        let outbound = Arc::new(OutboundMessageQueue::new());
        let participants =
            Arc::new(ParticipantTracker::new(Arc::clone(&observer), Arc::clone(&outbound)));
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::clone(&completions),
            Arc::clone(&participants),
            self.message_observer,
            self.config.message_label.clone(),
        ));

        DailyTransport {
            engine: self.engine,
            config: self.config,
            observer,
            state: Mutex::new(SessionState::Uninitialized),
            init_lock: Mutex::new(()),
            devices: OnceLock::new(),
            client: Mutex::new(None),
            completions,
            outbound,
            participants,
            dispatcher,
        }
    }
}

/// Client-side session over the Daily call engine.
///
/// Turns the engine's fire-and-forget calls into awaited round-trips,
/// serializes outgoing app messages, tracks the bot participant and exposes
/// the virtual audio devices as an [`AudioSink`] / [`AudioSource`] pair.
///
/// # Example
///
/// ```rust,ignore
/// let transport = Arc::new(
///     DailyTransport::builder(engine)
///         .observer(Arc::new(MyObserver))
///         .message_observer(Arc::new(MyMessages))
///         .build(),
/// );
/// transport.initialize()?;
/// transport.connect(&start_response).await?;
/// transport.send_message(json!({"label": "rtvi-ai", "type": "action", "data": {}}));
/// transport.disconnect().await?;
/// ```
pub struct DailyTransport {
    engine: Arc<dyn NativeEngine>,
    config: TransportConfig,
    observer: Arc<dyn SessionObserver>,
    state: Mutex<SessionState>,
    init_lock: Mutex<()>,
    devices: OnceLock<Devices>,
    client: Mutex<Option<Arc<dyn CallClient>>>,
    completions: Arc<PendingOperations>,
    outbound: Arc<OutboundMessageQueue>,
    participants: Arc<ParticipantTracker>,
    dispatcher: Arc<EventDispatcher>,
}

impl DailyTransport {
    /// Create a new builder.
    pub fn builder(engine: Arc<dyn NativeEngine>) -> DailyTransportBuilder {
        DailyTransportBuilder::new(engine)
    }

    /// Create the engine context and the virtual speaker and microphone.
    /// Calling it again is a no-op.
    pub fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock();
        if self.devices.get().is_some() {
            return Ok(());
        }

        let params = &self.config.params;
        self.engine.set_log_level(self.config.native_log_level);
        self.engine.create_context(AboutClient::global())?;
        let speaker = self.engine.create_speaker(
            &self.config.speaker_device,
            params.bot_audio_sample_rate,
            params.bot_audio_channels,
        )?;
        let microphone = self.engine.create_microphone(
            &self.config.microphone_device,
            params.user_audio_sample_rate,
            params.user_audio_channels,
        )?;

        // Only this path sets the cell, and it runs under the init lock.
        let _ = self.devices.set(Devices { speaker, microphone });
        *self.state.lock() = SessionState::Initialized;
        tracing::debug!(
            speaker = %self.config.speaker_device,
            microphone = %self.config.microphone_device,
            "native devices created"
        );
        Ok(())
    }

    /// Join the room described by `info`, the connection payload holding
    /// `room_url` and `token`.
    ///
    /// Applies the subscription profiles, joins, then starts the outbound
    /// message worker. Returns immediately if already connected or
    /// connecting, without looking at `info`.
    pub async fn connect(&self, info: &Value) -> Result<()> {
        if self.devices.get().is_none() {
            return Err(TransportError::NotInitialized);
        }

        let (session, previous) = {
            let mut state = self.state.lock();
            match *state {
                SessionState::Connected | SessionState::Connecting => return Ok(()),
                SessionState::Uninitialized => return Err(TransportError::NotInitialized),
                SessionState::Disconnecting => {
                    return Err(TransportError::AlreadyRunning("disconnect".to_string()));
                }
                SessionState::Initialized | SessionState::Disconnected => {}
            }
            let session = SessionInfo::from_value(info)?;
            (session, std::mem::replace(&mut *state, SessionState::Connecting))
        };

        tracing::info!(room_url = %session.room_url, "connecting");
        if let Err(e) = self.establish(&session).await {
            tracing::warn!(error = %e, "connect failed");
            *self.state.lock() = previous;
            return Err(e);
        }

        *self.state.lock() = SessionState::Connected;
        tracing::info!(room_url = %session.room_url, "connected");
        self.observer.on_connected();
        Ok(())
    }

    async fn establish(&self, session: &SessionInfo) -> Result<()> {
        self.participants.reset();
        // Events delivered while joining may already queue client-ready.
        self.outbound.open();

        let delegate: Arc<dyn CallClientDelegate> = self.dispatcher.clone();
        let client: Arc<dyn CallClient> = match self.engine.create_call_client(delegate) {
            Ok(client) => Arc::from(client),
            Err(e) => {
                self.outbound.stop_detached();
                return Err(e);
            }
        };
        *self.client.lock() = Some(Arc::clone(&client));

        let result = self.configure(client.as_ref(), session).await.and_then(|()| {
            self.outbound.start(
                Arc::clone(&client),
                Arc::clone(&self.completions),
                self.config.completion_timeout,
            )
        });

        if result.is_err() {
            self.outbound.stop_detached();
            self.client.lock().take();
            self.completions.cancel_all();
        }
        result
    }

    async fn configure(&self, client: &dyn CallClient, session: &SessionInfo) -> Result<()> {
        let profiles = serde_json::to_string(&self.config.subscription_profiles)?;
        self.round_trip("update-subscription-profiles", |id| {
            client.update_subscription_profiles(id, &profiles)
        })
        .await?;

        let settings = serde_json::to_string(&self.config.client_settings)?;
        self.round_trip("join", |id| client.join(id, &session.room_url, &session.token, &settings))
            .await
    }

    /// Issue one native call and wait for its completion event.
    async fn round_trip(&self, operation: &'static str, call: impl FnOnce(RequestId)) -> Result<()> {
        let completion = self.completions.begin();
        let request_id = completion.id();
        tracing::debug!(request_id = %request_id, operation, "native request issued");
        call(request_id);
        if let Err(e) = completion.wait(self.config.completion_timeout).await {
            self.completions.abandon(request_id);
            return Err(e);
        }
        tracing::debug!(request_id = %request_id, operation, "native request completed");
        Ok(())
    }

    /// Leave the room. Returns immediately if not connected.
    ///
    /// The outbound worker finishes the send it is waiting on, queued
    /// messages are discarded, then `leave` is round-tripped. The session is
    /// torn down even if `leave` fails; that error is returned afterwards.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != SessionState::Connected {
                return Ok(());
            }
            *state = SessionState::Disconnecting;
        }
        tracing::info!("disconnecting");

        self.outbound.stop().await;

        let client = self.client.lock().clone();
        let left = match client {
            Some(client) => self.round_trip("leave", |id| client.leave(id)).await,
            None => Ok(()),
        };

        self.client.lock().take();
        self.completions.cancel_all();
        self.participants.reset();
        *self.state.lock() = SessionState::Disconnected;

        if let Err(e) = &left {
            tracing::warn!(error = %e, "leave did not complete");
        }
        tracing::info!("disconnected");
        self.observer.on_disconnected();
        left
    }

    /// Queue an app message for delivery. Returns `false` if it was dropped
    /// because the transport is not connected.
    pub fn send_message(&self, message: Value) -> bool {
        if !self.is_connected() {
            tracing::debug!("dropping app message: not connected");
            return false;
        }
        self.outbound.push(message)
    }

    /// Write captured user audio into the virtual microphone. Returns the
    /// number of frames accepted, 0 when not connected.
    pub fn send_user_audio(&self, samples: &[i16]) -> usize {
        match self.connected_devices() {
            Some(devices) => devices.microphone.write_frames(samples, self.completions.next_id()),
            None => 0,
        }
    }

    /// Read bot audio from the virtual speaker, blocking until the engine
    /// has some. Returns the number of frames read, 0 when not connected.
    pub fn read_bot_audio(&self, samples: &mut [i16]) -> usize {
        match self.connected_devices() {
            Some(devices) => devices.speaker.read_frames(samples, self.completions.next_id()),
            None => 0,
        }
    }

    fn connected_devices(&self) -> Option<&Devices> {
        if self.is_connected() { self.devices.get() } else { None }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Whether the transport is in the room.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// The participant currently taken as the bot.
    pub fn bot(&self) -> Option<Participant> {
        self.participants.bot()
    }

    /// The transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl AudioSink for DailyTransport {
    fn deliver_captured_frames(&self, samples: &[i16]) -> usize {
        self.send_user_audio(samples)
    }
}

impl AudioSource for DailyTransport {
    fn produce_frames(&self, samples: &mut [i16]) -> usize {
        self.read_bot_audio(samples)
    }
}

impl Drop for DailyTransport {
    fn drop(&mut self) {
        self.outbound.stop_detached();
        if self.client.lock().take().is_some() {
            tracing::debug!("releasing call client without leaving");
        }
        self.completions.cancel_all();
    }
}
