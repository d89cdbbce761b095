//! # daily-rtvi
//!
//! Daily call-engine transport for RTVI voice clients.
//!
//! The native engine exposes fire-and-forget calls whose results arrive
//! later as events on its own thread. This crate turns that surface into a
//! session a voice client can drive with plain `async` calls:
//!
//! - **Request correlation**: every native call carries a request id, and the
//!   matching `request-completed` event wakes the task awaiting it.
//! - **Ordered app messages**: a single drain worker sends queued messages
//!   one at a time, waiting for each completion before the next.
//! - **Event dispatch**: participant and app-message events drive the bot
//!   lifecycle and reach the application observers.
//! - **Audio**: capture is relayed straight to the engine's virtual
//!   microphone; playback runs through a jitter buffer fed from the virtual
//!   speaker.
//!
//! ## Architecture
//!
//! ```text
//!   application ──connect/send──▶ DailyTransport ──calls(id)──▶ native engine
//!        ▲                          │    ▲                          │
//!        │ observers                │    │ resolve(id)              │ events
//!        │                  OutboundMessageQueue                    ▼
//!        └────────────── ParticipantTracker ◀──── EventDispatcher ◀─┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use daily_rtvi::{AudioDevice, DailyTransport, TransportConfig};
//!
//! let transport = Arc::new(
//!     DailyTransport::builder(engine)
//!         .config(TransportConfig::new())
//!         .observer(Arc::new(app.clone()))
//!         .message_observer(Arc::new(app))
//!         .build(),
//! );
//! transport.initialize()?;
//! transport.connect(&start_response).await?;
//!
//! let device = AudioDevice::new(driver, transport.clone(), transport.clone(), &params);
//! device.start()?;
//! ```

pub mod audio;
pub mod callbacks;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod message;
pub mod native;
pub mod participants;
pub mod queue;
pub mod session;
pub mod telemetry;
pub mod transport;

// Re-exports
pub use audio::{AudioDevice, AudioDriver, AudioFormat, AudioSink, AudioSource, AudioStream};
pub use callbacks::{MessageObserver, NoOpObserver, SessionObserver};
pub use completion::{PendingCompletion, PendingOperations, RequestId};
pub use config::{AboutClient, RTVI_MESSAGE_LABEL, TransportConfig, TransportParams};
pub use dispatch::EventDispatcher;
pub use error::{Result, TransportError};
pub use events::{EventAction, NativeEvent, Participant, TrackState};
pub use message::RtviMessage;
pub use native::{
    CallClient, CallClientDelegate, NativeEngine, NativeLogLevel, VirtualMicrophone,
    VirtualSpeaker,
};
pub use participants::ParticipantTracker;
pub use queue::{MessageQueue, OutboundMessageQueue};
pub use session::SessionInfo;
pub use transport::{DailyTransport, DailyTransportBuilder, SessionState};
