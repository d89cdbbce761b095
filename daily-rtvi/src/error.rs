//! Error types for the Daily transport.

use crate::completion::RequestId;
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while driving the native call engine.
#[derive(Error, Debug)]
pub enum TransportError {
    /// `connect` was called before `initialize`.
    #[error("transport is not initialized")]
    NotInitialized,

    /// Connection info is missing or malformed.
    #[error("invalid connection info: {0}")]
    InvalidSessionInfo(String),

    /// Operation requires a connected session.
    #[error("transport is not connected")]
    NotConnected,

    /// The native engine failed to provision a resource.
    #[error("native engine error: {0}")]
    NativeError(String),

    /// The audio driver failed to open or start a stream.
    #[error("audio device error: {0}")]
    AudioError(String),

    /// A completion did not arrive within the configured bound.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A completion event referenced a request that was never issued.
    #[error("completion for unknown request {0}")]
    UnknownRequest(RequestId),

    /// The pending completion was dropped before it resolved.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// A component that allows a single worker was started twice.
    #[error("already running: {0}")]
    AlreadyRunning(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TransportError {
    /// Create a new invalid session info error.
    pub fn session_info<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSessionInfo(msg.into())
    }

    /// Create a new native engine error.
    pub fn native<S: Into<String>>(msg: S) -> Self {
        Self::NativeError(msg.into())
    }

    /// Create a new audio device error.
    pub fn audio<S: Into<String>>(msg: S) -> Self {
        Self::AudioError(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new cancellation error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        Self::Cancelled(msg.into())
    }
}
