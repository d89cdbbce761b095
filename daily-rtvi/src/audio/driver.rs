//! Platform audio driver boundary.

use super::AudioFormat;
use crate::error::Result;

/// Value returned from a driver callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Keep the stream running.
    Continue,
    /// Finish the stream after this block.
    Complete,
}

/// Capture callback: receives one block of interleaved samples.
pub type CaptureCallback = Box<dyn FnMut(&[i16]) -> StreamStatus + Send>;

/// Playback callback: must fill the whole block before its deadline.
pub type PlaybackCallback = Box<dyn FnMut(&mut [i16]) -> StreamStatus + Send>;

/// Opens hardware streams. Callbacks run on the driver's real-time thread.
pub trait AudioDriver: Send + Sync {
    /// Open the default input device.
    fn open_input(
        &self,
        format: AudioFormat,
        callback: CaptureCallback,
    ) -> Result<Box<dyn AudioStream>>;

    /// Open the default output device.
    fn open_output(
        &self,
        format: AudioFormat,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn AudioStream>>;
}

/// An open driver stream. Dropping it closes the stream.
pub trait AudioStream: Send {
    /// Start invoking the callback.
    fn start(&mut self) -> Result<()>;

    /// Stop invoking the callback.
    fn stop(&mut self) -> Result<()>;
}
