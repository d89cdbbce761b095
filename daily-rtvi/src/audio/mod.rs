//! Real-time audio paths between the platform audio driver and the engine.
//!
//! Two independent paths never touch the message queue:
//!
//! - **Capture**: the driver pushes microphone blocks into an
//!   [`AudioInput`], which hands them straight to an [`AudioSink`] (the
//!   transport's virtual microphone).
//! - **Playback**: an [`AudioOutput`] runs a producer thread pulling fixed
//!   blocks from an [`AudioSource`] (the transport's virtual speaker) into a
//!   [`JitterBuffer`], which the driver's output callback drains.

mod device;
mod driver;
mod jitter;
mod relay;

pub use device::AudioDevice;
pub use driver::{AudioDriver, AudioStream, CaptureCallback, PlaybackCallback, StreamStatus};
pub use jitter::{AudioOutput, DEFAULT_BLOCK_FRAMES, JitterBuffer, PlaybackState};
pub use relay::AudioInput;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interleaved signed 16-bit PCM stream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u8,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::pcm16_16khz()
    }
}

impl AudioFormat {
    /// Create a new format.
    pub fn new(sample_rate: u32, channels: u8) -> Self {
        Self { sample_rate, channels }
    }

    /// 16 kHz mono, the engine's default device format.
    pub fn pcm16_16khz() -> Self {
        Self { sample_rate: 16000, channels: 1 }
    }

    /// Channel count as a sample stride, never zero.
    pub fn stride(&self) -> usize {
        usize::from(self.channels.max(1))
    }

    /// Number of interleaved samples in `frames` frames.
    pub fn samples_for(&self, frames: usize) -> usize {
        frames * self.stride()
    }

    /// Number of whole frames in `samples` interleaved samples.
    pub fn frames_in(&self, samples: usize) -> usize {
        samples / self.stride()
    }

    /// Calculate bytes per second for this format.
    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * u32::from(self.channels) * 2
    }

    /// Playback time of `frames` frames.
    pub fn duration_of(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

/// Consumer of captured user audio.
pub trait AudioSink: Send + Sync {
    /// Deliver interleaved captured samples. Returns the number of frames
    /// accepted.
    fn deliver_captured_frames(&self, samples: &[i16]) -> usize;
}

/// Producer of bot audio for playback.
pub trait AudioSource: Send + Sync {
    /// Fill `samples` with interleaved audio. Returns the number of frames
    /// produced, which may be zero when nothing is available.
    fn produce_frames(&self, samples: &mut [i16]) -> usize;
}
