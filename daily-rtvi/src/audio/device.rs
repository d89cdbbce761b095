//! Full-duplex device wiring a driver to a transport.

use super::driver::AudioDriver;
use super::jitter::AudioOutput;
use super::relay::AudioInput;
use super::{AudioFormat, AudioSink, AudioSource};
use crate::config::TransportParams;
use crate::error::Result;
use std::sync::Arc;

/// Microphone capture plus bot playback over one driver.
///
/// Typically started from the session-connected callback and stopped from
/// the session-disconnected callback.
pub struct AudioDevice {
    input: AudioInput,
    output: AudioOutput,
}

impl AudioDevice {
    /// Wire `driver` capture into `sink` and `source` into driver playback,
    /// using the formats from `params`.
    pub fn new(
        driver: Arc<dyn AudioDriver>,
        sink: Arc<dyn AudioSink>,
        source: Arc<dyn AudioSource>,
        params: &TransportParams,
    ) -> Self {
        let input_format =
            AudioFormat::new(params.user_audio_sample_rate, params.user_audio_channels);
        let output_format =
            AudioFormat::new(params.bot_audio_sample_rate, params.bot_audio_channels);
        Self {
            input: AudioInput::new(Arc::clone(&driver), sink, input_format),
            output: AudioOutput::new(driver, source, output_format),
        }
    }

    /// Build from already configured halves.
    pub fn from_parts(input: AudioInput, output: AudioOutput) -> Self {
        Self { input, output }
    }

    /// Start capture, then playback. Capture is stopped again if playback
    /// fails to start.
    pub fn start(&self) -> Result<()> {
        self.input.start()?;
        if let Err(e) = self.output.start() {
            if let Err(stop_err) = self.input.stop() {
                tracing::warn!(error = %stop_err, "failed to roll back audio capture");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Stop both directions. Both are attempted; the first error is
    /// returned.
    pub fn stop(&self) -> Result<()> {
        let input = self.input.stop();
        let output = self.output.stop();
        input.and(output)
    }

    /// Capture half.
    pub fn input(&self) -> &AudioInput {
        &self.input
    }

    /// Playback half.
    pub fn output(&self) -> &AudioOutput {
        &self.output
    }

    /// Whether both directions are running.
    pub fn is_running(&self) -> bool {
        self.input.is_recording() && self.output.is_started()
    }
}
