//! Capture path: microphone blocks straight into the engine.

use super::driver::{AudioDriver, AudioStream, StreamStatus};
use super::{AudioFormat, AudioSink};
use crate::error::Result;
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Relays captured microphone audio to an [`AudioSink`].
pub struct AudioInput {
    driver: Arc<dyn AudioDriver>,
    sink: Arc<dyn AudioSink>,
    format: AudioFormat,
    stream: Mutex<Option<Box<dyn AudioStream>>>,
}

impl AudioInput {
    /// Create a stopped input.
    pub fn new(driver: Arc<dyn AudioDriver>, sink: Arc<dyn AudioSink>, format: AudioFormat) -> Self {
        Self { driver, sink, format, stream: Mutex::new(None) }
    }

    /// Open and start the capture stream. No-op if already recording.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.stream.lock();
        if slot.is_some() {
            return Ok(());
        }

        let sink = Arc::clone(&self.sink);
        let callback = Box::new(move |samples: &[i16]| relay_block(sink.as_ref(), samples));
        let mut stream = self.driver.open_input(self.format, callback)?;
        // A stream that fails to start is dropped, which closes it.
        stream.start()?;

        *slot = Some(stream);
        tracing::debug!(sample_rate = self.format.sample_rate, "audio capture started");
        Ok(())
    }

    /// Stop and close the capture stream. No-op if not recording.
    pub fn stop(&self) -> Result<()> {
        let stream = self.stream.lock().take();
        if let Some(mut stream) = stream {
            stream.stop()?;
            tracing::debug!("audio capture stopped");
        }
        Ok(())
    }

    /// Whether the capture stream is open.
    pub fn is_recording(&self) -> bool {
        self.stream.lock().is_some()
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "failed to stop audio capture");
        }
    }
}

/// Driver callback body. Never blocks and never lets a panic escape.
fn relay_block(sink: &dyn AudioSink, samples: &[i16]) -> StreamStatus {
    if catch_unwind(AssertUnwindSafe(|| sink.deliver_captured_frames(samples))).is_err() {
        tracing::error!(samples = samples.len(), "audio sink panicked, block dropped");
    }
    StreamStatus::Continue
}
