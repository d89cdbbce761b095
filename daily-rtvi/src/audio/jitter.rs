//! Playback path: a jitter buffer between a blocking producer and the
//! driver's real-time output callback.
//!
//! The buffer starts in [`PlaybackState::Priming`] and plays silence until
//! it holds at least two requested blocks and two production blocks worth
//! of frames. Any underrun while playing zero-fills the rest of the block
//! and drops back to priming, trading a little latency for fewer audible
//! gaps.

use super::driver::{AudioDriver, AudioStream, StreamStatus};
use super::{AudioFormat, AudioSource};
use crate::error::{Result, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// Frames pulled from the source per producer iteration (10 ms at 16 kHz).
pub const DEFAULT_BLOCK_FRAMES: usize = 160;

/// Whether the buffer is accumulating or serving audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Emitting silence until enough audio is buffered.
    Priming,
    /// Serving buffered audio.
    Playing,
}

#[derive(Debug)]
struct JitterState {
    samples: VecDeque<i16>,
    playback: PlaybackState,
}

/// Mutex-protected sample queue with priming hysteresis.
#[derive(Debug)]
pub struct JitterBuffer {
    state: Mutex<JitterState>,
    format: AudioFormat,
    block_frames: usize,
}

impl JitterBuffer {
    /// Create an empty buffer for producer blocks of `block_frames` frames.
    pub fn new(format: AudioFormat, block_frames: usize) -> Self {
        Self {
            state: Mutex::new(JitterState {
                samples: VecDeque::new(),
                playback: PlaybackState::Priming,
            }),
            format,
            block_frames,
        }
    }

    /// Append produced samples at the tail.
    pub fn append(&self, samples: &[i16]) {
        self.state.lock().samples.extend(samples.iter().copied());
    }

    /// Fill one output block from the head of the buffer.
    pub fn fill_output(&self, out: &mut [i16]) {
        let mut state = self.state.lock();

        if state.playback == PlaybackState::Priming {
            let requested_frames = self.format.frames_in(out.len());
            let threshold = self.format.samples_for(
                (requested_frames * 2).max(self.block_frames * 2),
            );
            if state.samples.len() < threshold {
                out.fill(0);
                return;
            }
            state.playback = PlaybackState::Playing;
        }

        let available = out.len().min(state.samples.len());
        for (dst, src) in out.iter_mut().zip(state.samples.drain(..available)) {
            *dst = src;
        }

        if available < out.len() {
            out[available..].fill(0);
            state.playback = PlaybackState::Priming;
        }
    }

    /// Current playback state.
    pub fn playback_state(&self) -> PlaybackState {
        self.state.lock().playback
    }

    /// Whole frames currently buffered.
    pub fn buffered_frames(&self) -> usize {
        self.format.frames_in(self.state.lock().samples.len())
    }

    /// Drop all buffered audio and return to priming.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.samples.clear();
        state.playback = PlaybackState::Priming;
    }
}

#[derive(Default)]
struct OutputHandles {
    stream: Option<Box<dyn AudioStream>>,
    producer: Option<JoinHandle<()>>,
}

/// Plays audio pulled from an [`AudioSource`] through the driver.
pub struct AudioOutput {
    driver: Arc<dyn AudioDriver>,
    source: Arc<dyn AudioSource>,
    format: AudioFormat,
    block_frames: usize,
    buffer: Arc<JitterBuffer>,
    running: Arc<AtomicBool>,
    handles: Mutex<OutputHandles>,
}

impl AudioOutput {
    /// Create a stopped output pulling [`DEFAULT_BLOCK_FRAMES`] at a time.
    pub fn new(
        driver: Arc<dyn AudioDriver>,
        source: Arc<dyn AudioSource>,
        format: AudioFormat,
    ) -> Self {
        Self::with_block_frames(driver, source, format, DEFAULT_BLOCK_FRAMES)
    }

    /// Create a stopped output with a custom production block size.
    pub fn with_block_frames(
        driver: Arc<dyn AudioDriver>,
        source: Arc<dyn AudioSource>,
        format: AudioFormat,
        block_frames: usize,
    ) -> Self {
        let block_frames = block_frames.max(1);
        Self {
            driver,
            source,
            format,
            block_frames,
            buffer: Arc::new(JitterBuffer::new(format, block_frames)),
            running: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(OutputHandles::default()),
        }
    }

    /// The shared jitter buffer.
    pub fn buffer(&self) -> &Arc<JitterBuffer> {
        &self.buffer
    }

    /// Open the output stream, then start the producer thread. No-op if
    /// already started.
    pub fn start(&self) -> Result<()> {
        let mut handles = self.handles.lock();
        if handles.stream.is_some() {
            return Ok(());
        }

        self.buffer.clear();
        let buffer = Arc::clone(&self.buffer);
        let callback = Box::new(move |out: &mut [i16]| {
            buffer.fill_output(out);
            StreamStatus::Continue
        });
        let mut stream = self.driver.open_output(self.format, callback)?;
        stream.start()?;

        self.running.store(true, Ordering::Release);
        let producer = ProducerLoop {
            source: Arc::clone(&self.source),
            buffer: Arc::clone(&self.buffer),
            running: Arc::clone(&self.running),
            format: self.format,
            block_frames: self.block_frames,
        };
        let spawned =
            std::thread::Builder::new().name("daily-rtvi-playback".into()).spawn(move || producer.run());

        match spawned {
            Ok(thread) => {
                handles.stream = Some(stream);
                handles.producer = Some(thread);
                tracing::debug!(block_frames = self.block_frames, "audio playback started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                if let Err(stop_err) = stream.stop() {
                    tracing::warn!(error = %stop_err, "failed to stop output stream after spawn failure");
                }
                Err(TransportError::audio(format!("failed to spawn playback thread: {e}")))
            }
        }
    }

    /// Stop the producer thread, then stop and close the output stream.
    pub fn stop(&self) -> Result<()> {
        let OutputHandles { stream, producer } = std::mem::take(&mut *self.handles.lock());

        self.running.store(false, Ordering::Release);
        if let Some(producer) = producer {
            if producer.join().is_err() {
                tracing::warn!("audio playback producer panicked");
            }
        }

        if let Some(mut stream) = stream {
            stream.stop()?;
            tracing::debug!("audio playback stopped");
        }
        Ok(())
    }

    /// Whether playback is running.
    pub fn is_started(&self) -> bool {
        self.handles.lock().stream.is_some()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "failed to stop audio playback");
        }
    }
}

struct ProducerLoop {
    source: Arc<dyn AudioSource>,
    buffer: Arc<JitterBuffer>,
    running: Arc<AtomicBool>,
    format: AudioFormat,
    block_frames: usize,
}

impl ProducerLoop {
    fn run(self) {
        let mut block = vec![0i16; self.format.samples_for(self.block_frames)];
        let idle = self.format.duration_of(self.block_frames);

        while self.running.load(Ordering::Acquire) {
            let frames = self.source.produce_frames(&mut block);
            if frames == 0 {
                // Source not connected yet; avoid spinning.
                std::thread::sleep(idle);
                continue;
            }
            let samples = self.format.samples_for(frames).min(block.len());
            self.buffer.append(&block[..samples]);
        }
    }
}
