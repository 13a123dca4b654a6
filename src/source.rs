//! Audio source contract and in-tree synthetic test fixtures — §6.
//!
//! Real ingestion (microphone capture, file decoding) is an external
//! collaborator (§1); the four generators here exist purely to drive the
//! pipeline end to end in tests and examples.

use std::future::Future;
use std::pin::Pin;

use rand::Rng;

use crate::config::AudioConfig;
use crate::error::Result;
use crate::frame::AudioFrame;

/// Blocking frame source, consumed by `Pipeline::run`.
pub trait AudioSource {
    fn config(&self) -> AudioConfig;

    /// Produce the next frame, or `Ok(None)` when the source is exhausted.
    /// A source fault terminates iteration with `Err`.
    fn next_frame(&mut self) -> Result<Option<AudioFrame>>;

    /// Idempotent; releases any underlying resource.
    fn close(&mut self);
}

/// Async counterpart, consumed by `Pipeline::run_async`.
pub trait AsyncAudioSource: Send {
    fn config(&self) -> AudioConfig;

    fn next_frame(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AudioFrame>>> + Send + '_>>;

    fn close(&mut self);
}

/// Shared frame-id/timestamp bookkeeping for the synthetic sources below.
struct Cursor {
    config: AudioConfig,
    frame_id: u64,
    total_frames: u64,
    closed: bool,
}

impl Cursor {
    fn new(config: AudioConfig, duration_ms: u64) -> Self {
        let total_frames = duration_ms / config.frame_duration_ms as u64;
        Self {
            config,
            frame_id: 0,
            total_frames,
            closed: false,
        }
    }

    fn next(&mut self) -> Option<(u64, u64)> {
        if self.closed || self.frame_id >= self.total_frames {
            return None;
        }
        let id = self.frame_id;
        let timestamp_ms = id * self.config.frame_duration_ms as u64;
        self.frame_id += 1;
        Some((id, timestamp_ms))
    }
}

/// A pure 0.5-amplitude (configurable) sine tone at a fixed frequency.
pub struct SineSource {
    cursor: Cursor,
    freq_hz: f32,
    amplitude: f32,
}

impl SineSource {
    pub fn new(config: AudioConfig, freq_hz: f32, amplitude: f32, duration_ms: u64) -> Self {
        Self {
            cursor: Cursor::new(config, duration_ms),
            freq_hz,
            amplitude,
        }
    }
}

impl AudioSource for SineSource {
    fn config(&self) -> AudioConfig {
        self.cursor.config
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        let config = self.cursor.config;
        let Some((id, timestamp_ms)) = self.cursor.next() else {
            return Ok(None);
        };
        let sample_rate = config.sample_rate as f32;
        let phase_offset = id as f32 * config.frame_size() as f32;
        let samples: Vec<f32> = (0..config.frame_size())
            .map(|i| {
                let t = phase_offset + i as f32;
                self.amplitude * (2.0 * std::f32::consts::PI * self.freq_hz * t / sample_rate).sin()
            })
            .collect();
        Ok(Some(AudioFrame::new(samples, id, timestamp_ms, config)))
    }

    fn close(&mut self) {
        self.cursor.closed = true;
    }
}

/// All-zero samples.
pub struct SilenceSource {
    cursor: Cursor,
}

impl SilenceSource {
    pub fn new(config: AudioConfig, duration_ms: u64) -> Self {
        Self {
            cursor: Cursor::new(config, duration_ms),
        }
    }
}

impl AudioSource for SilenceSource {
    fn config(&self) -> AudioConfig {
        self.cursor.config
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        let config = self.cursor.config;
        let Some((id, timestamp_ms)) = self.cursor.next() else {
            return Ok(None);
        };
        Ok(Some(AudioFrame::silence(id, timestamp_ms, config)))
    }

    fn close(&mut self) {
        self.cursor.closed = true;
    }
}

/// Uniform white noise in `[-amplitude, amplitude]`.
pub struct NoiseSource {
    cursor: Cursor,
    amplitude: f32,
}

impl NoiseSource {
    pub fn new(config: AudioConfig, amplitude: f32, duration_ms: u64) -> Self {
        Self {
            cursor: Cursor::new(config, duration_ms),
            amplitude,
        }
    }
}

impl AudioSource for NoiseSource {
    fn config(&self) -> AudioConfig {
        self.cursor.config
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        let config = self.cursor.config;
        let Some((id, timestamp_ms)) = self.cursor.next() else {
            return Ok(None);
        };
        let mut rng = rand::thread_rng();
        let samples: Vec<f32> = (0..config.frame_size())
            .map(|_| rng.gen_range(-self.amplitude..=self.amplitude))
            .collect();
        Ok(Some(AudioFrame::new(samples, id, timestamp_ms, config)))
    }

    fn close(&mut self) {
        self.cursor.closed = true;
    }
}

/// Replays a pre-built list of frames. Useful for scripted test timelines.
pub struct ArraySource {
    config: AudioConfig,
    frames: std::collections::VecDeque<Vec<f32>>,
    frame_id: u64,
    closed: bool,
}

impl ArraySource {
    pub fn new(config: AudioConfig, frames: Vec<Vec<f32>>) -> Self {
        Self {
            config,
            frames: frames.into(),
            frame_id: 0,
            closed: false,
        }
    }
}

impl AudioSource for ArraySource {
    fn config(&self) -> AudioConfig {
        self.config
    }

    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        if self.closed {
            return Ok(None);
        }
        let Some(samples) = self.frames.pop_front() else {
            return Ok(None);
        };
        let id = self.frame_id;
        let timestamp_ms = id * self.config.frame_duration_ms as u64;
        self.frame_id += 1;
        Ok(Some(AudioFrame::new(samples, id, timestamp_ms, self.config)))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
