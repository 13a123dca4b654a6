//! Immutable configuration types.
//!
//! `AudioConfig` and `PipelineConfig` are validated once, at construction, so
//! the rest of the pipeline never has to re-check range invariants on the
//! hot path (§7d: configuration faults fail fast).

use crate::error::{Result, TalkyTalkError};

/// Describes the shape of the incoming audio stream.
///
/// `Default` matches the spec's defaults (16 kHz mono, 20 ms frames) and is
/// always valid — only `try_new` with caller-supplied values can fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_duration_ms: u32,
}

impl AudioConfig {
    /// Construct a config, validating that every field is positive.
    pub fn try_new(sample_rate: u32, channels: u16, frame_duration_ms: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TalkyTalkError::Config("sample_rate must be > 0".into()));
        }
        if channels == 0 {
            return Err(TalkyTalkError::Config("channels must be > 0".into()));
        }
        if frame_duration_ms == 0 {
            return Err(TalkyTalkError::Config(
                "frame_duration_ms must be > 0".into(),
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
            frame_duration_ms,
        })
    }

    /// Number of samples in one frame at this config's rate/duration.
    pub fn frame_size(&self) -> usize {
        (self.sample_rate as u64 * self.frame_duration_ms as u64 / 1000) as usize
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            frame_duration_ms: 20,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub audio: AudioConfig,
    /// Span covered by the FrameBuffer, in ms. Default 1000.
    pub buffer_duration_ms: u64,
    /// Minimum gap between emitted packets, in ms. Default 100.
    pub emit_interval_ms: u64,
    /// Minimum `state.intent_confidence` required to emit a packet. Default 0.0.
    pub min_confidence_to_emit: f32,
}

impl PipelineConfig {
    pub fn try_new(
        audio: AudioConfig,
        buffer_duration_ms: u64,
        emit_interval_ms: u64,
        min_confidence_to_emit: f32,
    ) -> Result<Self> {
        if emit_interval_ms == 0 {
            return Err(TalkyTalkError::Config(
                "emit_interval_ms must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&min_confidence_to_emit) {
            return Err(TalkyTalkError::Config(
                "min_confidence_to_emit must be in [0, 1]".into(),
            ));
        }
        Ok(Self {
            audio,
            buffer_duration_ms,
            emit_interval_ms,
            min_confidence_to_emit,
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            buffer_duration_ms: 1000,
            emit_interval_ms: 100,
            min_confidence_to_emit: 0.0,
        }
    }
}
