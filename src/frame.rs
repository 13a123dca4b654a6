//! `AudioFrame` and `FrameBuffer` — the leaves of the component dependency
//! order (§2). A frame owns its samples; the buffer holds frames by value
//! and evicts from the front, never re-ordering.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::AudioConfig;

/// One fixed-duration block of normalized mono samples.
///
/// Frames are consumed once: ownership passes from source to pipeline.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    samples: Arc<[f32]>,
    pub frame_id: u64,
    pub timestamp_ms: u64,
    pub config: AudioConfig,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, frame_id: u64, timestamp_ms: u64, config: AudioConfig) -> Self {
        Self {
            samples: Arc::from(samples),
            frame_id,
            timestamp_ms,
            config,
        }
    }

    /// A silent frame of the config's frame size.
    pub fn silence(frame_id: u64, timestamp_ms: u64, config: AudioConfig) -> Self {
        Self::new(vec![0.0; config.frame_size()], frame_id, timestamp_ms, config)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    pub fn is_silent(&self) -> bool {
        self.rms() < 1e-4
    }
}

pub(crate) fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Bounded sliding window over the most recent frames.
///
/// Capped simultaneously by frame count and wall-time span; eviction is
/// always from the front, so frames remain in FIFO order by `timestamp_ms`.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    frames: VecDeque<AudioFrame>,
    max_frames: usize,
    max_duration_ms: u64,
}

impl FrameBuffer {
    pub fn new(max_frames: usize, max_duration_ms: u64) -> Self {
        Self {
            frames: VecDeque::new(),
            max_frames,
            max_duration_ms,
        }
    }

    pub fn push(&mut self, frame: AudioFrame) {
        self.frames.push_back(frame);
        self.evict();
    }

    fn evict(&mut self) {
        while self.frames.len() > self.max_frames {
            self.frames.pop_front();
        }
        while let (Some(front), Some(back)) = (self.frames.front(), self.frames.back()) {
            if back.timestamp_ms.saturating_sub(front.timestamp_ms) > self.max_duration_ms {
                self.frames.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn frames(&self) -> impl Iterator<Item = &AudioFrame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.frames.front(), self.frames.back()) {
            (Some(front), Some(back)) => back.timestamp_ms.saturating_sub(front.timestamp_ms),
            _ => 0,
        }
    }

    /// Concatenate all buffered samples into one contiguous vector, in FIFO
    /// order, for time-domain analyses that need more than one frame.
    pub fn concatenate(&self) -> Vec<f32> {
        let total: usize = self.frames.iter().map(|f| f.samples().len()).sum();
        let mut out = Vec::with_capacity(total);
        for frame in &self.frames {
            out.extend_from_slice(frame.samples());
        }
        out
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_n(buf: &mut FrameBuffer, n: u64, config: AudioConfig) {
        for i in 0..n {
            buf.push(AudioFrame::silence(
                i,
                i * config.frame_duration_ms as u64,
                config,
            ));
        }
    }

    #[test]
    fn evicts_by_count() {
        let config = AudioConfig::default();
        let mut buf = FrameBuffer::new(5, 10_000);
        push_n(&mut buf, 10, config);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.frames().next().unwrap().frame_id, 5);
    }

    #[test]
    fn evicts_by_duration() {
        let config = AudioConfig::default(); // 20ms frames
        let mut buf = FrameBuffer::new(1000, 100);
        push_n(&mut buf, 20, config);
        assert!(buf.duration_ms() <= 100);
    }

    #[test]
    fn fifo_order_preserved() {
        let config = AudioConfig::default();
        let mut buf = FrameBuffer::new(50, 1000);
        push_n(&mut buf, 5, config);
        let ids: Vec<u64> = buf.frames().map(|f| f.frame_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn concatenate_preserves_sample_order() {
        let config = AudioConfig::default();
        let mut buf = FrameBuffer::new(50, 1000);
        buf.push(AudioFrame::new(vec![1.0, 2.0], 0, 0, config));
        buf.push(AudioFrame::new(vec![3.0, 4.0], 1, 20, config));
        assert_eq!(buf.concatenate(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rms_of_unit_square_wave() {
        let samples: Vec<f32> = (0..256)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        assert!((rms(&samples) - 0.5).abs() < 1e-5);
    }
}
