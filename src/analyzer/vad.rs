//! Energy-based VAD with ZCR discrimination, an adaptive noise floor, and a
//! hangover state machine — §4.2.

use super::Analyzer;
use crate::error::Result;
use crate::frame::{AudioFrame, FrameBuffer};
use crate::results::AnalysisResult;
use crate::state::PipelineState;

const EPSILON: f32 = 1e-10;

/// Energy + zero-crossing-rate voice activity detector.
#[derive(Debug, Clone)]
pub struct VadAnalyzer {
    /// Configured static floor for the effective threshold, in dB.
    threshold_db: f32,
    /// Frames to keep reporting `speech_active` after energy drops below
    /// threshold, to avoid clipping trailing syllables.
    hangover_frames: u32,
    hangover_counter: u32,
    speech_active: bool,
    noise_floor_db: f32,
}

impl VadAnalyzer {
    pub fn new(threshold_db: f32, hangover_frames: u32) -> Self {
        Self {
            threshold_db,
            hangover_frames,
            hangover_counter: 0,
            speech_active: false,
            noise_floor_db: -60.0,
        }
    }

    fn zero_crossing_rate(samples: &[f32]) -> f32 {
        if samples.len() < 2 {
            return 0.0;
        }
        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        crossings as f32 / (samples.len() - 1) as f32
    }

    fn update_noise_floor(&mut self, energy_db: f32) {
        let alpha = if energy_db < self.noise_floor_db + 5.0 {
            0.01
        } else {
            0.001
        };
        self.noise_floor_db = (1.0 - alpha) * self.noise_floor_db + alpha * energy_db;
    }

    fn speech_probability(energy_db: f32, threshold_db: f32, zcr: f32) -> f32 {
        let energy_term = if energy_db <= threshold_db - 20.0 {
            0.0
        } else if energy_db >= threshold_db + 10.0 {
            1.0
        } else {
            (energy_db - (threshold_db - 20.0)) / 30.0
        };
        let zcr_term = (1.0 - 2.0 * zcr).max(0.0);
        (0.7 * energy_term + 0.3 * zcr_term).clamp(0.0, 1.0)
    }
}

impl Default for VadAnalyzer {
    fn default() -> Self {
        Self::new(-40.0, 5)
    }
}

impl Analyzer for VadAnalyzer {
    fn name(&self) -> &str {
        "vad"
    }

    fn analyze(
        &mut self,
        frame: &AudioFrame,
        _buffer: &FrameBuffer,
        _state: &PipelineState,
    ) -> Result<AnalysisResult> {
        let rms = frame.rms();
        let energy_db = 20.0 * (rms + EPSILON).log10();
        let zcr = Self::zero_crossing_rate(frame.samples());

        self.update_noise_floor(energy_db);
        let threshold_db = self.threshold_db.max(self.noise_floor_db + 10.0);

        let raw_speech = energy_db > threshold_db && zcr < 0.5;
        if raw_speech {
            self.hangover_counter = self.hangover_frames;
            self.speech_active = true;
        } else if self.hangover_counter > 0 {
            self.hangover_counter -= 1;
        } else {
            self.speech_active = false;
        }

        let speech_probability = Self::speech_probability(energy_db, threshold_db, zcr);

        let mut result = AnalysisResult::new(self.name(), frame.frame_id, frame.timestamp_ms)
            .with_confidence(speech_probability);
        result
            .set_bool("is_speech", self.speech_active)
            .set_number("speech_probability", speech_probability as f64)
            .set_number("energy_db", energy_db as f64)
            .set_number("threshold_db", threshold_db as f64)
            .set_number("noise_floor_db", self.noise_floor_db as f64);
        Ok(result)
    }

    fn reset(&mut self) {
        self.hangover_counter = 0;
        self.speech_active = false;
        self.noise_floor_db = -60.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;

    fn silent_frame(len: usize) -> AudioFrame {
        AudioFrame::new(vec![0.0; len], 0, 0, AudioConfig::default())
    }

    fn sine_frame(amplitude: f32, freq_hz: f32, len: usize, sample_rate: u32) -> AudioFrame {
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin()
            })
            .collect();
        AudioFrame::new(samples, 0, 0, AudioConfig::default())
    }

    fn state() -> PipelineState {
        PipelineState::new()
    }

    fn buffer() -> FrameBuffer {
        FrameBuffer::new(50, 1000)
    }

    #[test]
    fn silence_is_not_speech() {
        let mut vad = VadAnalyzer::default();
        let result = vad
            .analyze(&silent_frame(320), &buffer(), &state())
            .unwrap();
        assert!(!result.get_bool("is_speech", true));
        assert!(result.get_number("speech_probability", 1.0) < 0.5);
    }

    #[test]
    fn loud_sine_is_speech() {
        let mut vad = VadAnalyzer::default();
        let frame = sine_frame(0.5, 200.0, 320, 16000);
        // A couple of frames for the noise floor/hangover to settle into speech.
        let mut result = vad.analyze(&frame, &buffer(), &state()).unwrap();
        for _ in 0..3 {
            result = vad.analyze(&frame, &buffer(), &state()).unwrap();
        }
        assert!(result.get_bool("is_speech", false));
        assert!(result.get_number("energy_db", -100.0) > -40.0);
    }

    #[test]
    fn hangover_extends_speech_after_energy_drops() {
        let mut vad = VadAnalyzer::new(-40.0, 3);
        let loud = sine_frame(0.5, 200.0, 320, 16000);
        let silent = silent_frame(320);

        let r = vad.analyze(&loud, &buffer(), &state()).unwrap();
        assert!(r.get_bool("is_speech", false));

        for _ in 0..3 {
            let r = vad.analyze(&silent, &buffer(), &state()).unwrap();
            assert!(r.get_bool("is_speech", false), "expected hangover to hold speech_active");
        }
        let r = vad.analyze(&silent, &buffer(), &state()).unwrap();
        assert!(!r.get_bool("is_speech", true), "hangover should be exhausted");
    }

    #[test]
    fn reset_clears_hangover_and_noise_floor() {
        let mut vad = VadAnalyzer::new(-40.0, 5);
        vad.analyze(&sine_frame(0.5, 200.0, 320, 16000), &buffer(), &state())
            .unwrap();
        vad.reset();
        let r = vad.analyze(&silent_frame(320), &buffer(), &state()).unwrap();
        assert!(!r.get_bool("is_speech", true));
    }

    #[test]
    fn zero_crossing_rate_of_empty_is_zero() {
        assert_eq!(VadAnalyzer::zero_crossing_rate(&[]), 0.0);
    }
}
