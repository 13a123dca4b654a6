//! Pitch, intonation, pause, and tempo extraction — §4.3.
//!
//! Pitch is estimated by lag-domain autocorrelation rather than an FFT: the
//! search range sits well within one frame's sample count, so a direct
//! correlation sum is both simpler and fast enough for this scale.

use std::collections::VecDeque;

use super::Analyzer;
use crate::error::{Result, TalkyTalkError};
use crate::frame::{AudioFrame, FrameBuffer};
use crate::results::AnalysisResult;
use crate::state::PipelineState;

const PITCH_HISTORY_LEN: usize = 25;
const INTONATION_WINDOW: usize = 5;
const INTONATION_SLOPE_THRESHOLD_HZ: f32 = 5.0;
const AUTOCORR_PEAK_RATIO_MIN: f32 = 0.3;
const TEMPO_MIN_BUFFER_MS: u64 = 500;
const ENVELOPE_WINDOW: usize = 160;

#[derive(Debug, Clone)]
pub struct ProsodyAnalyzer {
    min_pitch_hz: f32,
    max_pitch_hz: f32,
    pitch_history: VecDeque<f32>,
    current_pause_start: Option<u64>,
}

impl ProsodyAnalyzer {
    pub fn try_new(min_pitch_hz: f32, max_pitch_hz: f32) -> Result<Self> {
        if min_pitch_hz <= 0.0 || max_pitch_hz <= 0.0 || min_pitch_hz >= max_pitch_hz {
            return Err(TalkyTalkError::Config(format!(
                "invalid pitch range: min={min_pitch_hz} max={max_pitch_hz}"
            )));
        }
        Ok(Self {
            min_pitch_hz,
            max_pitch_hz,
            pitch_history: VecDeque::with_capacity(PITCH_HISTORY_LEN),
            current_pause_start: None,
        })
    }

    /// Mean-center, autocorrelate, and pick the best lag in
    /// `[sample_rate/max_pitch_hz, sample_rate/min_pitch_hz]`.
    /// Returns `None` if the peak isn't a confident periodic signal.
    fn estimate_pitch(&self, samples: &[f32], sample_rate: u32) -> Option<f32> {
        let n = samples.len();
        if n < 4 {
            return None;
        }

        let mean = samples.iter().sum::<f32>() / n as f32;
        let centered: Vec<f32> = samples.iter().map(|s| s - mean).collect();

        let min_lag = (sample_rate as f32 / self.max_pitch_hz).round() as usize;
        let max_lag = ((sample_rate as f32 / self.min_pitch_hz).round() as usize).min(n - 1);
        if min_lag == 0 || min_lag >= max_lag {
            return None;
        }

        let autocorr_0: f32 = centered.iter().map(|s| s * s).sum();
        if autocorr_0 <= 0.0 {
            return None;
        }

        let mut best_lag = min_lag;
        let mut best_value = f32::MIN;
        for lag in min_lag..=max_lag {
            let value: f32 = (0..n - lag).map(|i| centered[i] * centered[i + lag]).sum();
            if value > best_value {
                best_value = value;
                best_lag = lag;
            }
        }

        if best_value / autocorr_0 < AUTOCORR_PEAK_RATIO_MIN {
            return None;
        }

        Some(sample_rate as f32 / best_lag as f32)
    }

    fn pitch_variance(&self) -> f64 {
        if self.pitch_history.len() <= 2 {
            return 0.0;
        }
        let n = self.pitch_history.len() as f64;
        let mean = self.pitch_history.iter().map(|&p| p as f64).sum::<f64>() / n;
        self.pitch_history
            .iter()
            .map(|&p| {
                let d = p as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n
    }

    /// Least-squares slope over the last `INTONATION_WINDOW` pitch samples.
    fn intonation_slope(&self) -> Option<f32> {
        if self.pitch_history.len() < INTONATION_WINDOW {
            return None;
        }
        let window: Vec<f32> = self
            .pitch_history
            .iter()
            .rev()
            .take(INTONATION_WINDOW)
            .rev()
            .copied()
            .collect();
        let n = window.len() as f32;
        let xs: Vec<f32> = (0..window.len()).map(|i| i as f32).collect();
        let x_mean = xs.iter().sum::<f32>() / n;
        let y_mean = window.iter().sum::<f32>() / n;
        let num: f32 = xs
            .iter()
            .zip(window.iter())
            .map(|(x, y)| (x - x_mean) * (y - y_mean))
            .sum();
        let den: f32 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        if den == 0.0 {
            return None;
        }
        Some(num / den)
    }

    fn tempo(&self, buffer: &FrameBuffer, sample_rate: u32) -> Option<f32> {
        if buffer.duration_ms() < TEMPO_MIN_BUFFER_MS {
            return None;
        }
        let samples = buffer.concatenate();
        if samples.len() < ENVELOPE_WINDOW * 2 {
            return None;
        }

        let hop = ENVELOPE_WINDOW / 2;
        let mut envelope: Vec<f32> = Vec::new();
        let mut start = 0;
        while start + ENVELOPE_WINDOW <= samples.len() {
            let window = &samples[start..start + ENVELOPE_WINDOW];
            envelope.push(crate::frame::rms(window));
            start += hop;
        }
        if envelope.len() < 3 {
            return None;
        }

        // Length-3 boxcar smoothing.
        let smoothed: Vec<f32> = (0..envelope.len())
            .map(|i| {
                let lo = i.saturating_sub(1);
                let hi = (i + 1).min(envelope.len() - 1);
                let window = &envelope[lo..=hi];
                window.iter().sum::<f32>() / window.len() as f32
            })
            .collect();

        let mean = smoothed.iter().sum::<f32>() / smoothed.len() as f32;
        let threshold = 0.5 * mean;
        let crossings = smoothed
            .windows(2)
            .filter(|w| w[0] <= threshold && w[1] > threshold)
            .count();

        let duration_secs = samples.len() as f32 / sample_rate as f32;
        if duration_secs <= 0.0 {
            return None;
        }
        Some(crossings as f32 / duration_secs)
    }
}

impl Analyzer for ProsodyAnalyzer {
    fn name(&self) -> &str {
        "prosody"
    }

    fn analyze(
        &mut self,
        frame: &AudioFrame,
        buffer: &FrameBuffer,
        state: &PipelineState,
    ) -> Result<AnalysisResult> {
        let is_speech = state
            .result("vad")
            .map(|r| r.get_bool("is_speech", false))
            .unwrap_or(false);

        let mut pitch_hz = 0.0f32;
        if is_speech && frame.rms() > 0.01 {
            if let Some(pitch) = self.estimate_pitch(frame.samples(), frame.config.sample_rate) {
                pitch_hz = pitch;
                if self.pitch_history.len() == PITCH_HISTORY_LEN {
                    self.pitch_history.pop_front();
                }
                self.pitch_history.push_back(pitch);
            }
        }

        let pitch_variance = self.pitch_variance();
        let slope = self.intonation_slope();
        let is_rising = slope.map(|s| s > INTONATION_SLOPE_THRESHOLD_HZ).unwrap_or(false);
        let is_falling = slope.map(|s| s < -INTONATION_SLOPE_THRESHOLD_HZ).unwrap_or(false);

        let pause_duration_ms = if is_speech {
            match self.current_pause_start.take() {
                Some(start) => frame.timestamp_ms.saturating_sub(start),
                None => 0,
            }
        } else {
            if self.current_pause_start.is_none() {
                self.current_pause_start = Some(frame.timestamp_ms);
            }
            frame
                .timestamp_ms
                .saturating_sub(self.current_pause_start.unwrap())
        };

        let tempo = self.tempo(buffer, frame.config.sample_rate).unwrap_or(0.0);

        let mut result = AnalysisResult::new(self.name(), frame.frame_id, frame.timestamp_ms);
        result
            .set_number("pitch_hz", pitch_hz as f64)
            .set_number("pitch_variance", pitch_variance)
            .set_bool("is_rising_intonation", is_rising)
            .set_bool("is_falling_intonation", is_falling)
            .set_number("pause_duration_ms", pause_duration_ms as f64)
            .set_number("tempo", tempo as f64)
            .set_number("speech_rate", tempo as f64);
        Ok(result)
    }

    fn reset(&mut self) {
        self.pitch_history.clear();
        self.current_pause_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use approx::assert_relative_eq;

    fn sine_frame(freq_hz: f32, amplitude: f32, sample_rate: u32, len: usize) -> AudioFrame {
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin()
            })
            .collect();
        AudioFrame::new(samples, 0, 0, AudioConfig::default())
    }

    fn speaking_state() -> PipelineState {
        let mut state = PipelineState::new();
        let mut vad_result = AnalysisResult::new("vad", 0, 0);
        vad_result.set_bool("is_speech", true);
        state.publish(vad_result);
        state
    }

    #[test]
    fn rejects_invalid_pitch_range() {
        assert!(ProsodyAnalyzer::try_new(500.0, 50.0).is_err());
        assert!(ProsodyAnalyzer::try_new(0.0, 500.0).is_err());
    }

    #[test]
    fn estimates_pitch_of_clean_sine_within_tolerance() {
        let analyzer = ProsodyAnalyzer::try_new(50.0, 500.0).unwrap();
        let frame = sine_frame(200.0, 0.5, 16000, 320);
        let pitch = analyzer
            .estimate_pitch(frame.samples(), 16000)
            .expect("expected a pitch estimate for a clean sine");
        assert_relative_eq!(pitch, 200.0, epsilon = 5.0);
    }

    #[test]
    fn silence_yields_no_pitch() {
        let mut analyzer = ProsodyAnalyzer::try_new(50.0, 500.0).unwrap();
        let frame = AudioFrame::silence(0, 0, AudioConfig::default());
        let result = analyzer
            .analyze(&frame, &FrameBuffer::new(50, 1000), &PipelineState::new())
            .unwrap();
        assert_eq!(result.get_number("pitch_hz", -1.0), 0.0);
    }

    #[test]
    fn rising_pitch_history_is_classified_rising() {
        let mut analyzer = ProsodyAnalyzer::try_new(50.0, 500.0).unwrap();
        let state = speaking_state();
        let buffer = FrameBuffer::new(50, 1000);
        let mut last = None;
        for freq in [150.0, 170.0, 190.0, 210.0, 230.0, 250.0] {
            let frame = sine_frame(freq, 0.5, 16000, 320);
            last = Some(analyzer.analyze(&frame, &buffer, &state).unwrap());
        }
        let result = last.unwrap();
        assert!(result.get_bool("is_rising_intonation", false));
        assert!(!result.get_bool("is_falling_intonation", true));
    }

    #[test]
    fn pause_duration_accumulates_during_silence_and_reports_on_resume() {
        let mut analyzer = ProsodyAnalyzer::try_new(50.0, 500.0).unwrap();
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = PipelineState::new();
        let mut silent_vad = AnalysisResult::new("vad", 0, 0);
        silent_vad.set_bool("is_speech", false);
        state.publish(silent_vad);

        let silent_frame = |ts: u64| AudioFrame::new(vec![0.0; 320], 0, ts, AudioConfig::default());
        analyzer.analyze(&silent_frame(0), &buffer, &state).unwrap();
        let r = analyzer.analyze(&silent_frame(400), &buffer, &state).unwrap();
        assert_eq!(r.get_number("pause_duration_ms", -1.0), 400.0);

        let speaking = speaking_state();
        let speech_frame = sine_frame(200.0, 0.5, 16000, 320);
        let r2 = analyzer.analyze(&speech_frame, &buffer, &speaking).unwrap();
        assert!(r2.get_number("pause_duration_ms", -1.0) >= 0.0);
    }
}
