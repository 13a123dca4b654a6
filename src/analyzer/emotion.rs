//! Dimensional emotion estimate (arousal/valence) fused from prosody — §4.4.
//!
//! Raw per-frame estimates are noisy, so both dimensions are exponentially
//! smoothed before publication; only the smoothed values feed downstream
//! consumers, with the raw ones kept alongside for diagnostics.

use super::Analyzer;
use crate::error::Result;
use crate::frame::{AudioFrame, FrameBuffer};
use crate::results::AnalysisResult;
use crate::state::PipelineState;

const SMOOTHING_ALPHA: f32 = 0.3;
const ENERGY_FLOOR_DB: f32 = -40.0;
const ENERGY_SPAN_DB: f32 = 60.0;
const PITCH_CENTER_HZ: f32 = 150.0;
const PITCH_VALENCE_SPAN_HZ: f32 = 200.0;
const PITCH_VALENCE_CLAMP: f32 = 0.3;
const RISING_VALENCE_BONUS: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct EmotionAnalyzer {
    arousal: f32,
    valence: f32,
}

impl EmotionAnalyzer {
    pub fn new() -> Self {
        Self {
            arousal: 0.5,
            valence: 0.5,
        }
    }

    fn raw_arousal(energy_db: f64, pitch_variance: f64, tempo: f64) -> f32 {
        let energy_term = (((energy_db - ENERGY_FLOOR_DB as f64) + 30.0) / ENERGY_SPAN_DB as f64)
            .clamp(0.0, 1.0);
        let variance_term = (pitch_variance / 1000.0).min(1.0);
        let tempo_term = (tempo / 8.0).min(1.0);
        (0.5 * energy_term + 0.3 * variance_term + 0.2 * tempo_term) as f32
    }

    fn raw_valence(pitch_hz: f64, is_rising: bool) -> f32 {
        if pitch_hz <= 0.0 {
            return 0.5;
        }
        let pitch_term = ((pitch_hz - PITCH_CENTER_HZ as f64) / PITCH_VALENCE_SPAN_HZ as f64)
            .clamp(-PITCH_VALENCE_CLAMP as f64, PITCH_VALENCE_CLAMP as f64);
        let bonus = if is_rising { RISING_VALENCE_BONUS as f64 } else { 0.0 };
        (0.5 + pitch_term + bonus).clamp(0.0, 1.0) as f32
    }
}

impl Default for EmotionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for EmotionAnalyzer {
    fn name(&self) -> &str {
        "emotion"
    }

    fn analyze(
        &mut self,
        frame: &AudioFrame,
        _buffer: &FrameBuffer,
        state: &PipelineState,
    ) -> Result<AnalysisResult> {
        let prosody = state.result("prosody");
        let energy_db = state
            .result("vad")
            .map(|r| r.get_number("energy_db", -60.0))
            .unwrap_or(-60.0);
        let pitch_variance = prosody.map(|r| r.get_number("pitch_variance", 0.0)).unwrap_or(0.0);
        let tempo = prosody.map(|r| r.get_number("tempo", 0.0)).unwrap_or(0.0);
        let pitch_hz = prosody.map(|r| r.get_number("pitch_hz", 0.0)).unwrap_or(0.0);
        let is_rising = prosody.map(|r| r.get_bool("is_rising_intonation", false)).unwrap_or(false);

        let raw_arousal = Self::raw_arousal(energy_db, pitch_variance, tempo);
        let raw_valence = Self::raw_valence(pitch_hz, is_rising);

        self.arousal = (1.0 - SMOOTHING_ALPHA) * self.arousal + SMOOTHING_ALPHA * raw_arousal;
        self.valence = (1.0 - SMOOTHING_ALPHA) * self.valence + SMOOTHING_ALPHA * raw_valence;

        let emotion = crate::packet::Emotion::new(self.arousal, self.valence);

        let mut result = AnalysisResult::new(self.name(), frame.frame_id, frame.timestamp_ms);
        result
            .set_number("arousal", emotion.arousal as f64)
            .set_number("valence", emotion.valence as f64)
            .set_text("quadrant", quadrant_str(emotion.quadrant()))
            .set_number("raw_arousal", raw_arousal as f64)
            .set_number("raw_valence", raw_valence as f64);
        Ok(result)
    }

    fn reset(&mut self) {
        self.arousal = 0.5;
        self.valence = 0.5;
    }
}

fn quadrant_str(q: crate::packet::Quadrant) -> &'static str {
    use crate::packet::Quadrant::*;
    match q {
        CalmPositive => "calm_positive",
        CalmNegative => "calm_negative",
        TensePositive => "tense_positive",
        TenseNegative => "tense_negative",
    }
}
