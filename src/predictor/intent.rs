//! Intent score-vector predictor — §4.6.
//!
//! The sole authoritative writer of `state.emotion` and `state.language`:
//! analyzers never touch `PipelineState` directly, so this predictor is
//! where their published values actually land on the shared aggregate.

use std::collections::HashMap;

use super::{PredictionContext, Predictor};
use crate::error::Result;
use crate::packet::{Emotion, Intent};
use crate::state::PipelineState;

const DECAY_RATE: f32 = 0.95;
const SHARE_THRESHOLD: f32 = 0.4;
const SUM_FLOOR: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct IntentPredictor {
    scores: HashMap<Intent, f32>,
}

impl IntentPredictor {
    pub fn new() -> Self {
        let mut scores = HashMap::new();
        for intent in Intent::ALL {
            scores.insert(intent, 0.0);
        }
        Self { scores }
    }

    fn add(&mut self, intent: Intent, amount: f32) {
        *self.scores.entry(intent).or_insert(0.0) += amount;
    }

    fn select(&self) -> (Intent, f32) {
        let sum: f32 = self.scores.values().sum();
        if sum < SUM_FLOOR {
            return (Intent::Unknown, 0.0);
        }
        let (best, best_score) = self
            .scores
            .iter()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(intent, score)| (*intent, *score))
            .unwrap_or((Intent::Unknown, 0.0));
        let share = best_score / sum;
        let raw = best_score.min(1.0);
        if share < SHARE_THRESHOLD {
            (Intent::Unknown, raw * 0.5)
        } else {
            (best, share)
        }
    }
}

impl Default for IntentPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for IntentPredictor {
    fn name(&self) -> &str {
        "intent"
    }

    fn predict(&mut self, _context: &PredictionContext, state: &mut PipelineState) -> Result<()> {
        for score in self.scores.values_mut() {
            *score *= DECAY_RATE;
        }

        let is_speech = state.result("vad").map(|r| r.get_bool("is_speech", false)).unwrap_or(false);

        if is_speech {
            let prosody = state.result("prosody");
            let emotion_result = state.result("emotion");
            let arousal = emotion_result.map(|r| r.get_number("arousal", 0.5) as f32).unwrap_or(0.5);
            let rising = prosody.map(|r| r.get_bool("is_rising_intonation", false)).unwrap_or(false);
            let falling = prosody.map(|r| r.get_bool("is_falling_intonation", false)).unwrap_or(false);
            let tempo = prosody.map(|r| r.get_number("tempo", 0.0)).unwrap_or(0.0);
            let pause_duration_ms = prosody.map(|r| r.get_number("pause_duration_ms", 0.0)).unwrap_or(0.0);

            if arousal > 0.7 && falling && tempo > 4.0 {
                self.add(Intent::Command, 0.15);
            }
            if rising {
                self.add(Intent::Query, 0.12);
            }
            if arousal > 0.3 && arousal < 0.7 && !rising && !falling {
                self.add(Intent::Conversation, 0.08);
            }
            if pause_duration_ms > 300.0 && pause_duration_ms < 1000.0 {
                self.add(Intent::Query, 0.05);
            }
            self.add(Intent::Unknown, 0.02);
        }

        let (intent, confidence) = self.select();
        state.current_intent = intent;
        state.intent_confidence = confidence;

        if let Some(emotion_result) = state.result("emotion") {
            let arousal = emotion_result.get_number("arousal", 0.5) as f32;
            let valence = emotion_result.get_number("valence", 0.5) as f32;
            state.emotion = Emotion::new(arousal, valence);
        }
        if let Some(language_result) = state.result("language") {
            state.language = language_result.get_text("language", "unknown").to_string();
        }

        state.clamp_invariants();
        Ok(())
    }

    fn reset(&mut self) {
        for score in self.scores.values_mut() {
            *score = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::frame::{AudioFrame, FrameBuffer};
    use crate::results::AnalysisResult;

    fn context(frame: &AudioFrame, buffer: &FrameBuffer) -> PredictionContext<'_> {
        PredictionContext::new(frame, buffer)
    }

    fn speech_state(arousal: f32, rising: bool, falling: bool, tempo: f64, pause_ms: f64) -> PipelineState {
        let mut state = PipelineState::new();
        let mut vad = AnalysisResult::new("vad", 0, 0);
        vad.set_bool("is_speech", true);
        state.publish(vad);
        let mut prosody = AnalysisResult::new("prosody", 0, 0);
        prosody
            .set_bool("is_rising_intonation", rising)
            .set_bool("is_falling_intonation", falling)
            .set_number("tempo", tempo)
            .set_number("pause_duration_ms", pause_ms);
        state.publish(prosody);
        let mut emotion = AnalysisResult::new("emotion", 0, 0);
        emotion.set_number("arousal", arousal as f64).set_number("valence", 0.5);
        state.publish(emotion);
        state
    }

    #[test]
    fn no_evidence_yields_unknown_zero_confidence() {
        let mut predictor = IntentPredictor::new();
        let frame = AudioFrame::silence(0, 0, AudioConfig::default());
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = PipelineState::new();
        predictor.predict(&context(&frame, &buffer), &mut state).unwrap();
        assert_eq!(state.current_intent, Intent::Unknown);
        assert_eq!(state.intent_confidence, 0.0);
    }

    #[test]
    fn sustained_falling_loud_fast_speech_selects_command() {
        let mut predictor = IntentPredictor::new();
        let frame = AudioFrame::silence(0, 0, AudioConfig::default());
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = speech_state(0.9, false, true, 6.0, 0.0);
        for _ in 0..10 {
            predictor.predict(&context(&frame, &buffer), &mut state).unwrap();
        }
        assert_eq!(state.current_intent, Intent::Command);
    }

    #[test]
    fn rising_intonation_selects_query() {
        let mut predictor = IntentPredictor::new();
        let frame = AudioFrame::silence(0, 0, AudioConfig::default());
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = speech_state(0.5, true, false, 0.0, 0.0);
        for _ in 0..10 {
            predictor.predict(&context(&frame, &buffer), &mut state).unwrap();
        }
        assert_eq!(state.current_intent, Intent::Query);
    }

    #[test]
    fn intent_predictor_writes_emotion_and_language_into_state() {
        let mut predictor = IntentPredictor::new();
        let frame = AudioFrame::silence(0, 0, AudioConfig::default());
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = speech_state(0.9, false, true, 6.0, 0.0);
        let mut language = AnalysisResult::new("language", 0, 0);
        language.set_text("language", "en");
        state.publish(language);
        predictor.predict(&context(&frame, &buffer), &mut state).unwrap();
        assert_eq!(state.language, "en");
        assert_eq!(state.emotion.arousal, 0.9);
    }

    #[test]
    fn reset_zeroes_all_scores() {
        let mut predictor = IntentPredictor::new();
        let frame = AudioFrame::silence(0, 0, AudioConfig::default());
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = speech_state(0.9, false, true, 6.0, 0.0);
        predictor.predict(&context(&frame, &buffer), &mut state).unwrap();
        predictor.reset();
        assert!(predictor.scores.values().all(|&s| s == 0.0));
    }
}
