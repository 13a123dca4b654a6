//! Early-intent hypothesis tracker — §4.8.
//!
//! Tracks a bounded set of intent hypotheses as they accumulate evidence,
//! surfacing a stability score and an interruptibility estimate before the
//! main intent predictor's own confidence has settled.

use std::collections::HashMap;

use super::{PredictionContext, Predictor};
use crate::error::Result;
use crate::packet::Intent;
use crate::results::AnalysisResult;
use crate::state::PipelineState;

const AGE_FACTOR_SPAN_MS: f32 = 500.0;
const EVIDENCE_FACTOR_SPAN: f32 = 10.0;

/// One tracked candidate intent, with the evidence accrued for it so far.
#[derive(Debug, Clone, Copy)]
pub struct Hypothesis {
    pub intent: Intent,
    pub confidence: f32,
    pub first_seen_ms: u64,
    pub last_updated_ms: u64,
    pub evidence_count: u32,
}

impl Hypothesis {
    fn stability_score(&self, now_ms: u64) -> f32 {
        let age_ms = now_ms.saturating_sub(self.first_seen_ms) as f32;
        let age_factor = (age_ms / AGE_FACTOR_SPAN_MS).min(1.0);
        let evidence_factor = (self.evidence_count as f32 / EVIDENCE_FACTOR_SPAN).min(1.0);
        0.4 * age_factor + 0.3 * evidence_factor + 0.3 * self.confidence
    }
}

#[derive(Debug, Clone)]
pub struct EarlyIntentPredictor {
    hypothesis_timeout_ms: u64,
    momentum: f32,
    stability_threshold: u32,
    hypotheses: HashMap<Intent, Hypothesis>,
    leading_intent: Option<Intent>,
    frames_since_change: u32,
}

impl EarlyIntentPredictor {
    pub fn new(hypothesis_timeout_ms: u64, momentum: f32, stability_threshold: u32) -> Self {
        Self {
            hypothesis_timeout_ms,
            momentum,
            stability_threshold,
            hypotheses: HashMap::new(),
            leading_intent: None,
            frames_since_change: 0,
        }
    }

    fn prune(&mut self, now_ms: u64) {
        let timeout = self.hypothesis_timeout_ms;
        self.hypotheses
            .retain(|_, h| now_ms.saturating_sub(h.last_updated_ms) <= timeout);
    }

    fn update_or_create(&mut self, intent: Intent, confidence: f32, now_ms: u64) {
        self.hypotheses
            .entry(intent)
            .and_modify(|h| {
                h.confidence = self.momentum * h.confidence + (1.0 - self.momentum) * confidence;
                h.last_updated_ms = now_ms;
                h.evidence_count += 1;
            })
            .or_insert(Hypothesis {
                intent,
                confidence,
                first_seen_ms: now_ms,
                last_updated_ms: now_ms,
                evidence_count: 1,
            });
    }

    fn select_leader(&self, now_ms: u64) -> Option<Hypothesis> {
        self.hypotheses
            .values()
            .max_by(|a, b| {
                a.stability_score(now_ms)
                    .partial_cmp(&b.stability_score(now_ms))
                    .unwrap()
            })
            .copied()
    }
}

impl Default for EarlyIntentPredictor {
    fn default() -> Self {
        Self::new(2000, 0.8, 5)
    }
}

impl Predictor for EarlyIntentPredictor {
    fn name(&self) -> &str {
        "early_intent"
    }

    fn predict(&mut self, context: &PredictionContext, state: &mut PipelineState) -> Result<()> {
        let now = context.frame.timestamp_ms;

        self.prune(now);
        self.update_or_create(state.current_intent, state.intent_confidence, now);

        let leader = self.select_leader(now);
        let leading_intent = leader.map(|h| h.intent).unwrap_or(Intent::Unknown);
        let leading_confidence = leader.map(|h| h.confidence).unwrap_or(0.0);
        let stability = leader.map(|h| h.stability_score(now)).unwrap_or(0.0);

        if self.leading_intent != Some(leading_intent) {
            self.leading_intent = Some(leading_intent);
            self.frames_since_change = 0;
        } else {
            self.frames_since_change += 1;
        }

        let timing_factor = if state.timing.interrupt_safe {
            1.0
        } else if state.timing.user_paused {
            0.5
        } else {
            0.0
        };
        let interruptibility = (0.25 * stability
            + 0.25 * leading_confidence
            + 0.30 * timing_factor
            + 0.20 * (1.0 - state.timing.speech_likelihood))
            .clamp(0.0, 1.0);

        let hypothesis_stable =
            self.frames_since_change >= self.stability_threshold && leading_confidence > 0.5;

        let mut result = AnalysisResult::new(self.name(), context.frame.frame_id, now);
        result
            .set_text("leading_intent", leading_intent.as_str())
            .set_number("leading_confidence", leading_confidence as f64)
            .set_number("interruptibility", interruptibility as f64)
            .set_bool("hypothesis_stable", hypothesis_stable)
            .set_number("active_hypotheses", self.hypotheses.len() as f64)
            .set_number("frames_since_change", self.frames_since_change as f64);
        state.publish(result);
        Ok(())
    }

    fn reset(&mut self) {
        self.hypotheses.clear();
        self.leading_intent = None;
        self.frames_since_change = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::frame::{AudioFrame, FrameBuffer};

    fn frame_at(ts: u64) -> AudioFrame {
        AudioFrame::silence(0, ts, AudioConfig::default())
    }

    #[test]
    fn single_frame_creates_one_hypothesis() {
        let mut predictor = EarlyIntentPredictor::default();
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = PipelineState::new();
        state.current_intent = Intent::Query;
        state.intent_confidence = 0.6;
        predictor
            .predict(&PredictionContext::new(&frame_at(0), &buffer), &mut state)
            .unwrap();
        assert_eq!(predictor.hypotheses.len(), 1);
        let result = state.result("early_intent").unwrap();
        assert_eq!(result.get_text("leading_intent", ""), "query");
    }

    #[test]
    fn sustained_evidence_builds_stability_and_marks_stable() {
        let mut predictor = EarlyIntentPredictor::new(2000, 0.8, 3);
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = PipelineState::new();
        state.current_intent = Intent::Query;
        state.intent_confidence = 0.9;
        let mut last = None;
        for i in 0..10 {
            predictor
                .predict(&PredictionContext::new(&frame_at(i * 100), &buffer), &mut state)
                .unwrap();
            last = Some(state.result("early_intent").unwrap().clone());
        }
        let result = last.unwrap();
        assert!(result.get_bool("hypothesis_stable", false));
        assert!(result.get_number("leading_confidence", 0.0) > 0.5);
    }

    #[test]
    fn stale_hypothesis_is_pruned_after_timeout() {
        let mut predictor = EarlyIntentPredictor::new(500, 0.8, 5);
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = PipelineState::new();
        state.current_intent = Intent::Query;
        state.intent_confidence = 0.8;
        predictor
            .predict(&PredictionContext::new(&frame_at(0), &buffer), &mut state)
            .unwrap();
        state.current_intent = Intent::Command;
        state.intent_confidence = 0.9;
        predictor
            .predict(&PredictionContext::new(&frame_at(5000), &buffer), &mut state)
            .unwrap();
        assert_eq!(predictor.hypotheses.len(), 1);
        assert!(predictor.hypotheses.contains_key(&Intent::Command));
    }

    #[test]
    fn does_not_overwrite_current_intent() {
        let mut predictor = EarlyIntentPredictor::default();
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = PipelineState::new();
        state.current_intent = Intent::Query;
        predictor
            .predict(&PredictionContext::new(&frame_at(0), &buffer), &mut state)
            .unwrap();
        assert_eq!(state.current_intent, Intent::Query);
    }

    #[test]
    fn reset_clears_hypotheses_and_leader() {
        let mut predictor = EarlyIntentPredictor::default();
        let buffer = FrameBuffer::new(50, 1000);
        let mut state = PipelineState::new();
        predictor
            .predict(&PredictionContext::new(&frame_at(0), &buffer), &mut state)
            .unwrap();
        predictor.reset();
        assert!(predictor.hypotheses.is_empty());
        assert_eq!(predictor.frames_since_change, 0);
    }
}
