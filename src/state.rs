//! `PipelineState` — the single mutable aggregate owned by the pipeline.
//!
//! Analyzers never touch this directly; they publish into the results map.
//! Only predictors mutate it, and only `IntentPredictor` is the authoritative
//! writer of `emotion`/`language` (§9, open question c).

use std::collections::HashMap;

use crate::packet::{Emotion, Intent, Timing};
use crate::results::AnalysisResult;

/// Current best guess of everything the pipeline knows about the speaker.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub current_intent: Intent,
    pub intent_confidence: f32,
    pub language: String,
    pub target_language: Option<String>,
    pub emotion: Emotion,
    pub timing: Timing,
    pub speech_active: bool,
    pub last_speech_frame_id: u64,
    pub analysis_results: HashMap<String, AnalysisResult>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            current_intent: Intent::Unknown,
            intent_confidence: 0.0,
            language: "unknown".to_string(),
            target_language: None,
            emotion: Emotion::default(),
            timing: Timing::default(),
            speech_active: false,
            last_speech_frame_id: 0,
            analysis_results: HashMap::new(),
        }
    }

    /// Publish (overwrite) an analyzer's result for the current frame.
    pub fn publish(&mut self, result: AnalysisResult) {
        self.analysis_results.insert(result.analyzer_name.clone(), result);
    }

    pub fn result(&self, analyzer_name: &str) -> Option<&AnalysisResult> {
        self.analysis_results.get(analyzer_name)
    }

    /// Clamp `intent_confidence` into [0, 1]; called after every predictor
    /// mutation so invariant violations self-heal (§7c) rather than
    /// propagate into an emitted packet.
    pub fn clamp_invariants(&mut self) {
        self.intent_confidence = self.intent_confidence.clamp(0.0, 1.0);
        self.emotion = Emotion::new(self.emotion.arousal, self.emotion.valence);
        self.timing.speech_likelihood = self.timing.speech_likelihood.clamp(0.0, 1.0);
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_unknown_intent_and_neutral_emotion() {
        let state = PipelineState::new();
        assert_eq!(state.current_intent, Intent::Unknown);
        assert_eq!(state.emotion, Emotion::default());
    }

    #[test]
    fn publish_overwrites_previous_result_for_same_analyzer() {
        let mut state = PipelineState::new();
        state.publish(AnalysisResult::new("vad", 0, 0).with_confidence(0.2));
        state.publish(AnalysisResult::new("vad", 1, 20).with_confidence(0.9));
        assert_eq!(state.result("vad").unwrap().frame_id, 1);
        assert_eq!(state.analysis_results.len(), 1);
    }

    #[test]
    fn clamp_invariants_heals_out_of_range_confidence() {
        let mut state = PipelineState::new();
        state.intent_confidence = 1.4;
        state.clamp_invariants();
        assert_eq!(state.intent_confidence, 1.0);
    }
}
