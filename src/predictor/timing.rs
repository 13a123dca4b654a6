//! Turn-timing predictor — §4.7.
//!
//! Tracks how long the user has been silent and how safe an interruption
//! would be; writes `Timing` into `PipelineState` every frame.

use super::{PredictionContext, Predictor};
use crate::error::Result;
use crate::packet::Timing;
use crate::state::PipelineState;

#[derive(Debug, Clone)]
pub struct TimingPredictor {
    pause_threshold_ms: u64,
    turn_end_threshold_ms: u64,
    interrupt_confidence: f32,
    silence_start_ms: Option<u64>,
    speech_likelihood: f32,
}

impl TimingPredictor {
    pub fn new(pause_threshold_ms: u64, turn_end_threshold_ms: u64, interrupt_confidence: f32) -> Self {
        Self {
            pause_threshold_ms,
            turn_end_threshold_ms,
            interrupt_confidence,
            silence_start_ms: None,
            speech_likelihood: 0.0,
        }
    }

    fn decay_factor(silence_ms: u64) -> f32 {
        if silence_ms < 200 {
            0.95
        } else if silence_ms < 500 {
            0.85
        } else {
            0.7
        }
    }
}

impl Default for TimingPredictor {
    fn default() -> Self {
        Self::new(300, 700, 0.6)
    }
}

impl Predictor for TimingPredictor {
    fn name(&self) -> &str {
        "timing"
    }

    fn predict(&mut self, context: &PredictionContext, state: &mut PipelineState) -> Result<()> {
        let now = context.frame.timestamp_ms;
        let is_speech = state.result("vad").map(|r| r.get_bool("is_speech", false)).unwrap_or(false);
        let rising = state
            .result("prosody")
            .map(|r| r.get_bool("is_rising_intonation", false))
            .unwrap_or(false);
        let falling = state
            .result("prosody")
            .map(|r| r.get_bool("is_falling_intonation", false))
            .unwrap_or(false);

        if is_speech {
            self.silence_start_ms = None;
            self.speech_likelihood = 1.0;
            state.speech_active = true;
            state.last_speech_frame_id = context.frame.frame_id;
        } else {
            if self.silence_start_ms.is_none() {
                self.silence_start_ms = Some(now);
            }
            let silence_duration = now.saturating_sub(self.silence_start_ms.unwrap());
            self.speech_likelihood *= Self::decay_factor(silence_duration);
            if rising {
                self.speech_likelihood = (self.speech_likelihood + 0.1).min(1.0);
            }
            state.speech_active = false;
        }

        let silence_duration_ms = match self.silence_start_ms {
            Some(start) => now.saturating_sub(start),
            None => 0,
        };
        let user_paused = silence_duration_ms >= self.pause_threshold_ms;

        let interrupt_safe = !rising
            && self.speech_likelihood <= 0.7
            && user_paused
            && (silence_duration_ms >= self.turn_end_threshold_ms
                || (falling && silence_duration_ms >= self.pause_threshold_ms)
                || state.intent_confidence >= self.interrupt_confidence);

        state.timing = Timing::new(user_paused, interrupt_safe, self.speech_likelihood, silence_duration_ms);
        state.clamp_invariants();
        Ok(())
    }

    fn reset(&mut self) {
        self.silence_start_ms = None;
        self.speech_likelihood = 0.0;
    }
}
