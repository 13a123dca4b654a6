//! Turn-taking state machine — §4.9.
//!
//! The most decision-table-heavy predictor: a five-state machine plus an
//! ordered, first-match-wins interrupt decision table and a handful of
//! continuous overlap/wait signals, all derived from elapsed silence.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{PredictionContext, Predictor};
use crate::error::Result;
use crate::results::AnalysisResult;
use crate::state::PipelineState;

const HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    UserSpeaking,
    UserPausing,
    TurnYielded,
    SystemCanSpeak,
    OverlapDetected,
}

impl TurnState {
    fn as_str(&self) -> &'static str {
        match self {
            TurnState::UserSpeaking => "user_speaking",
            TurnState::UserPausing => "user_pausing",
            TurnState::TurnYielded => "turn_yielded",
            TurnState::SystemCanSpeak => "system_can_speak",
            TurnState::OverlapDetected => "overlap_detected",
        }
    }
}

/// Why (or why not) an interrupt is currently safe.
///
/// `LongSilence` serializes as `"long_silence"` — this specification's
/// literal wording for rule 5, not the other naming some prior art uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptReason {
    UserStillSpeaking,
    QuestionForming,
    PauseTooShort,
    FallingIntonationComplete,
    LongSilence,
    HighIntentConfidence,
}

impl InterruptReason {
    fn as_str(&self) -> &'static str {
        match self {
            InterruptReason::UserStillSpeaking => "user_still_speaking",
            InterruptReason::QuestionForming => "question_forming",
            InterruptReason::PauseTooShort => "pause_too_short",
            InterruptReason::FallingIntonationComplete => "falling_intonation_complete",
            InterruptReason::LongSilence => "long_silence",
            InterruptReason::HighIntentConfidence => "high_intent_confidence",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnTakingPredictor {
    min_turn_gap_ms: u64,
    safe_interrupt_gap_ms: u64,
    max_wait_ms: u64,
    last_speech_ms: Option<u64>,
    state: TurnState,
    state_start_ms: u64,
    current_is_speech: Option<bool>,
    segment_start_ms: u64,
    silence_history: VecDeque<u64>,
    speech_history: VecDeque<u64>,
}

impl TurnTakingPredictor {
    pub fn new(min_turn_gap_ms: u64, safe_interrupt_gap_ms: u64, max_wait_ms: u64) -> Self {
        Self {
            min_turn_gap_ms,
            safe_interrupt_gap_ms,
            max_wait_ms,
            last_speech_ms: None,
            state: TurnState::TurnYielded,
            state_start_ms: 0,
            current_is_speech: None,
            segment_start_ms: 0,
            silence_history: VecDeque::with_capacity(HISTORY_CAPACITY),
            speech_history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    fn push_bounded(queue: &mut VecDeque<u64>, value: u64) {
        if queue.len() == HISTORY_CAPACITY {
            queue.pop_front();
        }
        queue.push_back(value);
    }

    fn track_segment(&mut self, is_speech: bool, now: u64) {
        match self.current_is_speech {
            None => {
                self.current_is_speech = Some(is_speech);
                self.segment_start_ms = now;
            }
            Some(prev) if prev != is_speech => {
                let duration = now.saturating_sub(self.segment_start_ms);
                if prev {
                    Self::push_bounded(&mut self.speech_history, duration);
                } else {
                    Self::push_bounded(&mut self.silence_history, duration);
                }
                self.current_is_speech = Some(is_speech);
                self.segment_start_ms = now;
            }
            _ => {}
        }
    }

    fn next_state(&self, is_speech: bool, silence: u64, falling: bool) -> TurnState {
        if is_speech {
            TurnState::UserSpeaking
        } else if silence < self.min_turn_gap_ms {
            TurnState::UserSpeaking
        } else if silence < self.safe_interrupt_gap_ms {
            TurnState::UserPausing
        } else if silence > self.max_wait_ms {
            TurnState::SystemCanSpeak
        } else if falling || silence >= self.safe_interrupt_gap_ms {
            TurnState::TurnYielded
        } else {
            TurnState::UserPausing
        }
    }

    fn interrupt_decision(
        &self,
        silence: u64,
        rising: bool,
        falling: bool,
        intent_confidence: f32,
    ) -> (bool, InterruptReason) {
        if silence < self.min_turn_gap_ms {
            (false, InterruptReason::UserStillSpeaking)
        } else if rising {
            (false, InterruptReason::QuestionForming)
        } else if silence < self.safe_interrupt_gap_ms && !falling {
            (false, InterruptReason::PauseTooShort)
        } else if falling && silence >= self.min_turn_gap_ms {
            (true, InterruptReason::FallingIntonationComplete)
        } else if silence >= self.safe_interrupt_gap_ms {
            (true, InterruptReason::LongSilence)
        } else if intent_confidence > 0.7 {
            (true, InterruptReason::HighIntentConfidence)
        } else {
            (false, InterruptReason::PauseTooShort)
        }
    }

    fn overlap_probability(&self, silence: u64, rising: bool, speech_likelihood: f32) -> f32 {
        if silence > self.max_wait_ms {
            return 0.0;
        }
        let base = (1.0 - silence as f32 / self.safe_interrupt_gap_ms as f32).max(0.0);
        let mut p = base;
        if rising {
            p += 0.3;
        }
        p += 0.3 * speech_likelihood;
        p.clamp(0.0, 1.0)
    }

    fn suggested_wait_ms(&self, silence: u64, falling: bool, intent_confidence: f32) -> u64 {
        if (silence >= self.safe_interrupt_gap_ms && falling) || silence >= self.max_wait_ms {
            return 0;
        }
        let mut remaining = self.safe_interrupt_gap_ms as i64 - silence as i64;
        if falling {
            remaining -= 200;
        }
        if intent_confidence > 0.8 {
            remaining -= 100;
        }
        remaining.max(0) as u64
    }

    fn confidence(&self, silence: u64, falling: bool) -> f32 {
        let mut c = (silence as f32 / self.safe_interrupt_gap_ms as f32).min(1.0);
        if falling {
            c += 0.2;
        }
        c.clamp(0.0, 1.0)
    }
}

impl Default for TurnTakingPredictor {
    fn default() -> Self {
        Self::new(200, 500, 2000)
    }
}

impl Predictor for TurnTakingPredictor {
    fn name(&self) -> &str {
        "turn_taking"
    }

    fn predict(&mut self, context: &PredictionContext, state: &mut PipelineState) -> Result<()> {
        let now = context.frame.timestamp_ms;
        let is_speech = state.result("vad").map(|r| r.get_bool("is_speech", false)).unwrap_or(false);
        let prosody = state.result("prosody");
        let rising = prosody.map(|r| r.get_bool("is_rising_intonation", false)).unwrap_or(false);
        let falling = prosody.map(|r| r.get_bool("is_falling_intonation", false)).unwrap_or(false);
        let speech_likelihood = state.timing.speech_likelihood;
        let intent_confidence = state.intent_confidence;

        if is_speech {
            self.last_speech_ms = Some(now);
        }
        let silence = match self.last_speech_ms {
            Some(last) => now.saturating_sub(last),
            None => 0,
        };

        self.track_segment(is_speech, now);

        let next = self.next_state(is_speech, silence, falling);
        if next != self.state {
            self.state = next;
            self.state_start_ms = now;
        }

        let (can_interrupt, interrupt_reason) =
            self.interrupt_decision(silence, rising, falling, intent_confidence);
        let should_wait = rising || speech_likelihood > 0.6 || silence < self.safe_interrupt_gap_ms;
        let overlap_probability = self.overlap_probability(silence, rising, speech_likelihood);
        let suggested_wait_ms = self.suggested_wait_ms(silence, falling, intent_confidence);
        let confidence = self.confidence(silence, falling);

        let mut result = AnalysisResult::new(self.name(), context.frame.frame_id, now);
        result
            .set_text("turn_state", self.state.as_str())
            .set_bool("can_interrupt", can_interrupt)
            .set_text("interrupt_reason", interrupt_reason.as_str())
            .set_bool("should_wait", should_wait)
            .set_number("overlap_probability", overlap_probability as f64)
            .set_number("suggested_wait_ms", suggested_wait_ms as f64)
            .set_number("confidence", confidence as f64)
            .set_number("silence_duration_ms", silence as f64);
        state.publish(result);
        Ok(())
    }

    fn reset(&mut self) {
        self.last_speech_ms = None;
        self.state = TurnState::TurnYielded;
        self.state_start_ms = 0;
        self.current_is_speech = None;
        self.segment_start_ms = 0;
        self.silence_history.clear();
        self.speech_history.clear();
    }
}
