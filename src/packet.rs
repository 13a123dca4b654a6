//! The outward-facing snapshot types: `Intent`, `Emotion`, `Timing`, and the
//! `IntentPacket` that bundles them. These are the only types consumers of
//! the pipeline need to know about — everything upstream is plumbing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::results::AnalysisResult;

/// What the speaker is probably trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PlayMusic,
    Translate,
    Query,
    Conversation,
    Command,
    Unknown,
}

impl Intent {
    /// All variants, in a stable order used for score-vector iteration.
    pub const ALL: [Intent; 6] = [
        Intent::PlayMusic,
        Intent::Translate,
        Intent::Query,
        Intent::Conversation,
        Intent::Command,
        Intent::Unknown,
    ];

    /// The snake_case wire form, matching the serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::PlayMusic => "play_music",
            Intent::Translate => "translate",
            Intent::Query => "query",
            Intent::Conversation => "conversation",
            Intent::Command => "command",
            Intent::Unknown => "unknown",
        }
    }
}

impl Default for Intent {
    fn default() -> Self {
        Intent::Unknown
    }
}

/// Emotion quadrant derived from thresholding arousal/valence at 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    CalmPositive,
    CalmNegative,
    TensePositive,
    TenseNegative,
}

/// Dimensional emotion estimate: arousal (calm↔aroused) and valence
/// (negative↔positive), both clamped to [0, 1] at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub arousal: f32,
    pub valence: f32,
}

impl Emotion {
    pub fn new(arousal: f32, valence: f32) -> Self {
        Self {
            arousal: arousal.clamp(0.0, 1.0),
            valence: valence.clamp(0.0, 1.0),
        }
    }

    pub fn quadrant(&self) -> Quadrant {
        match (self.arousal >= 0.5, self.valence >= 0.5) {
            (false, true) => Quadrant::CalmPositive,
            (false, false) => Quadrant::CalmNegative,
            (true, true) => Quadrant::TensePositive,
            (true, false) => Quadrant::TenseNegative,
        }
    }
}

impl Default for Emotion {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

/// Turn-taking timing signals as understood by the `TimingPredictor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub user_paused: bool,
    pub interrupt_safe: bool,
    pub speech_likelihood: f32,
    pub silence_duration_ms: u64,
}

impl Timing {
    pub fn new(
        user_paused: bool,
        interrupt_safe: bool,
        speech_likelihood: f32,
        silence_duration_ms: u64,
    ) -> Self {
        Self {
            user_paused,
            interrupt_safe,
            speech_likelihood: speech_likelihood.clamp(0.0, 1.0),
            silence_duration_ms,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new(false, false, 0.0, 0)
    }
}

/// A shallow, JSON-friendly view over one analyzer's published payload.
pub type ResultPayload = HashMap<String, serde_json::Value>;

fn snapshot_results(results: &HashMap<String, AnalysisResult>) -> HashMap<String, ResultPayload> {
    results
        .iter()
        .map(|(name, result)| {
            let payload: ResultPayload = result
                .data
                .iter()
                .map(|(k, v)| {
                    let json = match v {
                        crate::results::ResultValue::Number(n) => {
                            serde_json::json!(n)
                        }
                        crate::results::ResultValue::Bool(b) => serde_json::json!(b),
                        crate::results::ResultValue::Text(t) => serde_json::json!(t),
                    };
                    (k.clone(), json)
                })
                .collect();
            (name.clone(), payload)
        })
        .collect()
}

/// Immutable snapshot of pipeline state, handed to callbacks on emit.
///
/// Field names match the canonical dict form verbatim (§6) — `serde`
/// serializes this struct directly, no rename table needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPacket {
    pub intent: Intent,
    pub confidence: f32,
    pub language: String,
    pub target_language: Option<String>,
    pub emotion: Emotion,
    pub timing: Timing,
    pub frame_id: u64,
    pub timestamp_ms: u64,
    /// `confidence > 0.6 ∧ intent ≠ unknown`, computed once at snapshot time.
    pub is_actionable: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub analysis_results: HashMap<String, ResultPayload>,
}

impl IntentPacket {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        intent: Intent,
        confidence: f32,
        language: String,
        target_language: Option<String>,
        emotion: Emotion,
        timing: Timing,
        frame_id: u64,
        timestamp_ms: u64,
        analysis_results: &HashMap<String, AnalysisResult>,
    ) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            is_actionable: confidence > 0.6 && intent != Intent::Unknown,
            intent,
            confidence,
            language,
            target_language,
            emotion,
            timing,
            frame_id,
            timestamp_ms,
            analysis_results: snapshot_results(analysis_results),
        }
    }

    /// A target language was requested and differs from the detected one.
    pub fn needs_translation(&self) -> bool {
        match &self.target_language {
            Some(target) => target != &self.language,
            None => false,
        }
    }
}
