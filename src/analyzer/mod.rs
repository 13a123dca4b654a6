//! Analyzer abstraction.
//!
//! Analyzers are the primary extensibility point on the feature-extraction
//! side: swap in a different VAD, prosody model, or emotion estimator
//! without touching the pipeline. An analyzer publishes a result into the
//! results map and must never mutate `PipelineState` directly.

pub mod emotion;
pub mod language;
pub mod prosody;
pub mod vad;

pub use emotion::EmotionAnalyzer;
pub use language::LanguageAnalyzer;
pub use prosody::ProsodyAnalyzer;
pub use vad::VadAnalyzer;

use crate::error::Result;
use crate::frame::{AudioFrame, FrameBuffer};
use crate::results::AnalysisResult;
use crate::state::PipelineState;

/// Trait for all analyzer implementations.
///
/// Implementors may be stateful (noise floor, pitch history, pause clocks),
/// but must be side-effect-free on `PipelineState` — all output flows
/// through the returned `AnalysisResult`.
pub trait Analyzer: Send {
    /// Unique name within a pipeline; also the key under which results are
    /// published into `PipelineState::analysis_results`.
    fn name(&self) -> &str;

    /// Analyze one frame, reading from the buffer and current state but
    /// never writing to it.
    fn analyze(
        &mut self,
        frame: &AudioFrame,
        buffer: &FrameBuffer,
        state: &PipelineState,
    ) -> Result<AnalysisResult>;

    /// Reset any internal state (hangover counters, pitch history, etc.).
    fn reset(&mut self);
}
