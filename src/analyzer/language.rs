//! Language identification placeholder — §4.5.
//!
//! Real language ID needs a trained model; this analyzer keeps the seam
//! (and the published result shape) wired up without pulling one in. Swap
//! in a real implementation behind the same `Analyzer` trait when needed.

use super::Analyzer;
use crate::error::Result;
use crate::frame::{AudioFrame, FrameBuffer};
use crate::results::AnalysisResult;
use crate::state::PipelineState;

#[derive(Debug, Clone, Default)]
pub struct LanguageAnalyzer;

impl LanguageAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for LanguageAnalyzer {
    fn name(&self) -> &str {
        "language"
    }

    fn analyze(
        &mut self,
        frame: &AudioFrame,
        _buffer: &FrameBuffer,
        _state: &PipelineState,
    ) -> Result<AnalysisResult> {
        let mut result = AnalysisResult::new(self.name(), frame.frame_id, frame.timestamp_ms);
        result.set_text("language", "unknown").set_text("alternatives", "[]");
        Ok(result)
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;

    #[test]
    fn publishes_unknown_with_zero_confidence() {
        let mut analyzer = LanguageAnalyzer::new();
        let frame = AudioFrame::silence(0, 0, AudioConfig::default());
        let result = analyzer
            .analyze(&frame, &FrameBuffer::new(50, 1000), &PipelineState::new())
            .unwrap();
        assert_eq!(result.get_text("language", ""), "unknown");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn reset_is_a_no_op() {
        let mut analyzer = LanguageAnalyzer::new();
        analyzer.reset();
    }
}
