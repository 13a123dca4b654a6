//! Predictor abstraction.
//!
//! Predictors are the inference half of the pipeline: they read published
//! analyzer results (via `state.result(name)`) and mutate `PipelineState`.
//! Unlike analyzers, predictors are allowed — expected — to write state.

pub mod early_intent;
pub mod intent;
pub mod timing;
pub mod turn_taking;

pub use early_intent::EarlyIntentPredictor;
pub use intent::IntentPredictor;
pub use timing::TimingPredictor;
pub use turn_taking::TurnTakingPredictor;

use crate::error::Result;
use crate::frame::{AudioFrame, FrameBuffer};
use crate::state::PipelineState;

/// Read-only context handed to a predictor alongside the mutable state.
///
/// `analysis_results` lives on `PipelineState` itself (`state.result(name)`)
/// rather than being duplicated here — splitting it out would either clone
/// the map every frame or alias `state` while it's mutably borrowed. Only
/// the per-frame inputs that aren't already reachable through `state` are
/// carried.
pub struct PredictionContext<'a> {
    pub frame: &'a AudioFrame,
    pub buffer: &'a FrameBuffer,
}

impl<'a> PredictionContext<'a> {
    pub fn new(frame: &'a AudioFrame, buffer: &'a FrameBuffer) -> Self {
        Self { frame, buffer }
    }
}

/// Trait for all predictor implementations.
pub trait Predictor: Send {
    /// Unique name within a pipeline.
    fn name(&self) -> &str;

    /// Predict from the current frame context, mutating shared state.
    fn predict(&mut self, context: &PredictionContext, state: &mut PipelineState) -> Result<()>;

    /// Reset any internal state.
    fn reset(&mut self);
}
