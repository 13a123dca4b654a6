//! talkytalk-core: a real-time behavioral speech-signal pipeline.
//!
//! ```text
//! Source -> Pipeline(Analyzers -> Predictors) -> IntentPacket
//! ```
//!
//! The pipeline holds a bounded [`frame::FrameBuffer`], an ordered list of
//! [`analyzer::Analyzer`]s, an ordered list of [`predictor::Predictor`]s, and
//! a single mutable [`state::PipelineState`]. Each frame is pushed onto the
//! buffer, analyzers run in registration order publishing results, predictors
//! run in registration order mutating state, and on a time-gated schedule the
//! pipeline snapshots state into an [`packet::IntentPacket`].
//!
//! This crate performs no speech recognition and makes no decisions — it
//! produces signals for a downstream agent to act on.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod adapter;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod frame;
pub mod packet;
pub mod pipeline;
pub mod predictor;
pub mod results;
pub mod source;
pub mod state;

pub use config::{AudioConfig, PipelineConfig};
pub use error::{Result, TalkyTalkError};
pub use frame::{AudioFrame, FrameBuffer};
pub use packet::{Emotion, Intent, IntentPacket, Quadrant, Timing};
pub use pipeline::Pipeline;
pub use results::{AnalysisResult, ResultValue};
pub use state::PipelineState;
