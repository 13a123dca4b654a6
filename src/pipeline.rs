//! The pipeline: owns the buffer, the registered analyzers/predictors, and
//! the single mutable `PipelineState`; drives frames through to emitted
//! packets on a time-gated schedule — §4.1, §5.

use tracing::{debug, info, info_span, warn};

use crate::analyzer::{Analyzer, EmotionAnalyzer, LanguageAnalyzer, ProsodyAnalyzer, VadAnalyzer};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::frame::{AudioFrame, FrameBuffer};
use crate::packet::IntentPacket;
use crate::predictor::{
    EarlyIntentPredictor, IntentPredictor, PredictionContext, Predictor, TimingPredictor,
    TurnTakingPredictor,
};
use crate::source::{AsyncAudioSource, AudioSource};
use crate::state::PipelineState;

type PacketCallback = Box<dyn FnMut(&IntentPacket) + Send>;

/// Cooperative, single-threaded signal pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    analyzers: Vec<Box<dyn Analyzer>>,
    predictors: Vec<Box<dyn Predictor>>,
    callbacks: Vec<PacketCallback>,
    buffer: FrameBuffer,
    state: PipelineState,
    last_emit_ms: u64,
    stopped: bool,
}

impl Pipeline {
    /// An empty pipeline with no registered components; callers build up
    /// their own subset via `register_analyzer`/`register_predictor`.
    pub fn new(config: PipelineConfig) -> Self {
        let buffer = FrameBuffer::new(50, config.buffer_duration_ms);
        info!(sample_rate = config.audio.sample_rate, "pipeline constructed");
        Self {
            config,
            analyzers: Vec::new(),
            predictors: Vec::new(),
            callbacks: Vec::new(),
            buffer,
            state: PipelineState::new(),
            last_emit_ms: 0,
            stopped: false,
        }
    }

    /// Pipeline pre-wired with the canonical VAD/Prosody/Emotion/Language
    /// analyzers and Intent/Timing/EarlyIntent/TurnTaking predictors, in
    /// registration order.
    pub fn with_default_components(config: PipelineConfig) -> Self {
        let mut pipeline = Self::new(config);
        pipeline.register_analyzer(Box::new(VadAnalyzer::default()));
        pipeline.register_analyzer(Box::new(ProsodyAnalyzer::try_new(50.0, 500.0).expect("valid defaults")));
        pipeline.register_analyzer(Box::new(EmotionAnalyzer::new()));
        pipeline.register_analyzer(Box::new(LanguageAnalyzer::new()));
        pipeline.register_predictor(Box::new(IntentPredictor::new()));
        pipeline.register_predictor(Box::new(TimingPredictor::default()));
        pipeline.register_predictor(Box::new(EarlyIntentPredictor::default()));
        pipeline.register_predictor(Box::new(TurnTakingPredictor::default()));
        pipeline
    }

    pub fn register_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn register_predictor(&mut self, predictor: Box<dyn Predictor>) {
        self.predictors.push(predictor);
    }

    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&IntentPacket) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Cooperative stop: checked by `run`/`run_async` before consuming the
    /// next frame from a source. Never interrupts an in-flight frame.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Process one frame to completion: buffer, analyzers, predictors, then
    /// the emit gate. Component faults are logged and skipped; the frame
    /// still completes with whatever state prior components produced.
    pub fn process_frame(&mut self, frame: AudioFrame) -> Result<Option<IntentPacket>> {
        let span = info_span!("process_frame", frame_id = frame.frame_id, timestamp_ms = frame.timestamp_ms);
        let _enter = span.enter();

        self.buffer.push(frame.clone());

        for analyzer in &mut self.analyzers {
            match analyzer.analyze(&frame, &self.buffer, &self.state) {
                Ok(result) => {
                    debug!(analyzer = analyzer.name(), "analyzer produced result");
                    self.state.publish(result);
                }
                Err(err) => {
                    warn!(component = analyzer.name(), frame_id = frame.frame_id, error = %err, "analyzer faulted, skipping");
                }
            }
        }

        let context = PredictionContext::new(&frame, &self.buffer);
        for predictor in &mut self.predictors {
            if let Err(err) = predictor.predict(&context, &mut self.state) {
                warn!(component = predictor.name(), frame_id = frame.frame_id, error = %err, "predictor faulted, skipping");
            }
        }

        self.state.clamp_invariants();

        let gap = frame.timestamp_ms.saturating_sub(self.last_emit_ms);
        let should_emit =
            gap >= self.config.emit_interval_ms && self.state.intent_confidence >= self.config.min_confidence_to_emit;

        if !should_emit {
            return Ok(None);
        }

        self.last_emit_ms = frame.timestamp_ms;
        let packet = IntentPacket::new(
            self.state.current_intent,
            self.state.intent_confidence,
            self.state.language.clone(),
            self.state.target_language.clone(),
            self.state.emotion,
            self.state.timing,
            frame.frame_id,
            frame.timestamp_ms,
            &self.state.analysis_results,
        );
        info!(frame_id = packet.frame_id, intent = packet.intent.as_str(), "emitting packet");

        for callback in &mut self.callbacks {
            callback(&packet);
        }

        Ok(Some(packet))
    }

    /// Drive a blocking source to exhaustion (or until `stop()`), collecting
    /// every emitted packet. Closes the source on both the success and
    /// error paths.
    pub fn run(&mut self, source: &mut dyn AudioSource) -> Result<Vec<IntentPacket>> {
        let result = self.run_inner(source);
        source.close();
        result
    }

    fn run_inner(&mut self, source: &mut dyn AudioSource) -> Result<Vec<IntentPacket>> {
        let mut packets = Vec::new();
        while !self.stopped {
            match source.next_frame()? {
                Some(frame) => {
                    if let Some(packet) = self.process_frame(frame)? {
                        packets.push(packet);
                    }
                }
                None => break,
            }
        }
        Ok(packets)
    }

    /// Async counterpart: yields to the host scheduler after each processed
    /// frame via `tokio::task::yield_now()`.
    pub async fn run_async(&mut self, source: &mut dyn AsyncAudioSource) -> Result<Vec<IntentPacket>> {
        let result = self.run_async_inner(source).await;
        source.close();
        result
    }

    async fn run_async_inner(&mut self, source: &mut dyn AsyncAudioSource) -> Result<Vec<IntentPacket>> {
        let mut packets = Vec::new();
        while !self.stopped {
            match source.next_frame().await? {
                Some(frame) => {
                    if let Some(packet) = self.process_frame(frame)? {
                        packets.push(packet);
                    }
                    tokio::task::yield_now().await;
                }
                None => break,
            }
        }
        Ok(packets)
    }

    /// Clears the buffer, state, and emit clock, and resets every
    /// registered analyzer/predictor. Leaves the stop flag cleared too.
    pub fn reset(&mut self) {
        info!("pipeline reset");
        self.buffer.clear();
        self.state = PipelineState::new();
        self.last_emit_ms = 0;
        self.stopped = false;
        for analyzer in &mut self.analyzers {
            analyzer.reset();
        }
        for predictor in &mut self.predictors {
            predictor.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::results::AnalysisResult;

    /// A scripted analyzer that reports speech on demand, for deterministic
    /// emit-gate and fault-isolation tests without real DSP.
    struct ScriptedVad {
        script: Vec<bool>,
        index: usize,
    }

    impl Analyzer for ScriptedVad {
        fn name(&self) -> &str {
            "vad"
        }

        fn analyze(&mut self, frame: &AudioFrame, _buffer: &FrameBuffer, _state: &PipelineState) -> Result<AnalysisResult> {
            let is_speech = self.script.get(self.index).copied().unwrap_or(false);
            self.index += 1;
            let mut result = AnalysisResult::new(self.name(), frame.frame_id, frame.timestamp_ms);
            result.set_bool("is_speech", is_speech);
            Ok(result)
        }

        fn reset(&mut self) {
            self.index = 0;
        }
    }

    struct FaultyAnalyzer;

    impl Analyzer for FaultyAnalyzer {
        fn name(&self) -> &str {
            "faulty"
        }

        fn analyze(&mut self, _frame: &AudioFrame, _buffer: &FrameBuffer, _state: &PipelineState) -> Result<AnalysisResult> {
            Err(crate::error::TalkyTalkError::Component {
                name: "faulty".into(),
                reason: "always fails".into(),
            })
        }

        fn reset(&mut self) {}
    }

    fn frame_at(ts: u64) -> AudioFrame {
        AudioFrame::silence(0, ts, AudioConfig::default())
    }

    #[test]
    fn emit_gate_respects_interval() {
        let config = PipelineConfig::try_new(AudioConfig::default(), 1000, 100, 0.0).unwrap();
        let mut pipeline = Pipeline::new(config);
        pipeline.register_analyzer(Box::new(ScriptedVad { script: vec![], index: 0 }));

        assert!(pipeline.process_frame(frame_at(0)).unwrap().is_none());
        assert!(pipeline.process_frame(frame_at(40)).unwrap().is_none());
        assert!(pipeline.process_frame(frame_at(100)).unwrap().is_some());
    }

    #[test]
    fn faulty_component_is_skipped_not_fatal() {
        let config = PipelineConfig::default();
        let mut pipeline = Pipeline::new(config);
        pipeline.register_analyzer(Box::new(FaultyAnalyzer));
        let result = pipeline.process_frame(frame_at(0));
        assert!(result.is_ok());
    }

    #[test]
    fn reset_clears_buffer_state_and_emit_clock() {
        let config = PipelineConfig::try_new(AudioConfig::default(), 1000, 100, 0.0).unwrap();
        let mut pipeline = Pipeline::new(config);
        pipeline.process_frame(frame_at(0)).unwrap();
        pipeline.process_frame(frame_at(100)).unwrap();
        pipeline.reset();
        assert_eq!(pipeline.buffer.len(), 0);
        assert_eq!(pipeline.last_emit_ms, 0);
        assert!(!pipeline.is_stopped());
    }

    #[test]
    fn stop_halts_run_before_next_frame() {
        use crate::source::SilenceSource;
        let config = PipelineConfig::try_new(AudioConfig::default(), 1000, 20, 0.0).unwrap();
        let mut pipeline = Pipeline::with_default_components(config);
        pipeline.stop();
        let mut source = SilenceSource::new(AudioConfig::default(), 200);
        let packets = pipeline.run(&mut source).unwrap();
        assert!(packets.is_empty());
    }

    #[test]
    fn callbacks_fire_in_registration_order() {
        use std::sync::{Arc, Mutex};
        let config = PipelineConfig::try_new(AudioConfig::default(), 1000, 20, 0.0).unwrap();
        let mut pipeline = Pipeline::new(config);
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_a = Arc::clone(&order);
        let order_b = Arc::clone(&order);
        pipeline.register_callback(move |_| order_a.lock().unwrap().push("a"));
        pipeline.register_callback(move |_| order_b.lock().unwrap().push("b"));
        pipeline.process_frame(frame_at(0)).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn default_components_produce_packets_end_to_end() {
        use crate::source::SineSource;
        let config = PipelineConfig::try_new(AudioConfig::default(), 1000, 100, 0.0).unwrap();
        let mut pipeline = Pipeline::with_default_components(config);
        let mut source = SineSource::new(AudioConfig::default(), 200.0, 0.5, 500);
        let packets = pipeline.run(&mut source).unwrap();
        assert!(packets.len() >= 4);
        for packet in &packets {
            assert!((0.0..=1.0).contains(&packet.confidence));
            assert!((0.0..=1.0).contains(&packet.emotion.arousal));
        }
    }
}
