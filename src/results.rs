//! `AnalysisResult` — the ephemeral, per-frame output of an analyzer.
//!
//! The payload is a small closed sum type rather than an untyped bag: typed
//! getters (`get_number`, `get_bool`, `get_text`) give static safety while
//! keeping the dynamic-lookup-by-name ergonomics the spec describes.

use std::collections::HashMap;

/// One value kind an analyzer may publish under a named key.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

/// Output of one analyzer for one frame.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub analyzer_name: String,
    pub frame_id: u64,
    pub timestamp_ms: u64,
    pub data: HashMap<String, ResultValue>,
    pub confidence: f32,
}

impl AnalysisResult {
    pub fn new(analyzer_name: impl Into<String>, frame_id: u64, timestamp_ms: u64) -> Self {
        Self {
            analyzer_name: analyzer_name.into(),
            frame_id,
            timestamp_ms,
            data: HashMap::new(),
            confidence: 0.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn set_number(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.data.insert(key.into(), ResultValue::Number(value));
        self
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.data.insert(key.into(), ResultValue::Bool(value));
        self
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.data.insert(key.into(), ResultValue::Text(value.into()));
        self
    }

    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        match self.data.get(key) {
            Some(ResultValue::Number(n)) => *n,
            _ => default,
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.data.get(key) {
            Some(ResultValue::Bool(b)) => *b,
            _ => default,
        }
    }

    pub fn get_text<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.data.get(key) {
            Some(ResultValue::Text(t)) => t,
            _ => default,
        }
    }
}
