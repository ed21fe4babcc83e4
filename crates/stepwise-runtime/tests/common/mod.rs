//! Shared test utilities for tracing tests

#![allow(dead_code)]

use stepwise_runtime::{Frame, TraceValue, Tracer};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Trace source code with the default limits, panicking on instrumentation errors
pub fn trace(source: &str) -> Vec<Frame> {
    match Tracer::new().trace(source) {
        Ok(frames) => frames,
        Err(error) => panic!("failed to trace {:?}: {}", source, error),
    }
}

/// The action of every frame, in order
pub fn actions(frames: &[Frame]) -> Vec<&str> {
    frames.iter().map(|f| f.action.as_str()).collect()
}

/// Serialize frames the way the service boundary does
pub fn to_json(frames: &[Frame]) -> String {
    serde_json::to_string(frames).expect("frames serialize")
}

pub fn num(n: f64) -> TraceValue {
    TraceValue::Number(n)
}

pub fn string(s: &str) -> TraceValue {
    TraceValue::String(s.to_string())
}
