//! Frames: the reducer's output

use crate::event::FailureKind;
use crate::snapshot::TraceValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One function activation as seen by the learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub name: String,
    pub arguments: IndexMap<String, TraceValue>,
    pub locals: BTreeMap<String, TraceValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<TraceValue>,
    #[serde(default)]
    pub returned: bool,
}

impl CallFrame {
    pub fn new(name: impl Into<String>, arguments: IndexMap<String, TraceValue>) -> Self {
        Self {
            name: name.into(),
            arguments,
            locals: BTreeMap::new(),
            return_value: None,
            returned: false,
        }
    }
}

/// Failure attached to a terminal frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameError {
    pub kind: FailureKind,
    pub message: String,
}

/// Snapshot of the program state at one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub step: usize,
    pub line: i64,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Outermost call first
    pub stack: Vec<CallFrame>,
    pub globals: BTreeMap<String, TraceValue>,
    /// Every line printed so far
    pub stdout: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FrameError>,
}

impl Frame {
    /// Terminal frame carrying nothing but the failure
    pub fn failure(step: usize, line: i64, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            step,
            line,
            action: "error".to_string(),
            context: None,
            stack: Vec::new(),
            globals: BTreeMap::new(),
            stdout: Vec::new(),
            error: Some(FrameError {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Frames still waiting for their return
    pub fn open_frames(&self) -> usize {
        self.stack.iter().filter(|frame| !frame.returned).count()
    }
}
