//! Raw execution events emitted by the probe runtime

use crate::snapshot::TraceValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Line used when an event has no known source position
pub const UNKNOWN_LINE: i64 = -1;

/// One observation made while the instrumented program ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub line: i64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Kind-specific part of an [`Event`], tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventPayload {
    Call {
        name: String,
        args: IndexMap<String, TraceValue>,
    },
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<TraceValue>,
    },
    Declare {
        vars: IndexMap<String, TraceValue>,
    },
    Assign {
        vars: IndexMap<String, TraceValue>,
    },
    Test {
        test: String,
        result: TraceValue,
    },
    Loop {
        #[serde(rename = "loop")]
        loop_kind: String,
    },
    Stdout {
        output: String,
    },
    Class {
        name: String,
    },
    Error {
        #[serde(rename = "errorKind")]
        error_kind: FailureKind,
        message: String,
    },
}

/// Event discriminant without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Call,
    Return,
    Declare,
    Assign,
    Test,
    Loop,
    Stdout,
    Class,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Call => "call",
            EventKind::Return => "return",
            EventKind::Declare => "declare",
            EventKind::Assign => "assign",
            EventKind::Test => "test",
            EventKind::Loop => "loop",
            EventKind::Stdout => "stdout",
            EventKind::Class => "class",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why execution stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Uncaught error raised by the program
    Execution,
    /// A step, time or event budget ran out
    Timeout,
    /// The program was never run: it does not parse or uses reserved names
    Instrumentation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Execution => "execution",
            FailureKind::Timeout => "timeout",
            FailureKind::Instrumentation => "instrumentation",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    pub fn new(line: i64, payload: EventPayload) -> Self {
        Self { line, payload }
    }

    /// Terminal failure event
    pub fn error(kind: FailureKind, message: impl Into<String>, line: i64) -> Self {
        Self::new(
            line,
            EventPayload::Error {
                error_kind: kind,
                message: message.into(),
            },
        )
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Call { .. } => EventKind::Call,
            EventPayload::Return { .. } => EventKind::Return,
            EventPayload::Declare { .. } => EventKind::Declare,
            EventPayload::Assign { .. } => EventKind::Assign,
            EventPayload::Test { .. } => EventKind::Test,
            EventPayload::Loop { .. } => EventKind::Loop,
            EventPayload::Stdout { .. } => EventKind::Stdout,
            EventPayload::Class { .. } => EventKind::Class,
            EventPayload::Error { .. } => EventKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind() == EventKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serializes_flat() {
        let mut args = IndexMap::new();
        args.insert("a".to_string(), TraceValue::Number(2.0));
        let event = Event::new(
            1,
            EventPayload::Call {
                name: "add".to_string(),
                args,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "line": 1,
                "kind": "call",
                "name": "add",
                "args": {"a": {"type": "number", "value": 2.0}}
            })
        );
    }

    #[test]
    fn test_bare_return_omits_value() {
        let event = Event::new(3, EventPayload::Return { value: None });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"line":3,"kind":"return"}"#);
    }

    #[test]
    fn test_round_trip() {
        let event = Event::error(FailureKind::Timeout, "did not finish", UNKNOWN_LINE);
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.kind(), EventKind::Error);
    }
}
