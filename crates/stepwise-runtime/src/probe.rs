//! Probe runtime
//!
//! The two functions instrumented code calls: `__snapshot(value)` freezes a
//! value into a [`TraceValue`], `__record(payload)` decodes a probe payload
//! object into an [`Event`] and appends it to the recorder.

use crate::event::{Event, EventPayload, UNKNOWN_LINE};
use crate::interpreter::Interpreter;
use crate::snapshot::{TraceValue, DEFAULT_SNAPSHOT_DEPTH};
use crate::span::Span;
use crate::value::{RuntimeError, Value};
use indexmap::IndexMap;
use std::rc::Rc;

/// Name of the event recording function
pub const RECORD_FN: &str = "__record";
/// Name of the snapshot function
pub const SNAPSHOT_FN: &str = "__snapshot";

/// Collects events for one run
#[derive(Debug, Clone)]
pub struct ProbeRecorder {
    events: Vec<Event>,
    max_events: Option<usize>,
    snapshot_depth: usize,
}

impl Default for ProbeRecorder {
    fn default() -> Self {
        Self::new(None, DEFAULT_SNAPSHOT_DEPTH)
    }
}

impl ProbeRecorder {
    pub fn new(max_events: Option<usize>, snapshot_depth: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
            snapshot_depth,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Freeze `value` as seen right now
    pub fn snapshot(&self, value: &Value) -> TraceValue {
        TraceValue::capture(value, self.snapshot_depth)
    }

    /// Decode a probe payload and append the resulting event
    pub fn record(&mut self, payload: &Value, span: Span) -> Result<(), RuntimeError> {
        if let Some(limit) = self.max_events {
            if self.events.len() >= limit {
                return Err(RuntimeError::EventLimitExceeded { limit, span });
            }
        }
        let event = self.decode(payload, span)?;
        self.events.push(event);
        Ok(())
    }

    fn decode(&self, payload: &Value, span: Span) -> Result<Event, RuntimeError> {
        let Value::Object(object) = payload else {
            return Err(malformed("payload is not an object", span));
        };
        let object = object.borrow();
        let fields = &object.properties;

        let line = match fields.get("line") {
            Some(Value::Number(n)) if n.is_finite() => *n as i64,
            _ => UNKNOWN_LINE,
        };
        let kind = match fields.get("kind") {
            Some(Value::String(kind)) => kind.to_string(),
            _ => return Err(malformed("missing kind", span)),
        };

        let text = |key: &str| -> Result<String, RuntimeError> {
            match fields.get(key) {
                Some(Value::String(s)) => Ok(s.to_string()),
                _ => Err(malformed(&format!("{} event without '{}'", kind, key), span)),
            }
        };
        let mapping = |key: &str| -> Result<IndexMap<String, TraceValue>, RuntimeError> {
            match fields.get(key) {
                Some(Value::Object(map)) => Ok(map
                    .borrow()
                    .properties
                    .iter()
                    .map(|(name, value)| (name.clone(), self.frozen(value)))
                    .collect()),
                _ => Err(malformed(&format!("{} event without '{}'", kind, key), span)),
            }
        };

        let payload = match kind.as_str() {
            "call" => EventPayload::Call {
                name: text("name")?,
                args: mapping("args")?,
            },
            "return" => EventPayload::Return {
                value: fields.get("value").map(|v| self.frozen(v)),
            },
            "declare" => EventPayload::Declare {
                vars: mapping("vars")?,
            },
            "assign" => EventPayload::Assign {
                vars: mapping("vars")?,
            },
            "test" => EventPayload::Test {
                test: text("test")?,
                result: fields
                    .get("result")
                    .map(|v| self.frozen(v))
                    .unwrap_or(TraceValue::Undefined),
            },
            "loop" => EventPayload::Loop {
                loop_kind: text("loop")?,
            },
            "stdout" => {
                let output = match fields.get("output") {
                    Some(Value::Array(parts)) => parts
                        .borrow()
                        .iter()
                        .map(|part| self.frozen(part).display())
                        .collect::<Vec<_>>()
                        .join(" "),
                    Some(other) => self.frozen(other).display(),
                    None => String::new(),
                };
                EventPayload::Stdout { output }
            }
            "class" => EventPayload::Class {
                name: text("name")?,
            },
            other => return Err(malformed(&format!("unknown kind '{}'", other), span)),
        };

        Ok(Event::new(line, payload))
    }

    /// Snapshot slots normally hold frozen values already
    fn frozen(&self, value: &Value) -> TraceValue {
        match value {
            Value::Snapshot(snapshot) => snapshot.as_ref().clone(),
            other => self.snapshot(other),
        }
    }
}

fn malformed(detail: &str, span: Span) -> RuntimeError {
    RuntimeError::type_error(format!("malformed probe payload: {}", detail), span)
}

/// Bind `__record` and `__snapshot` as globals
pub(crate) fn install(interp: &mut Interpreter) {
    interp.define_global(RECORD_FN, Value::native(RECORD_FN, record));
    interp.define_global(SNAPSHOT_FN, Value::native(SNAPSHOT_FN, snapshot));
}

fn record(
    interp: &mut Interpreter,
    _: &Value,
    args: Vec<Value>,
    span: Span,
) -> Result<Value, RuntimeError> {
    let payload = args.into_iter().next().unwrap_or(Value::Undefined);
    interp.recorder_mut().record(&payload, span)?;
    Ok(Value::Undefined)
}

fn snapshot(
    interp: &mut Interpreter,
    _: &Value,
    args: Vec<Value>,
    _: Span,
) -> Result<Value, RuntimeError> {
    let value = args.into_iter().next().unwrap_or(Value::Undefined);
    Ok(Value::Snapshot(Rc::new(interp.recorder().snapshot(&value))))
}
