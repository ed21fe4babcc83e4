//! Frame reducer
//!
//! A left fold over the selected events. Each step takes the state by value and
//! hands back the next state plus at most one frame. Frames are emitted for
//! calls, returns and output, whenever the visible variables change, and for
//! the first write after a tested condition.

use super::frame::{CallFrame, Frame};
use crate::event::{Event, EventPayload};
use crate::snapshot::TraceValue;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the reducer carries between events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducerState {
    stack: Vec<CallFrame>,
    globals: BTreeMap<String, TraceValue>,
    stdout: Vec<String>,
    last_fingerprint: Option<String>,
    pending_context: Option<String>,
    next_step: usize,
    finished: bool,
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    globals: &'a BTreeMap<String, TraceValue>,
    locals: Vec<&'a BTreeMap<String, TraceValue>>,
}

/// Why a frame may be emitted
enum Emit {
    /// Calls, returns and output always produce a frame
    Always,
    /// Variable writes produce a frame when they change something or follow a test
    OnChange,
}

impl ReducerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call frames currently on the stack
    pub fn stack(&self) -> &[CallFrame] {
        &self.stack
    }

    pub fn globals(&self) -> &BTreeMap<String, TraceValue> {
        &self.globals
    }

    pub fn pending_context(&self) -> Option<&str> {
        self.pending_context.as_deref()
    }

    /// Whether an error event ended the trace
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fold one event into the state
    pub fn step(mut self, event: &Event) -> (Self, Option<Frame>) {
        if self.finished {
            return (self, None);
        }

        let frame = match &event.payload {
            EventPayload::Call { name, args } => {
                self.stack.push(CallFrame::new(name.clone(), args.clone()));
                self.emit(event.line, format!("call {}", name), Emit::Always)
            }
            EventPayload::Declare { vars } => {
                self.write_vars(vars);
                self.emit(event.line, format!("declare {}", names(vars)), Emit::OnChange)
            }
            EventPayload::Assign { vars } => {
                self.write_vars(vars);
                self.emit(event.line, format!("assign {}", names(vars)), Emit::OnChange)
            }
            EventPayload::Test { test, result } => {
                self.pending_context = Some(format!("Tested `{}`: {}", test, result.is_truthy()));
                None
            }
            EventPayload::Return { value } => {
                let value = value.clone().unwrap_or(TraceValue::Undefined);
                match self.stack.last_mut() {
                    Some(top) => {
                        top.return_value = Some(value);
                        top.returned = true;
                        let action = format!("return {}", top.name);
                        let frame = self.emit(event.line, action, Emit::Always);
                        self.stack.pop();
                        frame
                    }
                    None => self.emit(event.line, "return".to_string(), Emit::Always),
                }
            }
            EventPayload::Stdout { output } => {
                self.stdout.push(output.clone());
                self.emit(event.line, "stdout".to_string(), Emit::Always)
            }
            EventPayload::Loop { .. } | EventPayload::Class { .. } => None,
            EventPayload::Error {
                error_kind,
                message,
            } => {
                self.finished = true;
                let frame =
                    Frame::failure(self.next_step, event.line, *error_kind, message.clone());
                self.next_step += 1;
                Some(frame)
            }
        };

        (self, frame)
    }

    fn write_vars(&mut self, vars: &IndexMap<String, TraceValue>) {
        let scope = match self.stack.last_mut() {
            Some(top) => &mut top.locals,
            None => &mut self.globals,
        };
        for (name, value) in vars {
            scope.insert(name.clone(), value.clone());
        }
    }

    fn fingerprint(&self) -> String {
        let fingerprint = Fingerprint {
            globals: &self.globals,
            locals: self.stack.iter().map(|frame| &frame.locals).collect(),
        };
        serde_json::to_string(&fingerprint).unwrap_or_default()
    }

    fn emit(&mut self, line: i64, action: String, emit: Emit) -> Option<Frame> {
        let fingerprint = self.fingerprint();
        let changed = self.last_fingerprint.as_deref() != Some(fingerprint.as_str());
        let wanted = match emit {
            Emit::Always => true,
            Emit::OnChange => changed || self.pending_context.is_some(),
        };
        if !wanted {
            return None;
        }

        let context = self.pending_context.take();
        let action = match context {
            Some(_) => format!("{} (after test)", action),
            None => action,
        };
        let frame = Frame {
            step: self.next_step,
            line,
            action,
            context,
            stack: self.stack.clone(),
            globals: self.globals.clone(),
            stdout: self.stdout.clone(),
            error: None,
        };
        self.next_step += 1;
        self.last_fingerprint = Some(fingerprint);
        Some(frame)
    }
}

fn names(vars: &IndexMap<String, TraceValue>) -> String {
    vars.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Reduce `events` to frames, stopping at the first error
pub fn reduce(events: &[Event]) -> Vec<Frame> {
    let mut state = ReducerState::new();
    let mut frames = Vec::new();
    for event in events {
        let (next, frame) = state.step(event);
        state = next;
        frames.extend(frame);
        if state.is_finished() {
            break;
        }
    }
    frames
}
