//! Stepwise runtime - step-by-step execution traces for teaching
//!
//! This library turns a snippet of a small JavaScript-like language into a
//! sequence of frames describing each meaningful step of its execution:
//! - Lexing, parsing and printing of the traced language
//! - Instrumentation with probe calls
//! - Sandboxed execution on a tree-walking interpreter
//! - Run selection and frame reduction

/// Stepwise runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod ast;
pub mod diagnostic;
pub mod event;
pub mod instrument;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod probe;
pub mod runtime;
pub mod sandbox;
pub mod snapshot;
pub mod span;
pub mod token;
pub mod trace;
pub mod value;

// Re-export commonly used types
pub use diagnostic::{Diagnostic, DiagnosticLevel, DIAG_VERSION};
pub use event::{Event, EventKind, EventPayload, FailureKind, UNKNOWN_LINE};
pub use instrument::{instrument_source, InstrumentationError, Instrumenter};
pub use interpreter::Interpreter;
pub use lexer::Lexer;
pub use parser::{parse_source, Parser};
pub use printer::{print_expr, print_program};
pub use probe::ProbeRecorder;
pub use runtime::{TraceError, TraceRequest, TraceResponse, Tracer};
pub use sandbox::{ResourceQuotas, Sandbox, SandboxError};
pub use snapshot::TraceValue;
pub use span::Span;
pub use token::{Token, TokenKind};
pub use trace::{
    frames_from_events, reduce, select_run, CallFrame, Frame, FrameError, ReducerState,
};
pub use value::{RuntimeError, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoke() {
        assert_eq!(VERSION, "0.1.0");
    }
}
