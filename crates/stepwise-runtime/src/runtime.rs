//! Tracing pipeline API for embedding

use crate::event::{Event, FailureKind};
use crate::instrument::{instrument_source, InstrumentationError};
use crate::sandbox::{Sandbox, SandboxError};
use crate::trace::{frames_from_events, Frame};
use serde::{Deserialize, Serialize};
use stepwise_config::Config;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Pipeline errors
///
/// Failures of the traced program itself are not errors: they end the trace
/// with an error frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraceError {
    #[error("cannot trace this program: {0}")]
    Instrumentation(#[from] InstrumentationError),

    #[error(transparent)]
    Sandbox(SandboxError),
}

impl From<SandboxError> for TraceError {
    fn from(error: SandboxError) -> Self {
        match error {
            SandboxError::Compile(diagnostics) => TraceError::Instrumentation(diagnostics.into()),
            other => TraceError::Sandbox(other),
        }
    }
}

impl TraceError {
    /// Source line the error points at, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            TraceError::Instrumentation(error) => error.diagnostics.first().map(|d| d.line),
            TraceError::Sandbox(_) => None,
        }
    }

    /// Kind reported in the error frame for this failure
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TraceError::Instrumentation(_) => FailureKind::Instrumentation,
            TraceError::Sandbox(_) => FailureKind::Execution,
        }
    }
}

/// Service request: one snippet to trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRequest {
    pub code: String,
}

/// Service response: the frames, or a single error frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResponse {
    pub logs: Vec<Frame>,
}

/// Tracing pipeline
///
/// Holds only configuration, so one tracer can serve many threads.
///
/// # Examples
///
/// ```
/// use stepwise_runtime::Tracer;
///
/// let tracer = Tracer::new();
/// let frames = tracer.trace("function add(a, b) { return a + b; } add(2, 3);").unwrap();
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[0].action, "call add");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    sandbox: Sandbox,
}

impl Tracer {
    /// Tracer with the default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            sandbox: Sandbox::from_config(config),
        }
    }

    pub fn with_sandbox(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// The rewritten program that actually runs
    pub fn instrument_source(&self, source: &str) -> Result<String, TraceError> {
        Ok(instrument_source(source)?)
    }

    /// Every event the program records, before run selection
    pub fn raw_events(&self, source: &str) -> Result<Vec<Event>, TraceError> {
        let instrumented = self.instrument_source(source)?;
        Ok(self.sandbox.execute(&instrumented)?)
    }

    /// Trace `source` into frames
    ///
    /// # Examples
    ///
    /// ```
    /// use stepwise_runtime::Tracer;
    ///
    /// let frames = Tracer::new().trace("while (true) {}").unwrap();
    /// assert_eq!(frames.len(), 1);
    /// assert!(frames[0].is_error());
    /// ```
    #[instrument(name = "tracer::trace", level = "debug", skip(self, source))]
    pub fn trace(&self, source: &str) -> Result<Vec<Frame>, TraceError> {
        let events = self.raw_events(source)?;
        let frames = frames_from_events(&events);
        debug!(events = events.len(), frames = frames.len(), "trace complete");
        Ok(frames)
    }

    /// Answer a service request; never fails
    pub fn handle(&self, request: &TraceRequest) -> TraceResponse {
        match self.trace(&request.code) {
            Ok(logs) => TraceResponse { logs },
            Err(error) => {
                warn!(%error, "request could not be traced");
                let line = error.line().map(|l| l as i64).unwrap_or(-1);
                TraceResponse {
                    logs: vec![Frame::failure(
                        0,
                        line,
                        error.failure_kind(),
                        error.to_string(),
                    )],
                }
            }
        }
    }
}
