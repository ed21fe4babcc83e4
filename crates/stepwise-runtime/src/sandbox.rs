//! Sandbox enforcement and resource quotas
//!
//! Every execution gets a fresh interpreter on its own worker thread with a
//! large native stack. The only bindings are the standard library and the
//! probe runtime. Failures never escape as errors: they are folded into a
//! single terminal `error` event.

use crate::diagnostic::Diagnostic;
use crate::event::{Event, FailureKind, UNKNOWN_LINE};
use crate::interpreter::Interpreter;
use crate::parser::parse_source;
use crate::probe::ProbeRecorder;
use crate::value::RuntimeError;
use std::thread;
use std::time::{Duration, Instant};
use stepwise_config::{Config, SandboxConfig, SnapshotConfig};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Prefix of every timeout message
pub const TIMEOUT_PREFIX: &str = "Program did not finish";

/// Sandbox errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SandboxError {
    /// The source handed to the sandbox does not parse
    #[error("source failed to parse: {}", first_message(.0))]
    Compile(Vec<Diagnostic>),

    #[error("failed to start sandbox worker: {0}")]
    Spawn(String),
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Resource quotas enforced by the interpreter
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceQuotas {
    /// Statements plus loop iterations
    pub step_budget: Option<u64>,
    /// Wall-clock budget
    pub time_limit: Option<Duration>,
    /// Maximum call nesting
    pub max_call_depth: Option<usize>,
}

impl Default for ResourceQuotas {
    fn default() -> Self {
        Self::from_config(&SandboxConfig::default())
    }
}

impl ResourceQuotas {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            step_budget: Some(config.step_budget),
            time_limit: Some(Duration::from_millis(config.time_budget_ms)),
            max_call_depth: Some(config.max_call_depth),
        }
    }

    /// No limits at all (tests and trusted callers only)
    pub fn unlimited() -> Self {
        Self {
            step_budget: None,
            time_limit: None,
            max_call_depth: None,
        }
    }
}

/// Resource usage tracking
#[derive(Debug, Clone)]
pub struct ResourceUsage {
    pub steps: u64,
    pub call_depth: usize,
    pub start_time: Instant,
}

impl ResourceUsage {
    pub fn new() -> Self {
        Self {
            steps: 0,
            call_depth: 0,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ResourceUsage {
    fn default() -> Self {
        Self::new()
    }
}

/// Isolated executor for instrumented programs
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    sandbox: SandboxConfig,
    snapshot: SnapshotConfig,
}

impl Sandbox {
    pub fn new(sandbox: SandboxConfig, snapshot: SnapshotConfig) -> Self {
        Self { sandbox, snapshot }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sandbox, config.snapshot)
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.sandbox
    }

    /// Parse and run `source`, returning the recorded events
    ///
    /// Runtime failures and exhausted budgets come back as a one-element list
    /// holding an `error` event; only an unparseable source or a worker that
    /// cannot be started is an `Err`.
    #[instrument(
        name = "sandbox::execute",
        level = "debug",
        skip(self, source),
        fields(bytes = source.len())
    )]
    pub fn execute(&self, source: &str) -> Result<Vec<Event>, SandboxError> {
        let source = source.to_string();
        let quotas = ResourceQuotas::from_config(&self.sandbox);
        let recorder = ProbeRecorder::new(Some(self.sandbox.max_events), self.snapshot.max_depth);

        let worker = thread::Builder::new()
            .name("stepwise-sandbox".to_string())
            .stack_size(self.sandbox.stack_size_mb.saturating_mul(1024 * 1024))
            .spawn(move || run_isolated(&source, quotas, recorder))
            .map_err(|e| SandboxError::Spawn(e.to_string()))?;

        match worker.join() {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(%detail, "sandbox worker panicked");
                Ok(vec![Event::error(
                    FailureKind::Execution,
                    format!("Internal error: {}", detail),
                    UNKNOWN_LINE,
                )])
            }
        }
    }
}

fn run_isolated(
    source: &str,
    quotas: ResourceQuotas,
    recorder: ProbeRecorder,
) -> Result<Vec<Event>, SandboxError> {
    let program = parse_source(source).map_err(SandboxError::Compile)?;

    let mut interpreter = Interpreter::with_quotas(quotas);
    interpreter.install_probe_runtime(recorder);

    let outcome = interpreter.eval(&program);
    let steps = interpreter.steps();
    let events = std::mem::take(interpreter.recorder_mut()).into_events();

    match outcome {
        Ok(()) => {
            debug!(steps, events = events.len(), "program finished");
            Ok(events)
        }
        Err(error) => {
            debug!(steps, discarded = events.len(), %error, "program failed");
            Ok(vec![failure_event(&error)])
        }
    }
}

/// Map a runtime error onto the terminal event
pub fn failure_event(error: &RuntimeError) -> Event {
    if error.is_timeout() {
        Event::error(
            FailureKind::Timeout,
            format!("{}: {}", TIMEOUT_PREFIX, error),
            UNKNOWN_LINE,
        )
    } else {
        Event::error(FailureKind::Execution, error.to_string(), UNKNOWN_LINE)
    }
}
