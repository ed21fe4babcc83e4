//! Trace command - print the frames of one source file

use crate::render;
use anyhow::{Context, Result};
use std::fs;
use stepwise_runtime::{TraceError, TraceRequest, Tracer};

/// What `trace` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    /// The service response, `{"logs": [...]}`
    Json,
    /// One JSON object per recorded event
    Events,
    Instrumented,
}

/// Trace a source file
///
/// Returns an error when the program cannot be traced, or in human mode when
/// the trace ends with an error frame. JSON output always succeeds once the
/// file is read: failures are part of the response.
pub fn run(tracer: &Tracer, file_path: &str, mode: OutputMode) -> Result<()> {
    let source = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read source file: {}", file_path))?;

    match mode {
        OutputMode::Json => {
            let response = tracer.handle(&TraceRequest { code: source });
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        OutputMode::Instrumented => {
            let instrumented = tracer
                .instrument_source(&source)
                .map_err(|e| report(file_path, e))?;
            print!("{}", instrumented);
            Ok(())
        }
        OutputMode::Events => {
            let events = tracer
                .raw_events(&source)
                .map_err(|e| report(file_path, e))?;
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
            Ok(())
        }
        OutputMode::Human => {
            let frames = tracer.trace(&source).map_err(|e| report(file_path, e))?;
            for frame in &frames {
                print!("{}", render::frame(frame));
            }
            println!("{}", render::summary(&frames));

            match frames.last().and_then(|f| f.error.as_ref()) {
                Some(error) => Err(anyhow::anyhow!(
                    "{} failed: {}",
                    file_path,
                    error.message
                )),
                None => Ok(()),
            }
        }
    }
}

/// Print diagnostics for a program that could not be traced
fn report(file_path: &str, error: TraceError) -> anyhow::Error {
    if let TraceError::Instrumentation(instrumentation) = &error {
        eprintln!("Errors occurred while tracing {}:", file_path);
        eprintln!("{}", render::diagnostics(&instrumentation.diagnostics));
    }
    anyhow::Error::new(error).context(format!("Failed to trace {}", file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source_file(source: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", source).unwrap();
        file
    }

    #[test]
    fn test_trace_simple_program() {
        let file = source_file("let x = 1;\nx = x + 1;");
        let result = run(
            &Tracer::new(),
            file.path().to_str().unwrap(),
            OutputMode::Human,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_trace_missing_file() {
        let result = run(&Tracer::new(), "nonexistent.js", OutputMode::Human);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read source file"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let file = source_file("let = ;");
        let err = run(
            &Tracer::new(),
            file.path().to_str().unwrap(),
            OutputMode::Events,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to trace"));
    }

    #[test]
    fn test_runtime_error_fails_in_human_mode_only() {
        let file = source_file("null.x = 1;");
        let path = file.path().to_str().unwrap();
        assert!(run(&Tracer::new(), path, OutputMode::Human).is_err());
        assert!(run(&Tracer::new(), path, OutputMode::Json).is_ok());
    }
}
