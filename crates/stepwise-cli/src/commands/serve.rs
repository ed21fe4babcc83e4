//! Serve command - one JSON request in, one JSON response out

use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use stepwise_runtime::{TraceRequest, Tracer};
use tracing::info;

/// Answer the request on stdin
pub fn run(tracer: &Tracer) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(tracer, stdin.lock(), stdout.lock())
}

/// Read a `TraceRequest` from `input` and write the `TraceResponse` to `output`
pub fn serve<R: Read, W: Write>(tracer: &Tracer, mut input: R, mut output: W) -> Result<()> {
    let mut raw = String::new();
    input
        .read_to_string(&mut raw)
        .context("Failed to read request from stdin")?;

    let request: TraceRequest =
        serde_json::from_str(&raw).context("Failed to parse trace request")?;
    let response = tracer.handle(&request);
    info!(frames = response.logs.len(), "request served");

    serde_json::to_writer(&mut output, &response).context("Failed to write response")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn respond(input: &str) -> Value {
        let mut output = Vec::new();
        serve(&Tracer::new(), input.as_bytes(), &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_serve_returns_logs() {
        let response =
            respond(r#"{"code": "function add(a, b) { return a + b; } add(2, 3);"}"#);
        let logs = response["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["action"], "call add");
        assert_eq!(logs[1]["stack"][0]["returnValue"]["type"], "number");
        assert_eq!(logs[1]["stack"][0]["returnValue"]["value"], 5.0);
    }

    #[test]
    fn test_serve_untraceable_program_is_one_error_frame() {
        let response = respond(r#"{"code": "let = ;"}"#);
        let logs = response["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["error"]["kind"], "instrumentation");
    }

    #[test]
    fn test_serve_rejects_malformed_request() {
        let mut output = Vec::new();
        let err = serve(&Tracer::new(), "not json".as_bytes(), &mut output).unwrap_err();
        assert!(err.to_string().contains("Failed to parse trace request"));
        assert!(output.is_empty());
    }
}
