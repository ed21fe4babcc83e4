//! Human-readable frame output

use colored::*;
use std::collections::BTreeMap;
use stepwise_runtime::{CallFrame, Diagnostic, Frame, TraceValue};

const INDENT: &str = "      ";

/// Render one frame as a block of lines
pub fn frame(frame: &Frame) -> String {
    let line = if frame.line < 0 {
        "?".to_string()
    } else {
        frame.line.to_string()
    };
    let header = format!("#{:<4} line {:<4}", frame.step, line);

    if let Some(error) = &frame.error {
        return format!(
            "{} {} {}\n",
            header.dimmed(),
            format!("error ({})", error.kind).red().bold(),
            error.message
        );
    }

    let mut lines = vec![format!("{} {}", header.dimmed(), frame.action.bold())];
    if let Some(context) = &frame.context {
        lines.push(format!("{}{} {}", INDENT, "context".cyan(), context));
    }
    for call in &frame.stack {
        lines.push(format!("{}{} {}", INDENT, "call".cyan(), call_line(call)));
    }
    if !frame.globals.is_empty() {
        lines.push(format!("{}{} {}", INDENT, "globals".cyan(), vars(&frame.globals)));
    }
    if frame.action == "stdout" {
        if let Some(output) = frame.stdout.last() {
            lines.push(format!("{}{} {}", INDENT, "stdout".cyan(), output));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn call_line(call: &CallFrame) -> String {
    let args: Vec<String> = call
        .arguments
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.inspect()))
        .collect();
    let mut out = format!("{}({})", call.name, args.join(", "));
    if !call.locals.is_empty() {
        out.push_str(&format!(" {{ {} }}", vars(&call.locals)));
    }
    if call.returned {
        let value = call
            .return_value
            .as_ref()
            .map(TraceValue::inspect)
            .unwrap_or_else(|| "undefined".to_string());
        out.push_str(&format!(" => {}", value));
    }
    out
}

fn vars(scope: &BTreeMap<String, TraceValue>) -> String {
    scope
        .iter()
        .map(|(name, value)| format!("{} = {}", name, value.inspect()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Closing line after all frames
pub fn summary(frames: &[Frame]) -> String {
    let failed = frames.last().map(Frame::is_error).unwrap_or(false);
    let count = format!("{} frame{}", frames.len(), if frames.len() == 1 { "" } else { "s" });
    if failed {
        format!("{} {}", count, "(ended with an error)".red())
    } else {
        count.dimmed().to_string()
    }
}

/// Diagnostics for a program that could not be instrumented
pub fn diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_human_string)
        .collect::<Vec<_>>()
        .join("\n")
}
