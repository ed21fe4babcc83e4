//! Batch command - trace many files in parallel

use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde_json::json;
use std::fs;
use std::time::{Duration, Instant};
use stepwise_runtime::Tracer;

/// How tracing one file ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The program ran to completion
    Traced { frames: usize },
    /// The trace ended with an error frame
    Failed { frames: usize, message: String },
    /// The file could not be read or instrumented
    Rejected { message: String },
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Traced { .. })
    }
}

/// One file's entry in the summary
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub file: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

/// Trace every file, printing one line per file and a summary
pub fn run(tracer: &Tracer, files: &[String], json: bool) -> Result<()> {
    let progress = if json {
        ProgressBar::hidden()
    } else {
        progress_bar(files.len())
    };
    let entries = trace_all(tracer, files, &progress);
    progress.finish_and_clear();
    let failed = entries.iter().filter(|e| !e.outcome.is_ok()).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&entries))?);
    } else {
        for entry in &entries {
            println!("{}", entry_line(entry));
        }
        println!();
        println!(
            "{}: {} traced, {} failed",
            "Summary".bold(),
            (entries.len() - failed).to_string().green(),
            if failed > 0 {
                failed.to_string().red()
            } else {
                failed.to_string().normal()
            }
        );
    }

    if failed > 0 {
        anyhow::bail!("{} of {} programs failed", failed, entries.len());
    }
    Ok(())
}

/// Trace files on the rayon pool; results keep the input order
pub fn trace_all(tracer: &Tracer, files: &[String], progress: &ProgressBar) -> Vec<BatchEntry> {
    files
        .par_iter()
        .map(|file| {
            let entry = trace_file(tracer, file);
            progress.inc(1);
            entry
        })
        .collect()
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{bar:30.green} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar.set_message("tracing");
    bar
}

fn trace_file(tracer: &Tracer, file: &str) -> BatchEntry {
    let start = Instant::now();
    let outcome = match fs::read_to_string(file) {
        Ok(source) => match tracer.trace(&source) {
            Ok(frames) => match frames.last().and_then(|f| f.error.as_ref()) {
                Some(error) => Outcome::Failed {
                    frames: frames.len(),
                    message: error.message.clone(),
                },
                None => Outcome::Traced {
                    frames: frames.len(),
                },
            },
            Err(e) => Outcome::Rejected {
                message: e.to_string(),
            },
        },
        Err(e) => Outcome::Rejected {
            message: format!("Failed to read source file: {}", e),
        },
    };

    BatchEntry {
        file: file.to_string(),
        outcome,
        duration: start.elapsed(),
    }
}

fn entry_line(entry: &BatchEntry) -> String {
    match &entry.outcome {
        Outcome::Traced { frames } => format!(
            "{} {} ({} frames, {:.2?})",
            "OK  ".green().bold(),
            entry.file,
            frames,
            entry.duration
        ),
        Outcome::Failed { frames, message } => format!(
            "{} {} ({} frames): {}",
            "FAIL".red().bold(),
            entry.file,
            frames,
            message
        ),
        Outcome::Rejected { message } => {
            format!("{} {}: {}", "SKIP".yellow().bold(), entry.file, message)
        }
    }
}

fn to_json(entries: &[BatchEntry]) -> serde_json::Value {
    let files: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| match &entry.outcome {
            Outcome::Traced { frames } => json!({
                "file": entry.file,
                "status": "traced",
                "frames": frames,
            }),
            Outcome::Failed { frames, message } => json!({
                "file": entry.file,
                "status": "failed",
                "frames": frames,
                "error": message,
            }),
            Outcome::Rejected { message } => json!({
                "file": entry.file,
                "status": "rejected",
                "error": message,
            }),
        })
        .collect();
    json!({ "files": files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, source: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, source).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_outcomes_keep_input_order() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(dir.path(), "ok.js", "let x = 1;\nx = 2;"),
            write(dir.path(), "throws.js", "let x = 1;\nnull.y = x;"),
            write(dir.path(), "bad.js", "let = ;"),
            dir.path().join("missing.js").to_str().unwrap().to_string(),
        ];

        let entries = trace_all(&Tracer::new(), &files, &ProgressBar::hidden());
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].outcome, Outcome::Traced { frames: 2 });
        assert!(matches!(entries[1].outcome, Outcome::Failed { frames: 2, .. }));
        assert!(matches!(entries[2].outcome, Outcome::Rejected { .. }));
        match &entries[3].outcome {
            Outcome::Rejected { message } => {
                assert!(message.starts_with("Failed to read source file"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_run_fails_when_any_program_fails() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(dir.path(), "ok.js", "let x = 1;"),
            write(dir.path(), "loop.js", "while (true) {}"),
        ];
        let err = run(&Tracer::new(), &files, true).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 programs failed");
    }

    #[test]
    fn test_json_summary_shape() {
        let entries = vec![BatchEntry {
            file: "a.js".to_string(),
            outcome: Outcome::Traced { frames: 3 },
            duration: Duration::from_millis(1),
        }];
        let value = to_json(&entries);
        assert_eq!(value["files"][0]["status"], "traced");
        assert_eq!(value["files"][0]["frames"], 3);
    }
}
