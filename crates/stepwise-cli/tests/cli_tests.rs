//! End-to-end tests for the stepwise binary
//!
//! Covers help output, every subcommand, flag and environment overrides and
//! exit codes.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn stepwise_cmd() -> Command {
    let mut cmd = Command::cargo_bin("stepwise").unwrap();
    cmd.env_remove("STEPWISE_JSON")
        .env_remove("STEPWISE_STEP_BUDGET")
        .env_remove("STEPWISE_TIME_BUDGET_MS")
        .env_remove("STEPWISE_MAX_CALL_DEPTH")
        .env_remove("STEPWISE_MAX_EVENTS")
        .env_remove("STEPWISE_SNAPSHOT_DEPTH")
        .env("NO_COLOR", "1");
    cmd
}

fn write_source(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).unwrap();
    path
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP MESSAGE TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod help_messages {
    use super::*;

    #[test]
    fn test_main_help_shows_all_commands() {
        stepwise_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("trace"))
            .stdout(predicate::str::contains("serve-stdin"))
            .stdout(predicate::str::contains("batch"))
            .stdout(predicate::str::contains("config"));
    }

    #[test]
    fn test_main_help_shows_environment_variables() {
        stepwise_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ENVIRONMENT VARIABLES"))
            .stdout(predicate::str::contains("STEPWISE_LOG"));
    }

    #[test]
    fn test_completions_bash() {
        stepwise_cmd()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("stepwise"));
    }

    #[test]
    fn test_trace_help_shows_examples() {
        stepwise_cmd()
            .args(["trace", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("EXAMPLES"))
            .stdout(predicate::str::contains("--instrumented"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TRACE COMMAND TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod trace_command {
    use super::*;

    #[test]
    fn test_trace_prints_frames() {
        let dir = TempDir::new().unwrap();
        let file = write_source(
            dir.path(),
            "add.js",
            "function add(a, b) { return a + b; }\nadd(2, 3);\n",
        );
        stepwise_cmd()
            .arg("trace")
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("call add"))
            .stdout(predicate::str::contains("return add"))
            .stdout(predicate::str::contains("2 frames"));
    }

    #[test]
    fn test_trace_alias() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "x.js", "let x = 1;");
        stepwise_cmd()
            .arg("t")
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("declare x"));
    }

    #[test]
    fn test_trace_json_is_a_response() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "log.js", r#"console.log("a", "b");"#);
        let output = stepwise_cmd()
            .args(["trace", "--json"])
            .arg(&file)
            .output()
            .unwrap();
        assert!(output.status.success());

        let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let logs = response["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["action"], "stdout");
        assert_eq!(logs[0]["stdout"][0], "a b");
    }

    #[test]
    fn test_trace_json_from_environment() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "x.js", "let x = 1;");
        stepwise_cmd()
            .env("STEPWISE_JSON", "1")
            .arg("trace")
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"logs\""));
    }

    #[test]
    fn test_trace_instrumented_shows_probes() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "x.js", "let x = 1;");
        stepwise_cmd()
            .args(["trace", "--instrumented"])
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("__record"))
            .stdout(predicate::str::contains("let x = 1;"));
    }

    #[test]
    fn test_trace_events_are_json_lines() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "calls.js", "function f() {}\nf();\nf();\n");
        let output = stepwise_cmd()
            .args(["trace", "--events"])
            .arg(&file)
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8(output.stdout).unwrap();
        let kinds: Vec<String> = stdout
            .lines()
            .map(|line| {
                let event: serde_json::Value = serde_json::from_str(line).unwrap();
                event["kind"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(kinds, vec!["call", "return", "call", "return"]);
    }

    #[test]
    fn test_trace_runtime_error_exits_nonzero() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "throw.js", "throw new Error(\"boom\");");
        stepwise_cmd()
            .arg("trace")
            .arg(&file)
            .assert()
            .failure()
            .stdout(predicate::str::contains("error (execution)"))
            .stderr(predicate::str::contains("boom"));
    }

    #[test]
    fn test_trace_syntax_error_shows_diagnostic() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "bad.js", "let = ;");
        stepwise_cmd()
            .arg("trace")
            .arg(&file)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Errors occurred while tracing"))
            .stderr(predicate::str::contains("--> line 1"));
    }

    #[test]
    fn test_trace_missing_file() {
        stepwise_cmd()
            .args(["trace", "does-not-exist.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read source file"));
    }

    #[test]
    fn test_step_budget_flag_times_out() {
        let dir = TempDir::new().unwrap();
        let file = write_source(
            dir.path(),
            "count.js",
            "let n = 0;\nfor (let i = 0; i < 1000; i++) { n = n + i; }\n",
        );
        let output = stepwise_cmd()
            .args(["trace", "--json", "--step-budget", "50"])
            .arg(&file)
            .output()
            .unwrap();
        assert!(output.status.success());

        let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let logs = response["logs"].as_array().unwrap();
        let last = logs.last().unwrap();
        assert_eq!(last["error"]["kind"], "timeout");
        assert!(last["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Program did not finish"));
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        stepwise_cmd()
            .args(["trace", "x.js", "--step-budget", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--step-budget"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// SERVE-STDIN TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod serve_stdin {
    use super::*;

    #[test]
    fn test_request_response() {
        let output = assert_cmd::Command::from_std(stepwise_cmd())
            .arg("serve-stdin")
            .write_stdin(r#"{"code": "let x = 1;\nx = 2;"}"#)
            .output()
            .unwrap();
        assert!(output.status.success());

        let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let logs = response["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1]["action"], "assign x");
        assert_eq!(logs[1]["globals"]["x"]["value"], 2.0);
    }

    #[test]
    fn test_malformed_request() {
        assert_cmd::Command::from_std(stepwise_cmd())
            .arg("serve-stdin")
            .write_stdin("{")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse trace request"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// BATCH AND CONFIG TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod batch_and_config {
    use super::*;

    #[test]
    fn test_batch_summary() {
        let dir = TempDir::new().unwrap();
        let a = write_source(dir.path(), "a.js", "let a = 1;");
        let b = write_source(dir.path(), "b.js", "let b = 2;");
        stepwise_cmd()
            .arg("batch")
            .arg(&a)
            .arg(&b)
            .assert()
            .success()
            .stdout(predicate::str::contains("2 traced, 0 failed"));
    }

    #[test]
    fn test_batch_failure_exit_code() {
        let dir = TempDir::new().unwrap();
        let a = write_source(dir.path(), "a.js", "let a = 1;");
        let bad = write_source(dir.path(), "bad.js", "let __t0 = 1;");
        stepwise_cmd()
            .arg("batch")
            .arg(&a)
            .arg(&bad)
            .assert()
            .failure()
            .stdout(predicate::str::contains("SKIP"))
            .stderr(predicate::str::contains("1 of 2 programs failed"));
    }

    #[test]
    fn test_batch_requires_files() {
        stepwise_cmd().arg("batch").assert().failure();
    }

    #[test]
    fn test_config_reads_project_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("stepwise.toml"),
            "[sandbox]\nstep_budget = 1234\n",
        )
        .unwrap();
        stepwise_cmd()
            .current_dir(dir.path())
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("# project:"))
            .stdout(predicate::str::contains("step_budget = 1234"));
    }

    #[test]
    fn test_config_flag_beats_environment() {
        let dir = TempDir::new().unwrap();
        stepwise_cmd()
            .current_dir(dir.path())
            .env("STEPWISE_MAX_EVENTS", "10")
            .args(["config", "--max-events", "20"])
            .assert()
            .success()
            .stdout(predicate::str::contains("max_events = 20"));
    }

    #[test]
    fn test_invalid_project_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stepwise.toml"), "[sandbox\n").unwrap();
        stepwise_cmd()
            .current_dir(dir.path())
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load configuration"));
    }
}
