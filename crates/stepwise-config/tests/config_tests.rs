//! Configuration loading and precedence tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use stepwise_config::{Config, ConfigError, ConfigLoader, SandboxConfig, PROJECT_CONFIG_FILE};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

struct Workspace {
    _root: TempDir,
    global: PathBuf,
    project: PathBuf,
}

fn workspace(global: Option<&str>, project: Option<&str>) -> Workspace {
    let root = TempDir::new().unwrap();
    let home = root.path().join("home");
    let project_dir = root.path().join("project");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&project_dir).unwrap();

    let global_path = home.join("config.toml");
    if let Some(content) = global {
        fs::write(&global_path, content).unwrap();
    }
    if let Some(content) = project {
        write(&project_dir, PROJECT_CONFIG_FILE, content);
    }

    Workspace {
        _root: root,
        global: global_path,
        project: project_dir,
    }
}

fn load(ws: &Workspace) -> Result<Config, ConfigError> {
    ConfigLoader::with_global_config_path(&ws.global).load_from_directory(&ws.project)
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
#[serial]
fn test_project_overrides_global() {
    let ws = workspace(
        Some(
            r#"
[sandbox]
step_budget = 10
max_events = 77
"#,
        ),
        Some(
            r#"
[sandbox]
step_budget = 20
"#,
        ),
    );

    let config = load(&ws).unwrap();
    assert_eq!(config.sandbox.step_budget, 20);
    assert_eq!(config.sandbox.max_events, 77);
}

#[test]
#[serial]
fn test_env_overrides_project() {
    let ws = workspace(
        None,
        Some(
            r#"
[sandbox]
time_budget_ms = 100
"#,
        ),
    );

    env::set_var("STEPWISE_TIME_BUDGET_MS", "900");
    let config = load(&ws);
    env::remove_var("STEPWISE_TIME_BUDGET_MS");

    assert_eq!(config.unwrap().sandbox.time_budget_ms, 900);
}

#[rstest]
#[case("STEPWISE_STEP_BUDGET", "12")]
#[case("STEPWISE_TIME_BUDGET_MS", "13")]
#[case("STEPWISE_MAX_CALL_DEPTH", "14")]
#[case("STEPWISE_MAX_EVENTS", "15")]
#[case("STEPWISE_SNAPSHOT_DEPTH", "16")]
#[serial]
fn test_each_env_override(#[case] var: &str, #[case] value: &str) {
    let ws = workspace(None, None);

    env::set_var(var, value);
    let config = load(&ws);
    env::remove_var(var);

    let config = config.unwrap();
    let observed = match var {
        "STEPWISE_STEP_BUDGET" => config.sandbox.step_budget,
        "STEPWISE_TIME_BUDGET_MS" => config.sandbox.time_budget_ms,
        "STEPWISE_MAX_CALL_DEPTH" => config.sandbox.max_call_depth as u64,
        "STEPWISE_MAX_EVENTS" => config.sandbox.max_events as u64,
        _ => config.snapshot.max_depth as u64,
    };
    assert_eq!(observed.to_string(), value);
}

#[test]
#[serial]
fn test_env_zero_is_rejected() {
    let ws = workspace(None, None);

    env::set_var("STEPWISE_MAX_CALL_DEPTH", "0");
    let result = load(&ws);
    env::remove_var("STEPWISE_MAX_CALL_DEPTH");

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
#[serial]
fn test_defaults_without_any_file() {
    let ws = workspace(None, None);
    let config = load(&ws).unwrap();
    assert_eq!(config.sandbox, SandboxConfig::default());
    assert!(!config.is_project());
}

#[test]
#[serial]
fn test_found_from_nested_directory() {
    let ws = workspace(
        None,
        Some(
            r#"
[sandbox]
stack_size_mb = 8
"#,
        ),
    );
    let nested = ws.project.join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let config = ConfigLoader::with_global_config_path(&ws.global)
        .load_from_directory(&nested)
        .unwrap();
    assert_eq!(config.sandbox.stack_size_mb, 8);
    assert_eq!(config.project_root(), Some(ws.project.as_path()));
}

#[test]
#[serial]
fn test_invalid_toml_reports_file() {
    let ws = workspace(None, Some("[sandbox\nstep_budget = 1"));
    match load(&ws) {
        Err(ConfigError::TomlParseError { file, .. }) => {
            assert!(file.ends_with(PROJECT_CONFIG_FILE));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_unknown_section_rejected() {
    let ws = workspace(None, Some("[compiler]\noptimize = true\n"));
    assert!(matches!(load(&ws), Err(ConfigError::TomlParseError { .. })));
}

#[test]
#[serial]
fn test_load_from_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "custom.toml", "[snapshot]\nmax_depth = 5\n");

    let config = ConfigLoader::with_global_config_path(dir.path().join("missing.toml"))
        .load_from_file(&path)
        .unwrap();
    assert_eq!(config.snapshot.max_depth, 5);
}

#[test]
#[serial]
fn test_missing_explicit_file() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::with_global_config_path(dir.path().join("missing.toml"))
        .load_from_file(&dir.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}
