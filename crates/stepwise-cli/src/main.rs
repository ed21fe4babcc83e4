use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

/// Step-by-step execution traces for small JavaScript programs.
///
/// Stepwise instruments a program, runs it in a resource-limited sandbox and
/// reduces what happened into numbered frames: calls, returns, variable
/// changes and console output, each with the full call stack.
///
/// EXAMPLES:
///     stepwise trace fib.js                Print the frames of a program
///     stepwise trace fib.js --json         Output frames as JSON
///     stepwise trace fib.js --instrumented Show the rewritten program
///     stepwise batch samples/*.js          Trace many programs in parallel
///     stepwise serve-stdin < request.json  Answer one JSON trace request
///     stepwise config                      Show the effective limits
///
/// ENVIRONMENT VARIABLES:
///     STEPWISE_JSON            Set to '1' for JSON output by default
///     STEPWISE_LOG             Log filter for stderr diagnostics (default: warn)
///     STEPWISE_STEP_BUDGET     Override the step budget
///     STEPWISE_TIME_BUDGET_MS  Override the wall-clock budget
///     NO_COLOR                 Set to disable colored output
#[derive(Parser)]
#[command(name = "stepwise")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    overrides: config::Overrides,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace a source file
    ///
    /// Instruments and runs the file, then prints one block per frame.
    /// A program that throws or runs out of budget ends with an error frame.
    ///
    /// EXAMPLES:
    ///     stepwise trace main.js                Human-readable frames
    ///     stepwise trace main.js --json         Frames as a JSON response
    ///     stepwise trace main.js --events       Raw recorded events
    ///     stepwise trace main.js --instrumented Rewritten source only
    #[command(visible_alias = "t")]
    Trace {
        /// Path to the source file
        file: String,
        /// Output frames in JSON format
        #[arg(long, env = "STEPWISE_JSON")]
        json: bool,
        /// Print every recorded event as one JSON line, before run selection
        #[arg(long)]
        events: bool,
        /// Print the instrumented program instead of running it
        #[arg(long)]
        instrumented: bool,
    },

    /// Answer one JSON trace request read from stdin
    ///
    /// Reads `{"code": "..."}` and writes `{"logs": [...]}` to stdout.
    /// Programs that cannot be traced produce a single error frame.
    ///
    /// EXAMPLES:
    ///     echo '{"code": "let x = 1;"}' | stepwise serve-stdin
    ServeStdin,

    /// Trace several files in parallel and summarize the results
    ///
    /// EXAMPLES:
    ///     stepwise batch a.js b.js c.js
    ///     stepwise batch samples/*.js --json
    #[command(visible_alias = "b")]
    Batch {
        /// Source files to trace
        #[arg(required = true)]
        files: Vec<String>,
        /// Output the summary in JSON format
        #[arg(long, env = "STEPWISE_JSON")]
        json: bool,
    },

    /// Print the effective configuration as TOML
    ///
    /// Shows global, project, environment and flag settings merged together.
    Config,

    /// Generate shell completion scripts
    ///
    /// EXAMPLES:
    ///     stepwise completions bash > ~/.bash_completions/stepwise.bash
    ///     stepwise completions zsh > ~/.zfunc/_stepwise
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("STEPWISE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let config = config::load(&cli.overrides)?;
    let tracer = stepwise_runtime::Tracer::from_config(&config);

    match cli.command {
        Commands::Trace {
            file,
            json,
            events,
            instrumented,
        } => {
            let mode = if instrumented {
                commands::trace::OutputMode::Instrumented
            } else if events {
                commands::trace::OutputMode::Events
            } else if json {
                commands::trace::OutputMode::Json
            } else {
                commands::trace::OutputMode::Human
            };
            commands::trace::run(&tracer, &file, mode)?;
        }
        Commands::ServeStdin => {
            commands::serve::run(&tracer)?;
        }
        Commands::Batch { files, json } => {
            commands::batch::run(&tracer, &files, json)?;
        }
        Commands::Config => {
            commands::config::run(&config)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_alias_t_for_trace() {
        let cli = Cli::parse_from(["stepwise", "t", "main.js"]);
        assert!(matches!(cli.command, Commands::Trace { .. }));
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::parse_from(["stepwise", "trace", "main.js", "--step-budget", "10"]);
        assert_eq!(cli.overrides.step_budget, Some(10));
    }

    #[test]
    fn test_batch_collects_files() {
        let cli = Cli::parse_from(["stepwise", "batch", "a.js", "b.js"]);
        match cli.command {
            Commands::Batch { files, .. } => assert_eq!(files, vec!["a.js", "b.js"]),
            _ => panic!("expected batch"),
        }
    }
}
