//! debounce CLI
//!
//! Each line read from stdin is a trigger. The command runs once the input
//! has been quiet for the configured delay:
//!
//! ```text
//! inotifywait -m -r src | debounce --delay-ms 300 -- cargo build
//! ```

pub mod runner;
pub mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use debounce::{Debounce, Debouncer};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub use runner::CommandRunner;
pub use settings::{FileConfig, Settings};

/// Run a command once stdin goes quiet
#[derive(Parser, Debug)]
#[command(name = "debounce")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Quiet period in milliseconds (default: 500, or the config file value)
    #[arg(short, long)]
    pub delay_ms: Option<u64>,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run the command once at startup, before any input
    #[arg(long)]
    pub leading_run: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run, after `--`
    #[arg(last = true)]
    pub command: Vec<String>,
}

/// Install the fmt subscriber on stderr
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve settings from the parsed command line
pub fn settings_from_cli(cli: &Cli) -> Result<Settings> {
    let file = cli
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    Settings::resolve(file, cli.delay_ms, &cli.command)
}

/// Trigger once per input line until EOF, then let a pending run finish.
///
/// Returns how many times the command ran.
pub fn drive<R: BufRead>(settings: &Settings, leading_run: bool, input: R) -> Result<u64> {
    let runner = Arc::new(CommandRunner::new(
        settings.program.clone(),
        settings.args.clone(),
    ));

    if leading_run {
        runner.run_logged();
    }

    let callback_runner = runner.clone();
    let debouncer = Debouncer::with_config(&settings.debounce, move || {
        callback_runner.run_logged();
    })
    .context("Failed to create debouncer")?;

    info!(
        "Waiting for input (delay: {:?}, command: {})",
        debouncer.delay(),
        settings.program
    );

    for line in input.lines() {
        let line = line.context("Failed to read input")?;
        debug!("trigger: {}", line);
        debouncer.trigger()?;
    }

    debug!("input closed");
    wait_for_quiet(&debouncer);
    debouncer.stop()?;

    Ok(runner.runs())
}

/// Block until no countdown is running and every fire has started its
/// command, so the following `stop()` cannot cancel the last run.
fn wait_for_quiet(debouncer: &Debouncer) {
    let poll = (debouncer.delay() / 4).clamp(Duration::from_millis(1), Duration::from_millis(50));
    while !debouncer.is_idle() {
        std::thread::sleep(poll);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn settings(delay_ms: u64) -> Settings {
        Settings::resolve(None, Some(delay_ms), &["true".to_string()]).unwrap()
    }

    #[test]
    fn test_burst_of_lines_runs_once() {
        let input = Cursor::new("a\nb\nc\nd\n");
        let runs = drive(&settings(20), false, input).unwrap();
        assert_eq!(runs, 1);
    }

    #[test]
    fn test_leading_run_adds_one() {
        let input = Cursor::new("a\nb\n");
        let runs = drive(&settings(20), true, input).unwrap();
        assert_eq!(runs, 2);
    }

    #[test]
    fn test_slow_command_after_eof_still_runs() {
        let settings = Settings::resolve(
            None,
            Some(5),
            &["sleep".to_string(), "0.2".to_string()],
        )
        .unwrap();
        let runs = drive(&settings, false, Cursor::new("a\nb\n")).unwrap();
        assert_eq!(runs, 1);
    }

    #[test]
    fn test_drain_repeatedly_keeps_final_run() {
        for _ in 0..10 {
            let runs = drive(&settings(1), false, Cursor::new("x\ny\nz\n")).unwrap();
            assert_eq!(runs, 1);
        }
    }

    #[test]
    fn test_empty_input_never_runs() {
        let runs = drive(&settings(20), false, Cursor::new("")).unwrap();
        assert_eq!(runs, 0);
    }

    #[test]
    fn test_cli_parses_trailing_command() {
        let cli = Cli::parse_from(["debounce", "-d", "100", "--", "cargo", "build", "--release"]);
        assert_eq!(cli.delay_ms, Some(100));
        assert_eq!(cli.command, vec!["cargo", "build", "--release"]);

        let settings = settings_from_cli(&cli).unwrap();
        assert_eq!(settings.program, "cargo");
        assert_eq!(settings.args, vec!["build", "--release"]);
    }
}
