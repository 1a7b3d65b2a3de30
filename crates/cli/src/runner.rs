//! Runs the user command when the debouncer fires

use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
    runs: AtomicU64,
}

impl CommandRunner {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            runs: AtomicU64::new(0),
        }
    }

    /// Run once and wait for exit
    pub fn run(&self) -> std::io::Result<ExitStatus> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        Command::new(&self.program).args(&self.args).status()
    }

    /// Run once, logging the outcome instead of returning it
    pub fn run_logged(&self) {
        let start = Instant::now();
        match self.run() {
            Ok(status) if status.success() => {
                info!("{} finished in {:?}", self.program, start.elapsed());
            }
            Ok(status) => {
                warn!("{} exited with {}", self.program, status);
            }
            Err(e) => {
                warn!("Failed to run {}: {}", self.program, e);
            }
        }
    }

    /// How many times the command has been started
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }
}
