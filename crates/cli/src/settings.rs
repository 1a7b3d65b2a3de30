//! Settings resolution: config file first, then command-line overrides
//!
//! Config file layout:
//!
//! ```toml
//! command = ["cargo", "build"]
//!
//! [debounce]
//! delay_ms = 300
//! thread_name = "rebuild"
//! ```

use anyhow::{Context, Result};
use debounce::DebounceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Command to run on each fire (program followed by its arguments)
    pub command: Vec<String>,

    pub debounce: DebounceConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Fully resolved run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub debounce: DebounceConfig,
    pub program: String,
    pub args: Vec<String>,
}

impl Settings {
    /// Merge an optional file config with flag overrides
    ///
    /// A non-empty `command` on the command line replaces the file's command.
    pub fn resolve(
        file: Option<FileConfig>,
        delay_ms: Option<u64>,
        command: &[String],
    ) -> Result<Self> {
        let file = file.unwrap_or_default();

        let mut debounce = file.debounce;
        if let Some(delay_ms) = delay_ms {
            debounce.delay_ms = delay_ms;
        }
        debounce.validate().context("Invalid debounce settings")?;

        let command = if command.is_empty() {
            file.command
        } else {
            command.to_vec()
        };

        let (program, args) = command
            .split_first()
            .context("No command given (pass it after `--` or set `command` in the config file)")?;

        Ok(Self {
            debounce,
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}
