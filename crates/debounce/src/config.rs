//! Debouncer configuration
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! delay_ms = 300
//! thread_name = "rebuild"
//! ```

use crate::error::{DebounceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default quiescence window (500ms)
pub const DEFAULT_DELAY_MS: u64 = 500;

/// Upper bound accepted by [`DebounceConfig::validate`] (one hour)
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Default prefix for background thread names
pub const DEFAULT_THREAD_NAME: &str = "debounce";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiescence window in milliseconds
    pub delay_ms: u64,

    /// Prefix for the timer/dispatch thread names
    pub thread_name: String,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl DebounceConfig {
    /// Config with the given delay, rounded down to whole milliseconds
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay_ms: delay.as_millis() as u64,
            ..Self::default()
        }
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.delay_ms == 0 || self.delay_ms > MAX_DELAY_MS {
            return Err(DebounceError::InvalidConfig(format!(
                "delay_ms must be between 1 and {} (got {})",
                MAX_DELAY_MS, self.delay_ms
            )));
        }

        if self.thread_name.trim().is_empty() {
            return Err(DebounceError::InvalidConfig(
                "thread_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = DebounceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.delay(), Duration::from_millis(500));
        assert_eq!(config.thread_name, "debounce");
    }

    #[test]
    fn test_with_delay_rounds_to_millis() {
        let config = DebounceConfig::with_delay(Duration::from_micros(2_500));
        assert_eq!(config.delay_ms, 2);
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DebounceConfig::from_toml_str("delay_ms = 250").unwrap();
        assert_eq!(config.delay_ms, 250);
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn test_rejects_zero_delay() {
        let err = DebounceConfig::from_toml_str("delay_ms = 0").unwrap_err();
        assert!(matches!(err, DebounceError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_oversized_delay() {
        let config = DebounceConfig {
            delay_ms: MAX_DELAY_MS + 1,
            ..DebounceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_thread_name() {
        let err = DebounceConfig::from_toml_str("thread_name = \"  \"").unwrap_err();
        assert!(matches!(err, DebounceError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = DebounceConfig::from_toml_str("delay_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, DebounceError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "delay_ms = 42").unwrap();
        writeln!(file, "thread_name = \"rebuild\"").unwrap();

        let config = DebounceConfig::load(file.path()).unwrap();
        assert_eq!(config.delay_ms, 42);
        assert_eq!(config.thread_name, "rebuild");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DebounceConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, DebounceError::Io(_)));
    }
}
