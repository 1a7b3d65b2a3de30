//! Error types for debouncer operations

use thiserror::Error;

/// Errors produced by a debouncer or by loading its configuration
///
/// `trigger()` and `stop()` only ever return [`DebounceError::AlreadyStopped`].
/// The remaining variants come from the configuration layer.
#[derive(Debug, Error)]
pub enum DebounceError {
    /// The debouncer was stopped before this call
    #[error("debounce stopped")]
    AlreadyStopped,

    #[error("invalid debounce configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read debounce configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse debounce configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl DebounceError {
    /// Returns true for the stopped condition
    pub fn is_stopped(&self) -> bool {
        matches!(self, DebounceError::AlreadyStopped)
    }
}

/// Result type for debouncer operations
pub type Result<T> = std::result::Result<T, DebounceError>;
