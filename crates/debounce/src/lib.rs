//! Debounce primitive
//!
//! Runs a callback once, a fixed delay after the last of a burst of
//! triggers. This crate provides:
//! - [`Debouncer`]: timer and dispatch loops on dedicated threads, talking
//!   over rendezvous channels
//! - [`task::AsyncDebouncer`]: the same state machine on tokio tasks
//! - [`DebounceConfig`]: TOML-loadable settings

pub mod config;
pub mod debouncer;
pub mod error;
pub mod state;
pub mod task;

mod dispatch;
mod timer;

use std::sync::Arc;

// Re-exports
pub use config::DebounceConfig;
pub use debouncer::Debouncer;
pub use error::{DebounceError, Result};
pub use state::LifecycleState;
pub use task::AsyncDebouncer;

/// Handle operations shared by debouncer implementations
pub trait Debounce: Send + Sync {
    /// Start (or restart) the quiescence window
    ///
    /// Returns [`DebounceError::AlreadyStopped`] once the debouncer is stopped.
    fn trigger(&self) -> Result<()>;

    /// Stop both background loops. Stopping twice returns
    /// [`DebounceError::AlreadyStopped`].
    fn stop(&self) -> Result<()>;

    /// Non-blocking stopped check
    fn is_stopped(&self) -> bool;
}

impl<D: Debounce + ?Sized> Debounce for Arc<D> {
    fn trigger(&self) -> Result<()> {
        (**self).trigger()
    }

    fn stop(&self) -> Result<()> {
        (**self).stop()
    }

    fn is_stopped(&self) -> bool {
        (**self).is_stopped()
    }
}

impl<D: Debounce + ?Sized> Debounce for Box<D> {
    fn trigger(&self) -> Result<()> {
        (**self).trigger()
    }

    fn stop(&self) -> Result<()> {
        (**self).stop()
    }

    fn is_stopped(&self) -> bool {
        (**self).is_stopped()
    }
}
