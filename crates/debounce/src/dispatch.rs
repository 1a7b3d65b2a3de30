//! Dispatch loop: runs the callback for each fire, one at a time

use crate::state::Shared;
use crossbeam_channel::{select, Receiver};
use parking_lot::ReentrantMutex;
use std::sync::Arc;
use tracing::debug;

/// Held while a callback runs. `stop()` takes it after flipping the stopped
/// flag, so no callback starts once `stop()` has returned. Reentrant so a
/// callback may stop its own debouncer.
pub(crate) type DispatchGate = Arc<ReentrantMutex<()>>;

pub(crate) struct DispatchLoop<F> {
    shared: Arc<Shared>,
    gate: DispatchGate,
    fire_rx: Receiver<()>,
    /// Never carries a message; disconnects when the handle is stopped
    done_rx: Receiver<()>,
    callback: F,
}

impl<F> DispatchLoop<F>
where
    F: FnMut() + Send + 'static,
{
    pub(crate) fn new(
        shared: Arc<Shared>,
        gate: DispatchGate,
        fire_rx: Receiver<()>,
        done_rx: Receiver<()>,
        callback: F,
    ) -> Self {
        Self {
            shared,
            gate,
            fire_rx,
            done_rx,
            callback,
        }
    }

    pub(crate) fn run(mut self) {
        loop {
            select! {
                recv(self.fire_rx) -> msg => {
                    if msg.is_err() {
                        break;
                    }
                    let _guard = self.gate.lock();
                    if self.shared.is_stopped() {
                        break;
                    }
                    let n = self.shared.record_fire();
                    debug!("dispatching callback (fire #{})", n);
                    (self.callback)();
                }
                recv(self.done_rx) -> _ => break,
            }
        }

        debug!("dispatch loop exited");
    }
}
