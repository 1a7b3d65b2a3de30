//! Timer loop: the debounce state machine
//!
//! ```text
//! Fresh            --trigger-->        Armed
//! Armed            --trigger-->        Armed (deadline reset)
//! Armed            --delay elapses-->  send fire, FiredAndWaiting
//! FiredAndWaiting  --trigger-->        Armed (fresh deadline)
//! fire pending     --trigger-->        fire delivered, then Armed
//! (any)            --stop-->           exit
//! ```
//!
//! All three inputs are capacity-zero channels, so a trigger or stop sender
//! is released only once this loop has taken the signal.

use crate::state::{LifecycleState, Shared};
use crossbeam_channel::{at, select, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

pub(crate) struct TimerLoop {
    shared: Arc<Shared>,
    trigger_rx: Receiver<()>,
    fire_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl TimerLoop {
    pub(crate) fn new(
        shared: Arc<Shared>,
        trigger_rx: Receiver<()>,
        fire_tx: Sender<()>,
        done_rx: Receiver<()>,
    ) -> Self {
        Self {
            shared,
            trigger_rx,
            fire_tx,
            done_rx,
        }
    }

    /// Run until stopped. Consumes the loop; its channel ends drop on return.
    pub(crate) fn run(self) {
        debug!("timer loop started (delay: {:?})", self.shared.delay);
        let mut deadline = self.arm();

        loop {
            // `None` means exit
            let next = select! {
                recv(self.trigger_rx) -> msg => match msg {
                    Ok(()) => {
                        trace!("deadline reset");
                        Some(self.arm())
                    }
                    Err(_) => None,
                },
                recv(self.done_rx) -> _ => None,
                recv(at(deadline)) -> _ => self.fire(),
            };

            match next {
                Some(next_deadline) => deadline = next_deadline,
                None => break,
            }
        }

        debug!("timer loop exited");
    }

    /// Enter `Armed` and return the new deadline
    fn arm(&self) -> Instant {
        self.shared.set_state(LifecycleState::Armed);
        Instant::now() + self.shared.delay
    }

    /// Hand a fire to the dispatch loop, then block until the next trigger.
    /// Returns the re-armed deadline, or `None` to exit.
    ///
    /// The hand-off blocks while the dispatch loop is still running the
    /// previous callback. Triggers arriving meanwhile are taken (so their
    /// senders never wait on the callback) and the loop re-arms as soon as
    /// the fire is accepted.
    fn fire(&self) -> Option<Instant> {
        let mut rearm = false;

        loop {
            select! {
                send(self.fire_tx, ()) -> res => {
                    if res.is_err() {
                        debug!("dispatch loop gone, timer loop exiting");
                        return None;
                    }
                    break;
                }
                recv(self.trigger_rx) -> msg => {
                    if msg.is_err() {
                        return None;
                    }
                    trace!("trigger arrived while fire pending");
                    rearm = true;
                }
                recv(self.done_rx) -> _ => return None,
            }
        }
        self.shared.record_handoff();

        if rearm {
            debug!("fired; re-armed by trigger during hand-off");
            return Some(self.arm());
        }

        debug!("fired; waiting for next trigger");
        self.shared.set_state(LifecycleState::FiredAndWaiting);

        select! {
            recv(self.trigger_rx) -> msg => match msg {
                Ok(()) => {
                    debug!("re-armed");
                    Some(self.arm())
                }
                Err(_) => None,
            },
            recv(self.done_rx) -> _ => None,
        }
    }
}
