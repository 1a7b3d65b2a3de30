//! Lifecycle bookkeeping shared between a handle and its background loops
//!
//! Everything here is atomic so `is_stopped()`, `state()`, `is_idle()` and
//! `fire_count()` never block on the loops.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

/// Where a debouncer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, never triggered; timer loop not started
    Fresh,
    /// Timer loop counting down towards a fire
    Armed,
    /// Fire dispatched; timer loop waits for the next trigger to re-arm
    FiredAndWaiting,
    /// Terminal
    Stopped,
}

impl LifecycleState {
    fn to_u8(self) -> u8 {
        match self {
            LifecycleState::Fresh => 0,
            LifecycleState::Armed => 1,
            LifecycleState::FiredAndWaiting => 2,
            LifecycleState::Stopped => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LifecycleState::Fresh,
            1 => LifecycleState::Armed,
            2 => LifecycleState::FiredAndWaiting,
            _ => LifecycleState::Stopped,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) delay: Duration,
    stopped: AtomicBool,
    state: AtomicU8,
    /// Fires accepted by the dispatch loop
    handoffs: AtomicU64,
    /// Fires whose callback was started
    fires: AtomicU64,
}

impl Shared {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            stopped: AtomicBool::new(false),
            state: AtomicU8::new(LifecycleState::Fresh.to_u8()),
            handoffs: AtomicU64::new(0),
            fires: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Flip to stopped. Returns false if already stopped.
    pub(crate) fn mark_stopped(&self) -> bool {
        let first = self
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.state
            .store(LifecycleState::Stopped.to_u8(), Ordering::Release);
        first
    }

    pub(crate) fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Record a loop transition. Never moves out of `Stopped`.
    pub(crate) fn set_state(&self, next: LifecycleState) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current == LifecycleState::Stopped.to_u8() {
                    None
                } else {
                    Some(next.to_u8())
                }
            });
    }

    pub(crate) fn record_fire(&self) -> u64 {
        self.fires.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::Acquire)
    }

    /// Called by the timer loop once the dispatch loop accepted a fire,
    /// before it leaves `Armed`.
    pub(crate) fn record_handoff(&self) {
        self.handoffs.fetch_add(1, Ordering::AcqRel);
    }

    #[cfg(test)]
    pub(crate) fn handoff_count(&self) -> u64 {
        self.handoffs.load(Ordering::Acquire)
    }

    /// No countdown running and every accepted fire has started its callback.
    ///
    /// The timer loop stays `Armed` until the hand-off is recorded, so there
    /// is no window where a fire is in flight but neither check sees it.
    pub(crate) fn is_idle(&self) -> bool {
        if self.state() == LifecycleState::Armed {
            return false;
        }
        self.handoffs.load(Ordering::Acquire) <= self.fires.load(Ordering::Acquire)
    }
}
