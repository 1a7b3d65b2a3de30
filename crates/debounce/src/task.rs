//! Async debouncer on tokio tasks
//!
//! Same lifecycle states and error contract as [`crate::Debouncer`], with the
//! timer and dispatch loops running as tokio tasks. Must be created inside a
//! tokio runtime.
//!
//! tokio has no zero-capacity channel, so both channels hold one message and
//! the hand-offs are not rendezvous:
//!
//! - `trigger().await` returns once the reset is queued, which can be before
//!   the timer task has taken it and moved the deadline.
//! - A fire is handed off once it sits in the buffer. The timer task moves on
//!   (to `FiredAndWaiting`, or straight back to `Armed`) while the dispatch
//!   task may still be busy with the previous callback, so at most one fire
//!   can queue behind a running callback.
//!
//! As with the threaded debouncer, a trigger that arrives while a fire is
//! blocked on a full buffer does not drop that fire: it is delivered, and the
//! timer then re-arms for the new trigger.

use crate::error::{DebounceError, Result};
use crate::state::{LifecycleState, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

struct AsyncTimer {
    shared: Arc<Shared>,
    trigger_rx: mpsc::Receiver<()>,
    fire_tx: mpsc::Sender<()>,
    done_rx: oneshot::Receiver<()>,
}

impl AsyncTimer {
    async fn run(mut self) {
        debug!("async timer task started (delay: {:?})", self.shared.delay);
        let mut deadline = self.arm();

        loop {
            tokio::select! {
                msg = self.trigger_rx.recv() => match msg {
                    Some(()) => {
                        trace!("deadline reset");
                        deadline = self.arm();
                    }
                    None => break,
                },
                _ = &mut self.done_rx => break,
                _ = sleep_until(deadline) => match self.fire().await {
                    Some(next) => deadline = next,
                    None => break,
                },
            }
        }

        debug!("async timer task exited");
    }

    /// Queue one fire, then wait for the trigger that re-arms.
    ///
    /// Returns the next deadline, or `None` when the task should exit.
    async fn fire(&mut self) -> Option<Instant> {
        let mut rearm = false;
        loop {
            tokio::select! {
                res = self.fire_tx.send(()) => {
                    if res.is_err() {
                        debug!("dispatch task gone; timer exiting");
                        return None;
                    }
                    break;
                }
                msg = self.trigger_rx.recv() => match msg {
                    Some(()) => {
                        trace!("trigger arrived while fire pending");
                        rearm = true;
                    }
                    None => return None,
                },
                _ = &mut self.done_rx => return None,
            }
        }
        self.shared.record_handoff();

        if rearm {
            debug!("fired; re-armed by trigger during hand-off");
            return Some(self.arm());
        }

        debug!("fired; waiting for next trigger");
        self.shared.set_state(LifecycleState::FiredAndWaiting);

        tokio::select! {
            msg = self.trigger_rx.recv() => msg.map(|()| self.arm()),
            _ = &mut self.done_rx => None,
        }
    }

    fn arm(&self) -> Instant {
        self.shared.set_state(LifecycleState::Armed);
        Instant::now() + self.shared.delay
    }
}

struct AsyncControl {
    trigger_tx: mpsc::Sender<()>,
    done_tx: Option<oneshot::Sender<()>>,
    pending: Option<AsyncTimer>,
    timer: Option<JoinHandle<()>>,
}

/// Tokio flavour of [`crate::Debouncer`]
pub struct AsyncDebouncer {
    shared: Arc<Shared>,
    /// Held by the dispatch task around each callback
    gate: Arc<Mutex<()>>,
    control: Mutex<Option<AsyncControl>>,
}

impl AsyncDebouncer {
    /// Create a debouncer and spawn its dispatch task
    ///
    /// A zero delay is raised to one millisecond.
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let delay = if delay.is_zero() {
            Duration::from_millis(1)
        } else {
            delay
        };

        let shared = Arc::new(Shared::new(delay));
        let gate = Arc::new(Mutex::new(()));

        // tokio has no rendezvous channel; capacity one is the closest.
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (fire_tx, fire_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(dispatch(shared.clone(), gate.clone(), fire_rx, callback));

        let pending = AsyncTimer {
            shared: shared.clone(),
            trigger_rx,
            fire_tx,
            done_rx,
        };

        Self {
            shared,
            gate,
            control: Mutex::new(Some(AsyncControl {
                trigger_tx,
                done_tx: Some(done_tx),
                pending: Some(pending),
                timer: None,
            })),
        }
    }

    pub async fn trigger(&self) -> Result<()> {
        let mut guard = self.control.lock().await;
        let control = guard.as_mut().ok_or(DebounceError::AlreadyStopped)?;

        if let Some(timer) = control.pending.take() {
            control.timer = Some(tokio::spawn(timer.run()));
        }

        control
            .trigger_tx
            .send(())
            .await
            .map_err(|_| DebounceError::AlreadyStopped)
    }

    pub async fn stop(&self) -> Result<()> {
        let mut control = {
            let mut guard = self.control.lock().await;
            let control = guard.take().ok_or(DebounceError::AlreadyStopped)?;
            self.shared.mark_stopped();
            control
        };

        if let Some(done_tx) = control.done_tx.take() {
            let _ = done_tx.send(());
        }
        if let Some(handle) = control.timer.take() {
            let _ = handle.await;
        }
        drop(control);

        drop(self.gate.lock().await);

        debug!("async debouncer stopped");
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    pub fn fire_count(&self) -> u64 {
        self.shared.fire_count()
    }

    /// True when no countdown is running and every queued fire has started
    /// its callback. See [`crate::Debouncer::is_idle`].
    pub fn is_idle(&self) -> bool {
        self.shared.is_idle()
    }
}

impl Drop for AsyncDebouncer {
    fn drop(&mut self) {
        // Dropping the control drops the done sender and trigger sender,
        // both of which end the timer task.
        self.shared.mark_stopped();
        if let Ok(mut guard) = self.control.try_lock() {
            guard.take();
        }
    }
}

async fn dispatch<F>(
    shared: Arc<Shared>,
    gate: Arc<Mutex<()>>,
    mut fire_rx: mpsc::Receiver<()>,
    mut callback: F,
) where
    F: FnMut() + Send + 'static,
{
    while fire_rx.recv().await.is_some() {
        let _guard = gate.lock().await;
        if shared.is_stopped() {
            break;
        }
        let n = shared.record_fire();
        debug!("dispatching callback (fire #{})", n);
        callback();
    }

    debug!("async dispatch task exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(delay: Duration) -> (AsyncDebouncer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let debouncer = AsyncDebouncer::new(delay, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (debouncer, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_fire_per_burst() {
        let (debouncer, count) = counting(Duration::from_millis(500));

        for _ in 0..3 {
            debouncer.trigger().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.state(), LifecycleState::FiredAndWaiting);

        debouncer.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_burst_fires_again() {
        let (debouncer, count) = counting(Duration::from_millis(100));

        debouncer.trigger().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        debouncer.trigger().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(debouncer.fire_count(), 2);

        debouncer.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_fires_without_trigger() {
        let (debouncer, count) = counting(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.state(), LifecycleState::Fresh);
        debouncer.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_terminal() {
        let (debouncer, count) = counting(Duration::from_millis(50));

        debouncer.trigger().await.unwrap();
        debouncer.stop().await.unwrap();
        assert!(debouncer.is_stopped());

        assert!(debouncer.trigger().await.unwrap_err().is_stopped());
        assert!(debouncer.stop().await.unwrap_err().is_stopped());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_while_fire_queued_behind_busy_dispatch() {
        let shared = Arc::new(Shared::new(Duration::from_millis(100)));
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        // Held undrained to stand in for a dispatch task stuck in a callback
        let (fire_tx, mut fire_rx) = mpsc::channel(1);
        let (_done_tx, done_rx) = oneshot::channel();

        let timer = AsyncTimer {
            shared: shared.clone(),
            trigger_rx,
            fire_tx,
            done_rx,
        };
        tokio::spawn(timer.run());

        // First fire sits in the buffer
        trigger_tx.send(()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(shared.state(), LifecycleState::FiredAndWaiting);

        // Second fire blocks on the full buffer
        trigger_tx.send(()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(shared.state(), LifecycleState::Armed);

        // A trigger now must not discard the blocked fire
        trigger_tx.send(()).await.unwrap();

        let wait = Duration::from_secs(1);
        for _ in 0..3 {
            tokio::time::timeout(wait, fire_rx.recv())
                .await
                .expect("fire not delivered")
                .unwrap();
        }
        assert_eq!(shared.handoff_count(), 3);

        assert!(tokio::time::timeout(wait, fire_rx.recv()).await.is_err());
        assert_eq!(shared.state(), LifecycleState::FiredAndWaiting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_once_fire_dispatched() {
        let (debouncer, count) = counting(Duration::from_millis(50));
        assert!(debouncer.is_idle());

        debouncer.trigger().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!debouncer.is_idle());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(debouncer.is_idle());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        debouncer.stop().await.unwrap();
    }
}
