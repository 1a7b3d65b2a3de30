//! Thread-backed debouncer handle
//!
//! The dispatch thread starts at construction. The timer thread starts on
//! the first `trigger()`.

use crate::config::DebounceConfig;
use crate::dispatch::{DispatchGate, DispatchLoop};
use crate::error::{DebounceError, Result};
use crate::state::{LifecycleState, Shared};
use crate::timer::TimerLoop;
use crate::Debounce;
use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Channel ends owned by a live handle. Dropping this tears everything down.
struct Control {
    trigger_tx: Sender<()>,
    timer_done_tx: Sender<()>,
    /// Dropped (never sent on) to release the dispatch loop
    _dispatch_done_tx: Sender<()>,
    /// Present until the first trigger moves it onto its own thread
    pending: Option<TimerLoop>,
    timer: Option<JoinHandle<()>>,
}

/// Collapses bursts of `trigger()` calls into one callback run, `delay`
/// after the last trigger of the burst.
///
/// ```no_run
/// use debounce::{Debounce, Debouncer};
/// use std::time::Duration;
///
/// let debouncer = Debouncer::new(Duration::from_millis(500), || println!("rebuild"));
/// for _ in 0..3 {
///     debouncer.trigger().unwrap();
/// }
/// std::thread::sleep(Duration::from_millis(600));
/// debouncer.stop().unwrap();
/// ```
pub struct Debouncer {
    shared: Arc<Shared>,
    gate: DispatchGate,
    thread_name: String,
    /// `None` once stopped. Guards "check stopped, then send" as one step.
    control: Mutex<Option<Control>>,
}

impl Debouncer {
    /// Create a debouncer with the default thread name
    ///
    /// A zero delay is raised to one millisecond.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the dispatch thread, like
    /// [`std::thread::spawn`].
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::build(delay, crate::config::DEFAULT_THREAD_NAME.to_string(), callback)
    }

    /// Create a debouncer from a validated config
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the dispatch thread.
    pub fn with_config<F>(config: &DebounceConfig, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        config.validate()?;
        Ok(Self::build(config.delay(), config.thread_name.clone(), callback))
    }

    fn build<F>(delay: Duration, thread_name: String, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let delay = if delay.is_zero() {
            Duration::from_millis(1)
        } else {
            delay
        };

        let shared = Arc::new(Shared::new(delay));
        let gate: DispatchGate = Arc::new(ReentrantMutex::new(()));

        let (trigger_tx, trigger_rx) = bounded(0);
        let (fire_tx, fire_rx) = bounded(0);
        let (timer_done_tx, timer_done_rx) = bounded(0);
        let (dispatch_done_tx, dispatch_done_rx) = bounded(0);

        let dispatch = DispatchLoop::new(
            shared.clone(),
            gate.clone(),
            fire_rx,
            dispatch_done_rx,
            callback,
        );
        thread::Builder::new()
            .name(format!("{}-dispatch", thread_name))
            .spawn(move || dispatch.run())
            .expect("failed to spawn dispatch thread");

        let timer = TimerLoop::new(shared.clone(), trigger_rx, fire_tx, timer_done_rx);

        debug!("debouncer created (delay: {:?})", delay);

        Self {
            shared,
            gate,
            thread_name,
            control: Mutex::new(Some(Control {
                trigger_tx,
                timer_done_tx,
                _dispatch_done_tx: dispatch_done_tx,
                pending: Some(timer),
                timer: None,
            })),
        }
    }

    /// Configured quiescence window
    pub fn delay(&self) -> Duration {
        self.shared.delay
    }

    /// Current lifecycle state, read without blocking
    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Number of callbacks dispatched so far
    pub fn fire_count(&self) -> u64 {
        self.shared.fire_count()
    }

    /// True when no countdown is running and every fire handed to the
    /// dispatch thread has started its callback.
    ///
    /// Meant for draining a running debouncer before `stop()`: once this
    /// returns true, stopping cannot cancel a fire (`stop()` waits for a
    /// callback that already started).
    pub fn is_idle(&self) -> bool {
        self.shared.is_idle()
    }
}

impl Debounce for Debouncer {
    /// Restart the quiescence window, starting the timer thread on first use.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the timer thread on the first call,
    /// like [`std::thread::spawn`].
    fn trigger(&self) -> Result<()> {
        let mut guard = self.control.lock();
        let control = guard.as_mut().ok_or(DebounceError::AlreadyStopped)?;

        // First trigger starts the timer thread. Taking `pending` under the
        // lock means exactly one spawn per instance.
        if let Some(timer) = control.pending.take() {
            let handle = thread::Builder::new()
                .name(format!("{}-timer", self.thread_name))
                .spawn(move || timer.run())
                .expect("failed to spawn timer thread");
            control.timer = Some(handle);
        }

        // A disconnected trigger channel means the timer loop is gone
        // (its dispatch loop died with a panicking callback).
        control
            .trigger_tx
            .send(())
            .map_err(|_| DebounceError::AlreadyStopped)
    }

    fn stop(&self) -> Result<()> {
        let mut control = {
            let mut guard = self.control.lock();
            let control = guard.take().ok_or(DebounceError::AlreadyStopped)?;
            self.shared.mark_stopped();

            // Signal before any channel end is dropped
            if control.pending.is_none() {
                let _ = control.timer_done_tx.send(());
            }
            control
        };

        let timer = control.timer.take();
        // Remaining senders drop here; the dispatch loop sees the disconnect.
        drop(control);

        if let Some(handle) = timer {
            if handle.join().is_err() {
                warn!("timer thread panicked");
            }
        }

        // Wait out a callback that was already running
        drop(self.gate.lock());

        debug!("debouncer stopped");
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if !self.shared.is_stopped() {
            debug!("debouncer dropped while running; stopping");
            let _ = self.stop();
        }
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.shared.delay)
            .field("state", &self.shared.state())
            .field("fires", &self.shared.fire_count())
            .finish()
    }
}
