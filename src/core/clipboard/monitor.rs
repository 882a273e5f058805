use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::capability::ClipboardCapability;
use crate::shared::errors::ClipboardResult;
use crate::shared::settings::MonitorSettings;

const MAX_CONSECUTIVE_ERRORS: u32 = 10;

struct WatchState {
    /// Bumped on every start so a loop from an earlier start can tell it is stale
    generation: u64,
    watching: bool,
    last_content: Option<String>,
}

struct Shared {
    state: Mutex<WatchState>,
    /// Held for the whole duration of a callback
    callback_gate: Mutex<()>,
    /// Thread currently running the callback, if any
    callback_thread: Mutex<Option<ThreadId>>,
    wake: Notify,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, WatchState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("monitor mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        match self.callback_gate.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set_callback_thread(&self, thread: Option<ThreadId>) {
        let mut current = match self.callback_thread.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = thread;
    }

    fn in_callback(&self) -> bool {
        let current = match self.callback_thread.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current == Some(thread::current().id())
    }
}

/// Clipboard monitor that polls for changes.
///
/// Idle until [`start`](Self::start), Watching until [`stop`](Self::stop).
/// While watching, each distinct new clipboard text is passed to the
/// callback once. A value equal to the last observed one never is.
///
/// Change detection latency is one poll interval. Stopping is immediate:
/// the loop is woken and exits at its next check, and `stop` waits out a
/// callback already running on another thread.
pub struct ClipboardMonitor {
    capability: Arc<dyn ClipboardCapability>,
    poll_interval: Duration,
    max_poll_interval: Duration,
    shared: Arc<Shared>,
}

impl ClipboardMonitor {
    pub fn new(capability: Arc<dyn ClipboardCapability>, settings: &MonitorSettings) -> Self {
        Self {
            capability,
            poll_interval: settings.poll_interval(),
            max_poll_interval: settings.max_poll_interval(),
            shared: Arc::new(Shared {
                state: Mutex::new(WatchState {
                    generation: 0,
                    watching: false,
                    last_content: None,
                }),
                callback_gate: Mutex::new(()),
                callback_thread: Mutex::new(None),
                wake: Notify::new(),
            }),
        }
    }

    /// Start watching on the current tokio runtime.
    ///
    /// Returns false if already watching or if called outside a runtime.
    pub fn start<F>(&self, callback: F) -> bool
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("cannot start clipboard monitor without a tokio runtime: {}", e);
                return false;
            }
        };

        let generation = {
            let mut state = self.shared.lock_state();
            if state.watching {
                debug!("clipboard monitor already watching");
                return false;
            }
            state.generation += 1;
            state.watching = true;
            state.generation
        };

        let watch = WatchLoop {
            capability: Arc::clone(&self.capability),
            shared: Arc::clone(&self.shared),
            generation,
            poll_interval: self.poll_interval,
            max_poll_interval: self.max_poll_interval,
        };
        runtime.spawn(watch.run(callback));

        info!(interval_ms = self.poll_interval.as_millis() as u64, "clipboard monitor started");
        true
    }

    /// Stop watching. Idempotent and safe from any thread, the callback included.
    pub fn stop(&self) {
        let was_watching = {
            let mut state = self.shared.lock_state();
            std::mem::replace(&mut state.watching, false)
        };
        self.shared.wake.notify_one();

        // Wait out a callback running elsewhere. From inside the callback
        // the loop sees the flag as soon as the callback returns.
        if !self.shared.in_callback() {
            drop(self.shared.lock_gate());
        }

        if was_watching {
            info!("clipboard monitor stopped");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.shared.lock_state().watching
    }

    /// Write `text` to the clipboard without it coming back as a new copy.
    ///
    /// The state lock is held across the write, so a poll that reads the
    /// new text compares it only after it was recorded as seen. A failed
    /// write leaves the last observed value alone.
    pub fn write_observed(&self, text: &str) -> ClipboardResult<()> {
        let mut state = self.shared.lock_state();
        self.capability.write_text(text)?;
        state.last_content = Some(text.to_string());
        Ok(())
    }
}

struct WatchLoop {
    capability: Arc<dyn ClipboardCapability>,
    shared: Arc<Shared>,
    generation: u64,
    poll_interval: Duration,
    max_poll_interval: Duration,
}

enum Poll {
    Continue(Duration),
    Stop,
}

impl WatchLoop {
    async fn run<F>(self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        debug!(generation = self.generation, "watch loop running");
        let mut consecutive_errors = 0u32;

        loop {
            let sleep_for = match self.poll_once(&callback, &mut consecutive_errors) {
                Poll::Continue(interval) => interval,
                Poll::Stop => break,
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.shared.wake.notified() => {}
            }
        }

        debug!(generation = self.generation, "watch loop exited");
    }

    fn poll_once<F>(&self, callback: &F, consecutive_errors: &mut u32) -> Poll
    where
        F: Fn(String),
    {
        if !self.is_current(&self.shared.lock_state()) {
            return Poll::Stop;
        }

        let current = match self.capability.read_text() {
            Ok(current) => {
                *consecutive_errors = 0;
                current
            }
            Err(e) => {
                *consecutive_errors += 1;
                if *consecutive_errors == 1 || *consecutive_errors % 10 == 0 {
                    warn!("failed to read clipboard (error #{}): {}", consecutive_errors, e);
                }
                return Poll::Continue(self.backoff(*consecutive_errors));
            }
        };

        // No text on the clipboard right now; not a change.
        let Some(current) = current.filter(|text| !text.is_empty()) else {
            return Poll::Continue(self.poll_interval);
        };

        // The gate is held through the callback so that `stop` returning
        // means no callback is running or will run.
        let _gate = self.shared.lock_gate();
        {
            let mut state = self.shared.lock_state();
            if !self.is_current(&state) {
                return Poll::Stop;
            }
            if state.last_content.as_deref() == Some(current.as_str()) {
                return Poll::Continue(self.poll_interval);
            }
            state.last_content = Some(current.clone());
        }

        debug!(bytes = current.len(), "detected clipboard change");
        self.shared.set_callback_thread(Some(thread::current().id()));
        callback(current);
        self.shared.set_callback_thread(None);

        Poll::Continue(self.poll_interval)
    }

    fn is_current(&self, state: &WatchState) -> bool {
        state.watching && state.generation == self.generation
    }

    /// Exponential backoff once errors pile up, capped at the max interval
    fn backoff(&self, consecutive_errors: u32) -> Duration {
        if consecutive_errors < MAX_CONSECUTIVE_ERRORS {
            return self.poll_interval;
        }
        if consecutive_errors == MAX_CONSECUTIVE_ERRORS {
            warn!("too many consecutive clipboard errors, reducing polling frequency");
        }
        let factor = 2u32.pow((consecutive_errors - MAX_CONSECUTIVE_ERRORS).min(4));
        std::cmp::min(self.poll_interval * factor, self.max_poll_interval)
    }
}
