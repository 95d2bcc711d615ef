//! Cancelable once-per-second countdown.
//!
//! A [`CountdownHandle`] owns one periodic task on the tokio runtime. Each
//! tick reports the seconds remaining and then decrements; the zero tick is
//! the last one. [`Countdown`] is the per-caller slot that makes a new start
//! supersede the previous countdown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spacing between ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Retry-signal value meaning "proceed without delay".
pub const NO_RETRY: i64 = -1;

/// Stop flag shared between a handle and its tick task.
///
/// The tick callback runs while holding the lock, so once [`stop`] has taken
/// the lock no tick can be in progress or start afterwards.
///
/// [`stop`]: CountdownHandle::stop
#[derive(Debug, Default)]
struct StopFlag(Mutex<bool>);

impl StopFlag {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A running (or finished) countdown.
///
/// Dropping the handle stops the countdown.
#[derive(Debug)]
pub struct CountdownHandle {
    stopped: Arc<StopFlag>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Start ticking down from `initial_seconds`.
    ///
    /// The first tick fires immediately with `initial_seconds`, the rest at
    /// one-second spacing down to and including zero. Returns `None` for
    /// negative values, which mean no retry was requested.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(initial_seconds: i64, mut on_tick: F) -> Option<Self>
    where
        F: FnMut(u32) + Send + 'static,
    {
        let Ok(mut remaining) = u32::try_from(initial_seconds) else {
            return None;
        };

        let stopped = Arc::new(StopFlag::default());
        let flag = Arc::clone(&stopped);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                {
                    let mut stopped = flag.lock();
                    if *stopped {
                        return;
                    }
                    on_tick(remaining);
                    if remaining == 0 {
                        *stopped = true;
                        return;
                    }
                }

                remaining -= 1;
            }
        });

        tracing::debug!(initial_seconds, "countdown started");
        Some(Self { stopped, task })
    }

    /// Halt future ticks.
    ///
    /// Idempotent. When this returns, no further tick will be emitted.
    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.task.abort();
    }

    /// Returns true once the countdown was stopped or reached zero.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A single countdown slot for one display target.
#[derive(Debug, Default)]
pub struct Countdown {
    current: Option<CountdownHandle>,
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown, stopping any previous one from this slot first.
    ///
    /// A negative `initial_seconds` is the "no retry" sentinel: nothing is
    /// started and the current countdown, if any, is left untouched.
    /// Returns whether a countdown was started.
    pub fn start<F>(&mut self, initial_seconds: i64, on_tick: F) -> bool
    where
        F: FnMut(u32) + Send + 'static,
    {
        if initial_seconds < 0 {
            return false;
        }

        self.stop();
        self.current = CountdownHandle::start(initial_seconds, on_tick);
        self.current.is_some()
    }

    /// Stop the current countdown, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.stop();
        }
    }

    /// Returns true while a countdown is still ticking.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|h| !h.is_stopped())
    }
}

/// Format a number of seconds as `hh:mm:ss`.
#[must_use]
pub fn format_remaining(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
