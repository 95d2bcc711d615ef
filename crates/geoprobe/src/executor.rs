//! Request execution pipeline.
//!
//! [`Executor::run`] drives one [`RequestDescriptor`] to a single terminal
//! [`Outcome`], publishing [`Status`] events along the way:
//!
//! 1. `UrlResolved` before any network activity.
//! 2. `Progress` once per second while the backend's retry countdown runs.
//! 3. `Completed` with the elapsed time once `execute` resolves.
//!
//! Failures of any kind end up in [`Outcome::Failed`]; nothing escapes `run`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_channel::{Receiver, Sender};
use tokio::time::Instant;

use crate::countdown::Countdown;
use crate::error::{Error, ErrorInfo, Result};
use crate::node::{ObjectNode, ResponseValue, materialize};
use crate::request::{RequestDescriptor, RetrySignal};

/// Label of the root node of every materialized result.
pub const ROOT_LABEL: &str = "result";

/// Status events published while a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The URL the request is about to hit.
    UrlResolved(String),
    /// Seconds left on the retry countdown, or `None` to clear the display.
    Progress(Option<u32>),
    /// `execute` resolved after this many milliseconds.
    Completed { duration_ms: u64 },
}

/// Lifecycle of the current execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    #[default]
    Idle,
    InFlight {
        /// Remaining seconds while a retry countdown is displayed.
        retry_countdown: Option<u32>,
    },
    Completed,
    Failed,
}

impl ExecutionState {
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, ExecutionState::InFlight { .. })
    }
}

/// The single terminal result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Failed(ErrorInfo),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// The payload, if the run succeeded.
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    /// The failure, if the run failed.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Failed(info) => Some(info),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, ErrorInfo> {
        match self {
            Outcome::Ok(value) => Ok(value),
            Outcome::Failed(info) => Err(info),
        }
    }
}

type SharedState = Arc<Mutex<ExecutionState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, ExecutionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the state failed if a run future is dropped before it resolves.
struct RunGuard<'a> {
    state: &'a SharedState,
}

impl RunGuard<'_> {
    fn finish(self, terminal: ExecutionState) {
        *lock(self.state) = terminal;
        std::mem::forget(self);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.is_in_flight() {
            tracing::debug!("run dropped while in flight");
            *state = ExecutionState::Failed;
        }
    }
}

/// Runs requests one at a time and reports their progress.
#[derive(Debug)]
pub struct Executor {
    status_tx: Sender<Status>,
    state: SharedState,
}

impl Executor {
    /// Create an executor and the receiving end of its status stream.
    #[must_use]
    pub fn new() -> (Self, Receiver<Status>) {
        let (status_tx, status_rx) = async_channel::unbounded();
        let executor = Self {
            status_tx,
            state: Arc::default(),
        };
        (executor, status_rx)
    }

    /// Current execution state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        *lock(&self.state)
    }

    /// Run a structured request and materialize the response under
    /// [`ROOT_LABEL`].
    pub async fn run<R>(&self, request: &R) -> Outcome<ObjectNode>
    where
        R: RequestDescriptor<Output = ResponseValue>,
    {
        self.run_with(request, |value| Ok(materialize(ROOT_LABEL, &value)))
            .await
    }

    /// Run a request whose payload is a byte stream, such as a static image.
    pub async fn run_binary<R>(&self, request: &R) -> Outcome<Vec<u8>>
    where
        R: RequestDescriptor<Output = Vec<u8>>,
    {
        self.run_with(request, Ok).await
    }

    /// Run a request and turn its payload into the caller's terminal type.
    ///
    /// Only one run per executor may be in flight; a second concurrent call
    /// fails immediately with [`ErrorKind::Busy`](crate::ErrorKind::Busy)
    /// and leaves the first one undisturbed.
    pub async fn run_with<R, U, F>(&self, request: &R, finish: F) -> Outcome<U>
    where
        R: RequestDescriptor,
        F: FnOnce(R::Output) -> Result<U>,
    {
        {
            let mut state = lock(&self.state);
            if state.is_in_flight() {
                tracing::warn!("rejecting run: a request is already in flight");
                return Outcome::Failed(ErrorInfo::from(Error::Busy));
            }
            *state = ExecutionState::InFlight {
                retry_countdown: None,
            };
        }
        let guard = RunGuard { state: &self.state };

        let url = match request.build_url() {
            Ok(url) => url,
            Err(e) => return self.fail(guard, &e),
        };
        tracing::debug!(url, "executing request");
        self.emit(Status::UrlResolved(url));

        let start = Instant::now();
        let (retry, retry_rx) = RetrySignal::channel();
        let mut countdown = Countdown::new();

        let mut execution = request.execute(retry);
        let result = loop {
            tokio::select! {
                biased;
                result = &mut execution => break result,
                Ok(seconds) = retry_rx.recv() => self.on_retry_signal(&mut countdown, seconds),
            }
        };
        drop(execution);

        if countdown.is_running() {
            countdown.stop();
            self.set_countdown(None);
            self.emit(Status::Progress(None));
        }

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.emit(Status::Completed { duration_ms });

        match result.and_then(finish) {
            Ok(payload) => {
                tracing::info!(duration_ms, "request completed");
                guard.finish(ExecutionState::Completed);
                Outcome::Ok(payload)
            }
            Err(e) => self.fail(guard, &e),
        }
    }

    fn on_retry_signal(&self, countdown: &mut Countdown, seconds: i64) {
        let tx = self.status_tx.clone();
        let state = Arc::clone(&self.state);

        let started = countdown.start(seconds, move |remaining| {
            {
                let mut state = lock(&state);
                if state.is_in_flight() {
                    *state = ExecutionState::InFlight {
                        retry_countdown: (remaining > 0).then_some(remaining),
                    };
                }
            }
            let _ = tx.try_send(Status::Progress(Some(remaining)));
        });

        if started {
            tracing::warn!(seconds, "backend requested a delayed retry");
        }
    }

    fn set_countdown(&self, retry_countdown: Option<u32>) {
        let mut state = lock(&self.state);
        if state.is_in_flight() {
            *state = ExecutionState::InFlight { retry_countdown };
        }
    }

    fn fail<U>(&self, guard: RunGuard<'_>, e: &Error) -> Outcome<U> {
        tracing::warn!(error = %e, "request failed");
        guard.finish(ExecutionState::Failed);
        Outcome::Failed(ErrorInfo::from(e))
    }

    fn emit(&self, status: Status) {
        // Status is advisory; a caller that dropped the receiver still gets
        // the outcome.
        let _ = self.status_tx.try_send(status);
    }
}
