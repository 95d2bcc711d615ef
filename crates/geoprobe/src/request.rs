//! The request capability consumed by the executor.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Future returned by [`RequestDescriptor::execute`].
pub type ExecuteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// One API call, as seen by the executor.
///
/// The executor never inspects the request's fields. It resolves the URL
/// first, so the endpoint can be shown even if the call later fails, and
/// then awaits `execute`.
pub trait RequestDescriptor: Send + Sync {
    /// The terminal payload: a structured response, raw bytes, ...
    type Output: Send;

    /// The exact URL this request will hit.
    fn build_url(&self) -> Result<String>;

    /// Perform the request.
    ///
    /// Implementations call [`RetrySignal::retry_after`] whenever the backend
    /// asks for a delayed retry.
    fn execute(&self, retry: RetrySignal) -> ExecuteFuture<'_, Self::Output>;
}

/// Mid-flight "retry after N seconds" channel from the network layer to the
/// executor.
#[derive(Debug, Clone)]
pub struct RetrySignal {
    tx: async_channel::Sender<i64>,
}

impl RetrySignal {
    /// Create a signal and the receiver the executor listens on.
    #[must_use]
    pub fn channel() -> (Self, async_channel::Receiver<i64>) {
        let (tx, rx) = async_channel::unbounded();
        (Self { tx }, rx)
    }

    /// A signal nobody listens to, for running a descriptor directly.
    #[must_use]
    pub fn detached() -> Self {
        Self::channel().0
    }

    /// Report that the backend asked to retry after `seconds`.
    ///
    /// Negative values mean "no retry requested". Never blocks.
    pub fn retry_after(&self, seconds: i64) {
        tracing::debug!(seconds, "retry signal");
        // The receiver is gone once the executor has resolved; late signals
        // are meaningless then.
        let _ = self.tx.try_send(seconds);
    }
}
