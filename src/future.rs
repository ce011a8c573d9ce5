//! One-shot async results.
//!
//! An [`AsyncResult`] is the value a transport hands back from `start()` and
//! `send()`. The producing side holds a [`Completer`], which may be cloned
//! into any number of socket callbacks. Only the first call to
//! [`Completer::complete`] takes effect; every later call reports
//! [`Completion::AlreadyCompleted`] and leaves the result untouched.
//!
//! # Example
//!
//! ```ignore
//! let (completer, result) = future::pair::<()>();
//!
//! completer.complete(Ok(()));
//! completer.complete(Err(Error::transport("late")));  // ignored
//!
//! assert!(result.await.is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::{Error, Result};

// ============================================================================
// Completion
// ============================================================================

/// Outcome of a [`Completer::complete`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// This call settled the result and the receiver got it.
    Delivered,
    /// This call settled the result, but the [`AsyncResult`] was dropped.
    Abandoned,
    /// An earlier call already settled the result.
    AlreadyCompleted,
}

impl Completion {
    /// Returns `true` if this call was the one that settled the result.
    #[inline]
    #[must_use]
    pub fn settled(self) -> bool {
        !matches!(self, Self::AlreadyCompleted)
    }
}

// ============================================================================
// Completer
// ============================================================================

/// Producing half of an [`AsyncResult`].
///
/// Cloning shares the same completion cell.
pub struct Completer<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<Result<T>>>>>,
}

impl<T> Clone for Completer<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl<T> Completer<T> {
    /// Settles the result unless it was already settled.
    pub fn complete(&self, result: Result<T>) -> Completion {
        // Taken under the lock, so exactly one caller ever sees `Some`.
        let Some(sender) = self.sender.lock().take() else {
            return Completion::AlreadyCompleted;
        };

        match sender.send(result) {
            Ok(()) => Completion::Delivered,
            Err(_) => Completion::Abandoned,
        }
    }

    /// Returns `true` once any call to [`complete`](Self::complete) has run.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

// ============================================================================
// AsyncResult
// ============================================================================

/// Consuming half: a future resolving to the operation's [`Result`].
///
/// Dropping it before completion marks the operation as abandoned.
#[must_use = "an AsyncResult does nothing unless awaited"]
pub struct AsyncResult<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult").finish_non_exhaustive()
    }
}

impl<T> AsyncResult<T> {
    /// Creates a result that is already settled.
    pub fn completed(result: Result<T>) -> Self {
        let (completer, async_result) = pair();
        completer.complete(result);
        async_result
    }

    /// Takes the outcome without waiting.
    ///
    /// Returns `None` while pending. The outcome can be taken only once;
    /// afterwards this returns [`Error::ConnectionClosed`].
    pub fn try_take(&mut self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(Error::ConnectionClosed)),
        }
    }
}

impl<T> Future for AsyncResult<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(Error::ChannelClosed(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Creates a connected [`Completer`] / [`AsyncResult`] pair.
#[must_use]
pub fn pair<T>() -> (Completer<T>, AsyncResult<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Completer {
            sender: Arc::new(Mutex::new(Some(tx))),
        },
        AsyncResult { receiver: rx },
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_completed_is_ready() {
        let result = AsyncResult::completed(Ok(7));
        assert_eq!(result.await.unwrap(), 7);
    }

    #[test]
    fn test_pending_until_completed() {
        let (completer, result) = pair::<()>();
        let mut fut = task::spawn(result);

        assert_pending!(fut.poll());
        assert!(!completer.is_completed());

        assert_eq!(completer.complete(Ok(())), Completion::Delivered);
        assert!(fut.is_woken());
        assert!(assert_ready!(fut.poll()).is_ok());
    }

    #[tokio::test]
    async fn test_first_completion_wins() {
        let (completer, result) = pair::<()>();

        assert_eq!(
            completer.complete(Err(Error::transport("ECONNRESET"))),
            Completion::Delivered
        );
        assert_eq!(completer.complete(Ok(())), Completion::AlreadyCompleted);
        assert_eq!(
            completer.complete(Err(Error::transport("second"))),
            Completion::AlreadyCompleted
        );

        let err = result.await.unwrap_err();
        assert_eq!(err.to_string(), "Transport error: ECONNRESET");
    }

    #[test]
    fn test_abandoned_result() {
        let (completer, result) = pair::<()>();
        drop(result);

        assert_eq!(completer.complete(Ok(())), Completion::Abandoned);
        assert!(completer.complete(Ok(())) == Completion::AlreadyCompleted);
    }

    #[test]
    fn test_try_take() {
        let (completer, mut result) = pair::<u8>();
        assert!(result.try_take().is_none());

        completer.complete(Ok(1));
        assert_eq!(result.try_take().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_completion_has_one_winner() {
        for _ in 0..64 {
            let (completer, mut result) = pair::<usize>();

            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let completer = completer.clone();
                    thread::spawn(move || completer.complete(Ok(i)).settled())
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|settled| *settled)
                .count();

            assert_eq!(winners, 1);
            assert!(result.try_take().unwrap().is_ok());
        }
    }

    #[test]
    fn test_dropped_completer_closes_result() {
        let (completer, result) = pair::<()>();
        drop(completer);

        let mut fut = task::spawn(result);
        let outcome = assert_ready!(fut.poll());
        assert!(matches!(outcome, Err(Error::ChannelClosed(_))));
    }
}
