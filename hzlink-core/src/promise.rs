//! Single-shot asynchronous results with continuation combinators.
//!
//! A [`Promise`] is the read side of a one-shot channel carrying
//! `Result<T>`; its [`Completer`] is the write side. Promises are futures, so
//! callers can simply `.await` them, but the connection layer also chains them
//! with [`then`](Promise::then), [`then_promise`](Promise::then_promise) and
//! [`then_first`](Promise::then_first). Each combinator runs its continuation
//! on a spawned task and requires a tokio runtime.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hzlink_core::Result<()> {
//! use hzlink_core::promise::Promise;
//!
//! let (completer, promise) = Promise::new();
//! let doubled = promise.then(|n: i32| Ok(n * 2), |e| e);
//! completer.resolve(21);
//! assert_eq!(doubled.await?, 42);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{HzError, Result};

/// An eventual value or failure, delivered exactly once.
#[must_use = "promises do nothing unless awaited or chained"]
pub struct Promise<T> {
    rx: oneshot::Receiver<Result<T>>,
}

/// The write side of a [`Promise`].
///
/// Dropping a completer without completing it rejects the promise with
/// [`HzError::Cancelled`].
pub struct Completer<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Completer<T> {
    /// Resolves the promise with a value.
    pub fn resolve(self, value: T) {
        self.complete(Ok(value));
    }

    /// Rejects the promise with an error.
    pub fn reject(self, error: HzError) {
        self.complete(Err(error));
    }

    /// Completes the promise with a result. A no-op if the promise was dropped.
    pub fn complete(self, result: Result<T>) {
        let _ = self.tx.send(result);
    }

    /// Returns true once the promise has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Waits until the promise is dropped.
    pub async fn closed(&mut self) {
        self.tx.closed().await;
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}

impl<T> Promise<T> {
    /// Creates an unresolved promise and the completer that settles it.
    pub fn new() -> (Completer<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (Completer { tx }, Self { rx })
    }

    /// Creates a promise that is already resolved.
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// Creates a promise that is already rejected.
    pub fn rejected(error: HzError) -> Self {
        Self::settled(Err(error))
    }

    fn settled(result: Result<T>) -> Self {
        let (completer, promise) = Self::new();
        completer.complete(result);
        promise
    }
}

impl<T: Send + 'static> Promise<T> {
    /// Runs `future` on a new task and returns a promise of its output.
    ///
    /// The task stops early if the returned promise is dropped.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (mut completer, promise) = Self::new();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = future => Some(result),
                _ = completer.closed() => None,
            };
            if let Some(result) = outcome {
                completer.complete(result);
            }
        });
        promise
    }

    /// Transforms the outcome of this promise.
    ///
    /// `on_success` runs only if this promise resolves; its result settles the
    /// returned promise. Otherwise `on_failure` maps the error.
    pub fn then<U, S, F>(self, on_success: S, on_failure: F) -> Promise<U>
    where
        U: Send + 'static,
        S: FnOnce(T) -> Result<U> + Send + 'static,
        F: FnOnce(HzError) -> HzError + Send + 'static,
    {
        Promise::spawn(async move {
            match self.await {
                Ok(value) => on_success(value),
                Err(error) => Err(on_failure(error)),
            }
        })
    }

    /// Chains an asynchronous step returning another promise.
    pub fn then_promise<U, S, F>(self, on_success: S, on_failure: F) -> Promise<U>
    where
        U: Send + 'static,
        S: FnOnce(T) -> Promise<U> + Send + 'static,
        F: FnOnce(HzError) -> HzError + Send + 'static,
    {
        Promise::spawn(async move {
            match self.await {
                Ok(value) => on_success(value).await,
                Err(error) => Err(on_failure(error)),
            }
        })
    }

    /// Runs a side effect and forwards the original outcome.
    ///
    /// If `on_success` fails, the returned promise fails with its error
    /// instead. `on_failure` observes a source failure, which is then passed
    /// through unchanged.
    pub fn then_first<S, F>(self, on_success: S, on_failure: F) -> Promise<T>
    where
        S: FnOnce(&T) -> Result<()> + Send + 'static,
        F: FnOnce(&HzError) + Send + 'static,
    {
        Promise::spawn(async move {
            match self.await {
                Ok(value) => on_success(&value).map(|()| value),
                Err(error) => {
                    on_failure(&error);
                    Err(error)
                }
            }
        })
    }
}

impl<T> Future for Promise<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(HzError::Cancelled(
                "promise was abandoned before it completed".to_string(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
