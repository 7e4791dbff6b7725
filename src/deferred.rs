// Deferred call results with optional completion callbacks
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::warn;

use crate::error::{CheddarError, Result};

/// The eventual result of an API call.
///
/// A `Deferred` is a future: await it to get the result. Like any future it
/// does nothing until driven; use [`Deferred::spawn`] to start the call right
/// away on the tokio runtime. A callback registered with
/// [`Deferred::on_complete`] sees the result exactly once, and the awaited
/// value is the same result, unchanged.
#[must_use = "a deferred call does nothing unless awaited or spawned"]
pub struct Deferred<T> {
    inner: BoxFuture<'static, Result<T>>,
}

impl<T: Send + 'static> Deferred<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    // Already settled
    pub fn ready(result: Result<T>) -> Self {
        Self::new(futures::future::ready(result))
    }

    /// Registers a callback invoked with `Ok(&value)` or `Err(&error)` once
    /// the call settles.
    ///
    /// A panic inside the callback is caught and logged; it never reaches
    /// the caller awaiting the result.
    pub fn on_complete<C>(self, callback: C) -> Self
    where
        C: FnOnce(std::result::Result<&T, &CheddarError>) + Send + 'static,
    {
        let inner = self.inner;
        Self::new(async move {
            let result = inner.await;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(result.as_ref())));
            if let Err(payload) = outcome {
                warn!("Completion callback panicked: {}", panic_message(payload.as_ref()));
            }
            result
        })
    }

    // Transforms a successful result; errors pass through untouched
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let inner = self.inner;
        Deferred::new(async move { inner.await.and_then(f) })
    }

    /// Starts the call on the current tokio runtime and returns a deferred
    /// for its result. Must be called from within a runtime.
    pub fn spawn(self) -> Self {
        let handle = tokio::spawn(self.inner);
        Self::new(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
                Err(e) => Err(CheddarError::Aborted(e.to_string())),
            }
        })
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
