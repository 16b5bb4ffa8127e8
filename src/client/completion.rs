//! One-shot completion callback
//!
//! Many internal paths can reach "done" (success, give-up after retries,
//! channel failure, assertion failure). The wrapper makes sure the caller
//! hears about exactly one of them.

use crate::error::ClientError;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

type Callback<R> = Box<dyn FnOnce(Result<R, ClientError>) + Send + 'static>;

/// Delivers at most one outcome to the wrapped callback
pub struct Completion<R> {
    callback: Mutex<Option<Callback<R>>>,
}

impl<R> Completion<R> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<R, ClientError>) + Send + 'static,
    {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    pub fn noop() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }

    /// Deliver `result` unless something was delivered already
    ///
    /// Returns whether this call was the one that delivered. The callback is
    /// taken out of the lock before it runs.
    pub fn complete(&self, result: Result<R, ClientError>) -> bool {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<R> fmt::Debug for Completion<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Completion callback paired with a receiver, for callers that want to await
pub fn completion_channel<R: Send + 'static>() -> (
    impl FnOnce(Result<R, ClientError>) + Send + 'static,
    oneshot::Receiver<Result<R, ClientError>>,
) {
    let (tx, rx) = oneshot::channel();
    let callback = move |result: Result<R, ClientError>| {
        // Receiver may have been dropped; nobody is listening then
        let _ = tx.send(result);
    };
    (callback, rx)
}
