//! Completions
//!
//! A completion is a one-shot result cell. One task may block on it with
//! [`Completion::wait`]; resolving it with [`Completion::complete`] re-arms
//! the waiter's wake-hook timer so the dispatcher resumes it promptly.
//! Resolving twice overwrites (last write wins), which is tolerated but
//! discouraged.

use std::sync::Arc;

use parking_lot::Mutex;

use kiln_core::{Timestamp, NOW};

use crate::reactor::Reactor;
use crate::task::{self, Task};

struct Inner<T> {
    reactor: Reactor,
    result: Mutex<Option<T>>,
    waiting: Mutex<Option<Arc<Task>>>,
}

/// One-shot result cell tied to a reactor.
///
/// Clones share the cell; resolve from the reactor thread with
/// [`complete`](Completion::complete) or from any thread through
/// [`Reactor::async_complete`].
pub struct Completion<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Completion<T> {
    pub(crate) fn new(reactor: Reactor) -> Self {
        Self {
            inner: Arc::new(Inner {
                reactor,
                result: Mutex::new(None),
                waiting: Mutex::new(None),
            }),
        }
    }

    /// Whether a result has been stored.
    pub fn test(&self) -> bool {
        self.inner.result.lock().is_some()
    }

    /// Store the result and wake the parked waiter, if any.
    pub fn complete(&self, result: T) {
        *self.inner.result.lock() = Some(result);
        let waiting = self.inner.waiting.lock().clone();
        if let Some(waiter) = waiting {
            let timer = waiter.timer.lock().clone();
            if let Some(timer) = timer {
                self.inner.reactor.update_timer(&timer, NOW);
            }
        }
    }

    /// Block the current task until the completion resolves or `waketime`
    /// passes.
    ///
    /// Returns the stored result, or `timeout_result` if the wake time
    /// arrived first. A completion that resolved before the call returns
    /// immediately without yielding. Only one task may wait at a time.
    pub fn wait(&self, waketime: Timestamp, timeout_result: Option<T>) -> Option<T> {
        if self.inner.result.lock().is_none() {
            {
                let mut waiting = self.inner.waiting.lock();
                debug_assert!(waiting.is_none(), "completion already has a waiter");
                *waiting = Some(task::current());
            }
            self.inner.reactor.pause(waketime);
            *self.inner.waiting.lock() = None;
            if self.inner.result.lock().is_none() {
                return timeout_result;
            }
        }
        self.inner.result.lock().clone()
    }
}
