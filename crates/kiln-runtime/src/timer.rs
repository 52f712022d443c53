//! Timer records
//!
//! A timer is a named callback with a wake time. The reactor fires it when
//! the dispatch loop observes `now >= wake_time`; the callback's return
//! value becomes the next wake time, with `NEVER` meaning "do not fire
//! again unless re-armed". Registration order is preserved by the reactor,
//! so timers that expire in the same pass fire in the order they were
//! registered.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use kiln_core::{AtomicTimestamp, Timestamp, NEVER};

type TimerCallback = Box<dyn FnMut(Timestamp) -> Timestamp + Send>;

struct TimerEntry {
    name: String,
    waketime: AtomicTimestamp,
    callback: Mutex<TimerCallback>,
}

/// Handle to a registered timer.
///
/// Cloning the handle does not duplicate the timer; all clones refer to the
/// same record. Once unregistered, the wake time has no meaning.
#[derive(Clone)]
pub struct TimerHandle(Arc<TimerEntry>);

impl TimerHandle {
    pub(crate) fn new<F>(name: &str, callback: F, waketime: Timestamp) -> Self
    where
        F: FnMut(Timestamp) -> Timestamp + Send + 'static,
    {
        Self(Arc::new(TimerEntry {
            name: name.to_string(),
            waketime: AtomicTimestamp::new(waketime),
            callback: Mutex::new(Box::new(callback)),
        }))
    }

    /// The name given at registration, for diagnostics.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub(crate) fn waketime(&self) -> Timestamp {
        self.0.waketime.get()
    }

    pub(crate) fn set_waketime(&self, t: Timestamp) {
        self.0.waketime.set(t);
    }

    /// Run the callback and return the next wake time it requests.
    ///
    /// A panic in the callback is contained here: it is logged and the
    /// timer is disarmed by returning `NEVER`.
    pub(crate) fn invoke(&self, now: Timestamp) -> Timestamp {
        let mut callback = self.0.callback.lock();
        match panic::catch_unwind(AssertUnwindSafe(|| (*callback)(now))) {
            Ok(next) => next,
            Err(_) => {
                log::error!("timer '{}' callback panicked, disarming", self.0.name);
                NEVER
            }
        }
    }

    pub(crate) fn ptr_eq(&self, other: &TimerHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("name", &self.0.name)
            .field("waketime", &self.0.waketime.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_returns_next_waketime() {
        let t = TimerHandle::new("tick", |now| now + 0.25, 1.0);
        assert_eq!(t.invoke(2.0), 2.25);
    }

    #[test]
    fn test_invoke_contains_panic() {
        let t = TimerHandle::new("bad", |_| panic!("callback bug"), 0.0);
        assert_eq!(t.invoke(1.0), NEVER);
    }

    #[test]
    fn test_handle_clones_share_waketime() {
        let t = TimerHandle::new("shared", |_| NEVER, 3.0);
        let u = t.clone();
        u.set_waketime(7.0);
        assert_eq!(t.waketime(), 7.0);
        assert!(t.ptr_eq(&u));
    }
}
