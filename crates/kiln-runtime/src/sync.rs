//! Cooperative mutex
//!
//! Unlike `std::sync::Mutex`, a contended acquire suspends the calling task
//! through the reactor instead of blocking the OS thread, so the dispatch
//! loop keeps servicing timers and fds while contenders wait. Hand-off is
//! strictly FIFO: release re-arms the queue head's wake-hook timer and the
//! lock transfers without ever appearing free to a bystander.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use kiln_core::{NEVER, NOW};

use crate::reactor::Reactor;
use crate::task::{self, Task};

struct State {
    locked: bool,
    next_pending: bool,
    queue: VecDeque<Arc<Task>>,
}

struct Inner {
    reactor: Reactor,
    state: Mutex<State>,
}

/// FIFO mutex whose blocked contenders suspend via the reactor.
///
/// Clones share the lock. Acquire with [`lock`](ReactorMutex::lock) for an
/// RAII guard; [`unlock`](ReactorMutex::unlock) releases a hold that has no
/// guard, such as a mutex created already locked.
#[derive(Clone)]
pub struct ReactorMutex {
    inner: Arc<Inner>,
}

impl ReactorMutex {
    pub(crate) fn new(reactor: Reactor, locked: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                reactor,
                state: Mutex::new(State {
                    locked,
                    next_pending: false,
                    queue: VecDeque::new(),
                }),
            }),
        }
    }

    /// Whether the mutex is currently held.
    pub fn test(&self) -> bool {
        self.inner.state.lock().locked
    }

    /// Acquire the mutex, suspending the current task if contended.
    pub fn lock(&self) -> ReactorMutexGuard<'_> {
        self.acquire();
        ReactorMutexGuard { mutex: self }
    }

    fn acquire(&self) {
        let cur = task::current();
        {
            let mut state = self.inner.state.lock();
            if !state.locked {
                state.locked = true;
                return;
            }
            state.queue.push_back(cur.clone());
        }
        loop {
            self.inner.reactor.pause(NEVER);
            let mut state = self.inner.state.lock();
            let at_head = state
                .queue
                .front()
                .map_or(false, |head| Arc::ptr_eq(head, &cur));
            if state.next_pending && at_head {
                state.next_pending = false;
                state.queue.pop_front();
                return;
            }
        }
    }

    /// Release the mutex.
    ///
    /// With contenders queued the lock stays held and ownership passes to
    /// the FIFO head, which is woken through its hook timer.
    ///
    /// # Panics
    ///
    /// If the mutex is not held.
    pub fn unlock(&self) {
        let head = {
            let mut state = self.inner.state.lock();
            assert!(state.locked, "released a mutex that is not held");
            match state.queue.front() {
                None => {
                    state.locked = false;
                    return;
                }
                Some(head) => {
                    let head = head.clone();
                    state.next_pending = true;
                    head
                }
            }
        };
        let timer = head.timer.lock().clone();
        if let Some(timer) = timer {
            self.inner.reactor.update_timer(&timer, NOW);
        }
    }
}

/// Releases the mutex when dropped.
pub struct ReactorMutexGuard<'a> {
    mutex: &'a ReactorMutex,
}

impl Drop for ReactorMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reactor() -> Reactor {
        Reactor::new().unwrap()
    }

    #[test]
    fn test_uncontended_lock_and_release() {
        let m = reactor().mutex(false);
        assert!(!m.test());
        {
            let _guard = m.lock();
            assert!(m.test());
        }
        assert!(!m.test());
    }

    #[test]
    fn test_initially_locked_factory() {
        let m = reactor().mutex(true);
        assert!(m.test());
        m.unlock();
        assert!(!m.test());
    }

    #[test]
    fn test_clones_share_the_lock() {
        let m = reactor().mutex(false);
        let n = m.clone();
        let _guard = m.lock();
        assert!(n.test());
    }

    #[test]
    #[should_panic(expected = "not held")]
    fn test_release_of_unheld_mutex_panics() {
        let m = reactor().mutex(false);
        m.unlock();
    }
}
