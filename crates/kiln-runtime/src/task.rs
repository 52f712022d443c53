//! Cooperative tasks
//!
//! A task is a resumable flow of control. Exactly one task runs at any
//! instant; every other task is blocked on its own switch cell. Control
//! moves between tasks with [`switch`], which deposits an `f64` payload
//! into the target's cell and then blocks on the caller's cell until
//! somebody deposits back. The payload carries wake times in one direction
//! and observed event times in the other, so a suspended task resumes with
//! the timestamp its waker saw.
//!
//! Tasks are backed by detached OS threads. The rendezvous protocol keeps
//! them cooperative: a thread only leaves its cell when it is handed
//! control, so user code never observes two tasks running at once.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};

use kiln_core::{Timestamp, NOW};

use crate::timer::TimerHandle;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// One resumable flow of control.
pub(crate) struct Task {
    id: u64,
    cell: SwitchCell,
    /// Wake-hook timer while this task is suspended inside `pause`.
    pub(crate) timer: Mutex<Option<TimerHandle>>,
    /// Receives control when this task's entry returns.
    pub(crate) parent: Mutex<Option<Arc<Task>>>,
}

/// Rendezvous point for handing control (and a timestamp) to a task.
struct SwitchCell {
    slot: Mutex<Option<Timestamp>>,
    cond: Condvar,
}

impl SwitchCell {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    fn deposit(&self, value: Timestamp) {
        let mut slot = self.slot.lock();
        *slot = Some(value);
        self.cond.notify_one();
    }

    fn collect(&self) -> Timestamp {
        let mut slot = self.slot.lock();
        while slot.is_none() {
            self.cond.wait(&mut slot);
        }
        slot.take().unwrap()
    }
}

impl Task {
    fn new() -> Arc<Task> {
        Arc::new(Task {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            cell: SwitchCell::new(),
            timer: Mutex::new(None),
            parent: Mutex::new(None),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<Task>>> = const { RefCell::new(None) };
}

/// The task identity of the calling thread.
///
/// A thread that has never entered the switch protocol (the main thread, a
/// foreign thread) gets an identity lazily on first use, so it can act as
/// the parent of the first dispatch task.
pub(crate) fn current() -> Arc<Task> {
    CURRENT.with(|c| {
        let mut cur = c.borrow_mut();
        if cur.is_none() {
            *cur = Some(Task::new());
        }
        cur.as_ref().unwrap().clone()
    })
}

/// Hand control to `target` carrying `value`; block until control returns.
///
/// The returned timestamp is whatever the task that eventually resumes us
/// chose to pass.
pub(crate) fn switch(target: &Arc<Task>, value: Timestamp) -> Timestamp {
    let me = current();
    target.cell.deposit(value);
    me.cell.collect()
}

/// Spawn a new task parked at its entry point.
///
/// The task does not run until somebody switches into it; the first
/// deposited payload becomes the entry argument. The backing thread is
/// detached, matching the pool discipline: tasks parked at teardown are
/// left behind and reclaimed by process exit.
pub(crate) fn spawn<F>(entry: F) -> Arc<Task>
where
    F: FnOnce(Timestamp) + Send + 'static,
{
    let task = Task::new();
    *task.parent.lock() = Some(current());
    let handle = task.clone();
    thread::Builder::new()
        .name(format!("kiln-task-{}", task.id))
        .spawn(move || {
            let first = handle.cell.collect();
            CURRENT.with(|c| *c.borrow_mut() = Some(handle.clone()));
            if panic::catch_unwind(AssertUnwindSafe(|| entry(first))).is_err() {
                log::error!("task {} entry panicked", handle.id);
            }
            let parent = handle.parent.lock().take();
            if let Some(parent) = parent {
                parent.cell.deposit(NOW);
            }
        })
        .expect("failed to spawn task thread");
    task
}
