//! The reactor core
//!
//! One dispatch loop multiplexes three kinds of work: timer callbacks, fd
//! readiness callbacks, and cooperative tasks that suspend and resume. The
//! loop computes the nearest timer deadline, waits in the readiness poller
//! until that deadline or until an fd is ready, then fires whatever became
//! due.
//!
//! Exactly one task drives the loop at any moment; that task is the
//! *dispatcher*. When a callback running inside the dispatcher suspends
//! (takes a contended mutex, waits on a completion, calls [`Reactor::pause`]
//! directly), the dispatcher parks itself behind a wake-hook timer and hands
//! the loop to a pooled task. When the suspended task later finishes its
//! work, the stale dispatcher notices it has been replaced, returns itself
//! to the pool, and switches back to the installed one.
//!
//! Foreign threads may not touch the reactor directly. They enqueue work on
//! the async queue and write one byte to a self-pipe; the pipe's read end is
//! an ordinary registered fd whose callback drains the queue on the reactor
//! thread.

use std::collections::HashMap;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use crossbeam_queue::SegQueue;
use nix::fcntl::OFlag;
use parking_lot::Mutex;

use kiln_core::{clock, AtomicTimestamp, Error, Result, Timestamp, NEVER, NOW};

use crate::completion::Completion;
use crate::config::ReactorConfig;
use crate::poller::{self, Poller};
use crate::sync::ReactorMutex;
use crate::task::{self, Task};
use crate::timer::TimerHandle;

type FdCallback = Box<dyn FnMut(Timestamp) + Send>;
type AsyncItem = Box<dyn FnOnce() + Send>;

/// Handle to a registered fd callback.
#[derive(Clone)]
pub struct FdHandle(Arc<FdEntry>);

struct FdEntry {
    fd: RawFd,
    callback: Mutex<FdCallback>,
}

impl FdHandle {
    fn new<F>(fd: RawFd, callback: F) -> Self
    where
        F: FnMut(Timestamp) + Send + 'static,
    {
        Self(Arc::new(FdEntry {
            fd,
            callback: Mutex::new(Box::new(callback)),
        }))
    }

    pub fn fd(&self) -> RawFd {
        self.0.fd
    }

    /// Run the callback unless an earlier invocation is still suspended on
    /// this fd (a level-triggered poller keeps reporting the fd until the
    /// suspended call resumes and consumes the data).
    fn invoke(&self, now: Timestamp) {
        let Some(mut callback) = self.0.callback.try_lock() else {
            log::trace!("fd {} callback still active, skipping", self.0.fd);
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| (*callback)(now))).is_err() {
            log::error!("fd {} callback panicked", self.0.fd);
        }
    }
}

struct WakePipe {
    read: OwnedFd,
    write: OwnedFd,
}

struct Inner {
    running: AtomicBool,
    timers: Mutex<Vec<TimerHandle>>,
    /// Lower bound on the earliest timer wake time, never above the true
    /// minimum. Reset to NEVER at the start of each expiry pass.
    next_timer: AtomicTimestamp,
    fds: Mutex<HashMap<RawFd, FdHandle>>,
    poller: Box<dyn Poller>,
    /// The task currently driving the dispatch loop.
    dispatch: Mutex<Option<Arc<Task>>>,
    task_pool: Mutex<Vec<Arc<Task>>>,
    async_queue: SegQueue<AsyncItem>,
    wake_pipe: Mutex<Option<WakePipe>>,
}

/// A single-threaded cooperative event reactor.
///
/// Cloning produces another handle to the same reactor. Apart from
/// [`register_async_callback`](Reactor::register_async_callback) and
/// [`async_complete`](Reactor::async_complete), the API must be used from
/// the thread of control running the reactor.
#[derive(Clone)]
pub struct Reactor {
    inner: Arc<Inner>,
}

impl Reactor {
    /// Create a reactor with configuration from the environment.
    pub fn new() -> Result<Reactor> {
        Self::with_config(ReactorConfig::from_env())
    }

    pub fn with_config(config: ReactorConfig) -> Result<Reactor> {
        let poller = poller::create(config.poller)?;
        log::debug!("reactor using {} poller", poller.name());
        Ok(Reactor {
            inner: Arc::new(Inner {
                running: AtomicBool::new(false),
                timers: Mutex::new(Vec::new()),
                next_timer: AtomicTimestamp::new(NEVER),
                fds: Mutex::new(HashMap::new()),
                poller,
                dispatch: Mutex::new(None),
                task_pool: Mutex::new(Vec::new()),
                async_queue: SegQueue::new(),
                wake_pipe: Mutex::new(None),
            }),
        })
    }

    /// Seconds on the monotonic clock.
    pub fn monotonic(&self) -> Timestamp {
        clock::monotonic()
    }

    // ── Timers ──────────────────────────────────────────────────────

    /// Register a named timer.
    ///
    /// The callback fires once the loop observes `now >= waketime` and its
    /// return value becomes the new wake time; `NEVER` disarms it until
    /// re-armed with [`update_timer`](Reactor::update_timer).
    pub fn register_timer<F>(&self, name: &str, callback: F, waketime: Timestamp) -> TimerHandle
    where
        F: FnMut(Timestamp) -> Timestamp + Send + 'static,
    {
        let handle = TimerHandle::new(name, callback, waketime);
        self.inner.timers.lock().push(handle.clone());
        self.inner.next_timer.fold_min(waketime);
        handle
    }

    /// Move a timer's wake time.
    ///
    /// The cached minimum is only revised downward here; the expiry pass
    /// re-derives it from scratch.
    pub fn update_timer(&self, timer: &TimerHandle, waketime: Timestamp) {
        timer.set_waketime(waketime);
        self.inner.next_timer.fold_min(waketime);
    }

    /// Remove a timer. A second unregister of the same handle is a no-op.
    pub fn unregister_timer(&self, timer: &TimerHandle) {
        // Disarm first so an expiry scan in progress sees NEVER.
        timer.set_waketime(NEVER);
        let mut timers = self.inner.timers.lock();
        if let Some(pos) = timers.iter().position(|t| t.ptr_eq(timer)) {
            timers.remove(pos);
        }
    }

    /// Fire expired timers and return the poll timeout in seconds.
    fn check_timers(&self, eventtime: Timestamp, me: &Arc<Task>) -> f64 {
        let inner = &self.inner;
        if eventtime < inner.next_timer.get() {
            return clamp_timeout(inner.next_timer.get() - eventtime);
        }
        inner.next_timer.set(NEVER);
        let snapshot: Vec<TimerHandle> = inner.timers.lock().clone();
        for t in &snapshot {
            let mut waketime = t.waketime();
            if eventtime >= waketime {
                // Disarmed while the callback runs, so a timer may safely
                // re-arm itself from inside its own callback.
                t.set_waketime(NEVER);
                waketime = t.invoke(eventtime);
                t.set_waketime(waketime);
                if !self.is_dispatcher(me) {
                    // The callback resumed a task that installed a new
                    // dispatcher; this pass is stale.
                    inner.next_timer.fold_min(waketime);
                    self.end_dispatcher(me);
                    return 0.0;
                }
            }
            inner.next_timer.fold_min(waketime);
        }
        if eventtime >= inner.next_timer.get() {
            return 0.0;
        }
        clamp_timeout(inner.next_timer.get() - clock::monotonic())
    }

    // ── File descriptors ────────────────────────────────────────────

    /// Register a read/hangup readiness callback for `fd`.
    ///
    /// # Panics
    ///
    /// If `fd` is already registered, or the poller refuses it.
    pub fn register_fd<F>(&self, fd: RawFd, callback: F) -> FdHandle
    where
        F: FnMut(Timestamp) + Send + 'static,
    {
        let handle = FdHandle::new(fd, callback);
        {
            let mut fds = self.inner.fds.lock();
            assert!(
                !fds.contains_key(&fd),
                "fd {} is already registered with this reactor",
                fd
            );
            fds.insert(fd, handle.clone());
        }
        if let Err(e) = self.inner.poller.add(fd) {
            self.inner.fds.lock().remove(&fd);
            panic!(
                "failed to arm fd {} with the {} poller: {}",
                fd,
                self.inner.poller.name(),
                e
            );
        }
        handle
    }

    /// Remove an fd registration. Safe to call from inside the fd's own
    /// callback.
    pub fn unregister_fd(&self, handle: &FdHandle) {
        self.inner.poller.remove(handle.fd());
        self.inner.fds.lock().remove(&handle.fd());
    }

    // ── Callbacks and completions ───────────────────────────────────

    /// A fresh, unresolved completion tied to this reactor.
    pub fn completion<T: Clone + Send + 'static>(&self) -> Completion<T> {
        Completion::new(self.clone())
    }

    /// Run `callback` once at `waketime`; the returned completion resolves
    /// with the callback's result.
    pub fn register_callback<R, F>(&self, callback: F, waketime: Timestamp) -> Completion<R>
    where
        R: Clone + Send + 'static,
        F: FnOnce(Timestamp) -> R + Send + 'static,
    {
        let completion: Completion<R> = self.completion();
        let reactor = self.clone();
        let done = completion.clone();
        let slot: Arc<Mutex<Option<TimerHandle>>> = Arc::new(Mutex::new(None));
        let hook_slot = slot.clone();
        let mut callback = Some(callback);
        let handle = self.register_timer(
            "one-shot",
            move |now| {
                if let Some(timer) = hook_slot.lock().take() {
                    reactor.unregister_timer(&timer);
                }
                if let Some(cb) = callback.take() {
                    done.complete(cb(now));
                }
                NEVER
            },
            waketime,
        );
        *slot.lock() = Some(handle);
        completion
    }

    // ── Asynchronous (foreign-thread) injection ─────────────────────

    /// Like [`register_callback`](Reactor::register_callback) but safe to
    /// call from any thread. The registration itself happens on the reactor
    /// thread after the wake pipe is poked.
    pub fn register_async_callback<F>(&self, callback: F, waketime: Timestamp)
    where
        F: FnOnce(Timestamp) + Send + 'static,
    {
        let reactor = self.clone();
        self.inner.async_queue.push(Box::new(move || {
            let _ = reactor.register_callback(
                move |now| {
                    callback(now);
                },
                waketime,
            );
        }));
        self.poke_pipe();
    }

    /// Resolve `completion` with `result` from any thread.
    pub fn async_complete<T: Clone + Send + 'static>(&self, completion: &Completion<T>, result: T) {
        let completion = completion.clone();
        self.inner.async_queue.push(Box::new(move || {
            completion.complete(result);
        }));
        self.poke_pipe();
    }

    fn poke_pipe(&self) {
        let pipe = self.inner.wake_pipe.lock();
        if let Some(pipe) = pipe.as_ref() {
            let byte = [b'.'];
            // A full pipe buffer is fine, the byte is only a wake signal.
            let _ = unsafe {
                libc::write(
                    pipe.write.as_raw_fd(),
                    byte.as_ptr() as *const libc::c_void,
                    1,
                )
            };
        }
    }

    fn got_pipe_signal(&self, _eventtime: Timestamp) {
        {
            let pipe = self.inner.wake_pipe.lock();
            if let Some(pipe) = pipe.as_ref() {
                let mut buf = [0u8; 4096];
                let _ = unsafe {
                    libc::read(
                        pipe.read.as_raw_fd(),
                        buf.as_mut_ptr() as *mut libc::c_void,
                        buf.len(),
                    )
                };
            }
        }
        while let Some(item) = self.inner.async_queue.pop() {
            item();
        }
    }

    fn setup_wake_pipe(&self) -> Result<()> {
        let read_fd = {
            let mut pipe = self.inner.wake_pipe.lock();
            if pipe.is_some() {
                return Ok(());
            }
            let (read, write) = nix::unistd::pipe2(OFlag::O_NONBLOCK | OFlag::O_CLOEXEC)
                .map_err(|e| Error::WakePipe(std::io::Error::from_raw_os_error(e as i32)))?;
            let read_fd = read.as_raw_fd();
            *pipe = Some(WakePipe { read, write });
            read_fd
        };
        let weak = Arc::downgrade(&self.inner);
        self.register_fd(read_fd, move |now| {
            if let Some(inner) = Weak::upgrade(&weak) {
                Reactor { inner }.got_pipe_signal(now);
            }
        });
        Ok(())
    }

    // ── Mutexes ─────────────────────────────────────────────────────

    /// A cooperative FIFO mutex whose contenders suspend via this reactor.
    pub fn mutex(&self, locked: bool) -> ReactorMutex {
        ReactorMutex::new(self.clone(), locked)
    }

    // ── Task switching ──────────────────────────────────────────────

    /// Suspend the current task until `waketime`, or until another task
    /// re-arms its wake hook. Returns the event time observed at resume.
    ///
    /// With no reactor running and no dispatcher installed this degrades to
    /// a plain thread sleep.
    pub fn pause(&self, waketime: Timestamp) -> Timestamp {
        let cur = task::current();
        let dispatch = self.inner.dispatch.lock().clone();
        let dispatch = match dispatch {
            None => return self.sys_pause(waketime),
            Some(d) => d,
        };
        if !Arc::ptr_eq(&dispatch, &cur) {
            // Hand the wake time to the dispatcher; it becomes the new wake
            // time of this task's hook timer.
            return task::switch(&dispatch, waketime);
        }
        // The dispatcher itself is pausing. Hand the loop to a pooled task
        // (or a fresh one) and park behind a wake-hook timer.
        let next = {
            let pooled = self.inner.task_pool.lock().pop();
            match pooled {
                Some(t) => t,
                None => {
                    let reactor = self.clone();
                    task::spawn(move |_| reactor.dispatch_loop())
                }
            }
        };
        *next.parent.lock() = cur.parent.lock().clone();
        let target = cur.clone();
        let timer = self.register_timer("task-wake", move |now| task::switch(&target, now), waketime);
        *cur.timer.lock() = Some(timer);
        self.inner.next_timer.set(NOW);
        task::switch(&next, NOW)
    }

    /// Pause with a real thread sleep, for use before the reactor runs.
    fn sys_pause(&self, waketime: Timestamp) -> Timestamp {
        let delay = waketime - clock::monotonic();
        if delay > 0.0 {
            thread::sleep(Duration::from_secs_f64(delay));
        }
        clock::monotonic()
    }

    fn is_dispatcher(&self, task: &Arc<Task>) -> bool {
        match self.inner.dispatch.lock().as_ref() {
            Some(d) => Arc::ptr_eq(d, task),
            None => false,
        }
    }

    /// Retire a stale dispatcher: pool it, drop its wake hook, and hand
    /// control to the installed dispatcher. Returns when the pooled task is
    /// reused, at which point it takes the loop back.
    fn end_dispatcher(&self, old: &Arc<Task>) {
        self.inner.task_pool.lock().push(old.clone());
        let timer = old.timer.lock().take();
        if let Some(timer) = timer {
            self.unregister_timer(&timer);
        }
        let installed = self
            .inner
            .dispatch
            .lock()
            .clone()
            .expect("no dispatcher installed");
        task::switch(&installed, NEVER);
        // Reused from the pool: this task drives the loop again.
        *self.inner.dispatch.lock() = Some(old.clone());
    }

    // ── Main loop ───────────────────────────────────────────────────

    fn dispatch_loop(&self) {
        let me = task::current();
        *self.inner.dispatch.lock() = Some(me.clone());
        log::debug!("dispatch task {} started", me.id());
        let mut eventtime = clock::monotonic();
        while self.inner.running.load(Ordering::Acquire) {
            let timeout = self.check_timers(eventtime, &me);
            let ready = self.inner.poller.wait(timeout);
            eventtime = clock::monotonic();
            for fd in ready {
                let handler = self.inner.fds.lock().get(&fd).cloned();
                if let Some(handler) = handler {
                    handler.invoke(eventtime);
                }
                if !self.is_dispatcher(&me) {
                    // A callback handed the loop to another task; the rest
                    // of this readiness snapshot is stale.
                    self.end_dispatcher(&me);
                    eventtime = clock::monotonic();
                    break;
                }
            }
        }
        *self.inner.dispatch.lock() = None;
        log::debug!("dispatch task {} stopped", me.id());
    }

    /// Run the dispatch loop until [`end`](Reactor::end).
    ///
    /// Creates the wake pipe on first use, then spawns the initial dispatch
    /// task and switches into it. The calling thread is suspended for the
    /// duration.
    pub fn run(&self) -> Result<()> {
        self.setup_wake_pipe()?;
        // Work injected before the pipe existed is still queued; one poke
        // makes the first poll drain it.
        if !self.inner.async_queue.is_empty() {
            self.poke_pipe();
        }
        self.inner.running.store(true, Ordering::Release);
        let reactor = self.clone();
        let dispatch = task::spawn(move |_| reactor.dispatch_loop());
        task::switch(&dispatch, NOW);
        Ok(())
    }

    /// Ask the dispatch loop to exit after its next poll returns.
    pub fn end(&self) {
        self.inner.running.store(false, Ordering::Release);
        // NOW is a valid lower bound for the deadline cache, so the next
        // poll comes back without blocking.
        self.inner.next_timer.set(NOW);
    }
}

fn clamp_timeout(delta: f64) -> f64 {
    delta.max(0.001).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn timed_halt(reactor: &Reactor, at: Timestamp) {
        let r = reactor.clone();
        reactor.register_timer(
            "halt",
            move |_| {
                r.end();
                NEVER
            },
            at,
        );
    }

    #[test]
    fn test_reactor_handle_is_send_and_sync() {
        fn require<T: Send + Sync>() {}
        require::<Reactor>();
    }

    #[test]
    fn test_clamp_timeout_bounds() {
        assert_eq!(clamp_timeout(0.0), 0.001);
        assert_eq!(clamp_timeout(0.5), 0.5);
        assert_eq!(clamp_timeout(30.0), 1.0);
    }

    #[test]
    fn test_single_timer_fires_on_time() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let fired = Arc::new(Mutex::new(None));
        let fired2 = fired.clone();
        reactor.register_timer(
            "once",
            move |now| {
                *fired2.lock() = Some(now);
                NEVER
            },
            start + 0.050,
        );
        timed_halt(&reactor, start + 0.2);
        reactor.run().unwrap();
        let observed = fired.lock().expect("timer never fired");
        assert!((observed - (start + 0.050)).abs() < 0.020);
        assert!(observed >= start + 0.050);
    }

    #[test]
    fn test_rearming_timer_fires_repeatedly() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        reactor.register_timer(
            "tick",
            move |now| {
                count2.fetch_add(1, Ordering::SeqCst);
                now + 0.010
            },
            start + 0.010,
        );
        timed_halt(&reactor, start + 0.105);
        reactor.run().unwrap();
        let n = count.load(Ordering::SeqCst);
        assert!((9..=11).contains(&n), "expected ~10 firings, got {}", n);
    }

    #[test]
    fn test_same_waketime_fires_in_registration_order() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in [1u8, 2, 3] {
            let order = order.clone();
            reactor.register_timer(
                "tied",
                move |_| {
                    order.lock().push(tag);
                    NEVER
                },
                start + 0.020,
            );
        }
        timed_halt(&reactor, start + 0.1);
        reactor.run().unwrap();
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unregister_timer_twice_is_noop() {
        let reactor = Reactor::new().unwrap();
        let t = reactor.register_timer("gone", |_| NEVER, NEVER);
        reactor.unregister_timer(&t);
        reactor.unregister_timer(&t);
        assert!(reactor.inner.timers.lock().is_empty());
    }

    #[test]
    fn test_callbacks_never_overlap() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let active = active.clone();
            let max_seen = max_seen.clone();
            reactor.register_timer(
                "busy",
                move |now| {
                    let n = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(n, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    active.fetch_sub(1, Ordering::SeqCst);
                    now + 0.005
                },
                NOW,
            );
        }
        timed_halt(&reactor, start + 0.06);
        reactor.run().unwrap();
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fd_callback_sees_written_byte() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let (rd, wr) = nix::unistd::pipe().unwrap();
        let rfd = rd.as_raw_fd();
        let wfd = wr.as_raw_fd();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let observed2 = observed.clone();
        let _fd_handle = reactor.register_fd(rfd, move |_| {
            let mut buf = [0u8; 8];
            let n = unsafe { libc::read(rfd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
            observed2.lock().push((n, buf[0]));
        });
        let _ = reactor.register_callback(
            move |_| {
                let byte = [b'x'];
                unsafe { libc::write(wfd, byte.as_ptr() as *const libc::c_void, 1) };
            },
            NOW,
        );
        timed_halt(&reactor, start + 0.1);
        reactor.run().unwrap();
        drop(wr);
        let got = observed.lock();
        assert_eq!(got.as_slice(), &[(1, b'x')]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_double_fd_registration_panics() {
        let reactor = Reactor::new().unwrap();
        let (rd, _wr) = nix::unistd::pipe().unwrap();
        let rfd = rd.as_raw_fd();
        let _first = reactor.register_fd(rfd, |_| {});
        let _second = reactor.register_fd(rfd, |_| {});
    }

    #[test]
    fn test_completion_resolved_from_foreign_thread() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let completion: Completion<i32> = reactor.completion();
        let result = Arc::new(Mutex::new(None));
        {
            let completion = completion.clone();
            let result = result.clone();
            let reactor2 = reactor.clone();
            let _ = reactor.register_callback(
                move |_| {
                    *result.lock() = completion.wait(NEVER, None);
                    reactor2.end();
                },
                NOW,
            );
        }
        {
            let reactor2 = reactor.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                let completion = completion;
                reactor2.async_complete(&completion, 42);
            });
        }
        timed_halt(&reactor, start + 2.0);
        reactor.run().unwrap();
        let elapsed = reactor.monotonic() - start;
        assert_eq!(*result.lock(), Some(42));
        assert!(elapsed >= 0.045, "resolved too early: {}", elapsed);
        assert!(elapsed < 0.5, "resolved too late: {}", elapsed);
    }

    #[test]
    fn test_wait_times_out_with_marker() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let completion: Completion<&'static str> = reactor.completion();
        let result = Arc::new(Mutex::new(None));
        {
            let result = result.clone();
            let reactor2 = reactor.clone();
            let _ = reactor.register_callback(
                move |now| {
                    *result.lock() = completion.wait(now + 0.030, Some("T/O"));
                    reactor2.end();
                },
                NOW,
            );
        }
        timed_halt(&reactor, start + 2.0);
        reactor.run().unwrap();
        let elapsed = reactor.monotonic() - start;
        assert_eq!(*result.lock(), Some("T/O"));
        assert!(elapsed >= 0.030);
    }

    #[test]
    fn test_mutex_acquired_in_fifo_order() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let mutex = reactor.mutex(true);
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["alpha", "beta", "gamma"] {
            let mutex = mutex.clone();
            let order = order.clone();
            let _ = reactor.register_callback(
                move |_| {
                    let _guard = mutex.lock();
                    order.lock().push(tag);
                },
                NOW,
            );
        }
        {
            let mutex = mutex.clone();
            let _ = reactor.register_callback(move |_| mutex.unlock(), NOW);
        }
        timed_halt(&reactor, start + 0.25);
        reactor.run().unwrap();
        assert_eq!(*order.lock(), vec!["alpha", "beta", "gamma"]);
        assert!(!mutex.test());
    }

    #[test]
    fn test_async_callback_runs_promptly() {
        let reactor = Reactor::new().unwrap();
        let fired = Arc::new(Mutex::new(None));
        let start = clock::monotonic();
        {
            let fired = fired.clone();
            let reactor2 = reactor.clone();
            reactor.register_async_callback(
                move |now| {
                    *fired.lock() = Some(now);
                    reactor2.end();
                },
                NOW,
            );
        }
        let runner = {
            let reactor = reactor.clone();
            thread::spawn(move || reactor.run().unwrap())
        };
        runner.join().unwrap();
        let elapsed = clock::monotonic() - start;
        assert!(fired.lock().is_some());
        assert!(elapsed < 0.2, "async wake took {}", elapsed);
    }

    #[test]
    fn test_pause_without_reactor_sleeps() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let resumed = reactor.pause(start + 0.020);
        assert!(resumed >= start + 0.020);
    }

    #[test]
    fn test_pause_inside_callback_resumes_with_event_time() {
        let reactor = Reactor::new().unwrap();
        let start = reactor.monotonic();
        let resumed = Arc::new(Mutex::new(None));
        {
            let resumed = resumed.clone();
            let reactor2 = reactor.clone();
            let _ = reactor.register_callback(
                move |now| {
                    let at = reactor2.pause(now + 0.030);
                    *resumed.lock() = Some((now, at));
                    reactor2.end();
                },
                NOW,
            );
        }
        timed_halt(&reactor, start + 2.0);
        reactor.run().unwrap();
        let (paused_at, resumed_at) = resumed.lock().expect("callback never resumed");
        assert!(resumed_at >= paused_at + 0.030);
        assert!(resumed_at - paused_at < 0.2);
    }
}
