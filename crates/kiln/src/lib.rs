//! # kiln - a single-threaded cooperative event reactor
//!
//! kiln multiplexes three kinds of work over one flow of control: timer
//! callbacks, file-descriptor readiness callbacks, and cooperative tasks
//! that suspend and resume at explicit points. Completions and FIFO
//! mutexes integrate their waits with the scheduler, so blocking a task
//! never blocks the loop.
//!
//! ## Quick start
//!
//! ```no_run
//! use kiln::{Reactor, NOW};
//!
//! fn main() -> kiln::Result<()> {
//!     let reactor = Reactor::new()?;
//!
//!     // A repeating timer.
//!     reactor.register_timer("heartbeat", |now| {
//!         println!("tick at {now:.3}");
//!         now + 1.0
//!     }, NOW);
//!
//!     // A one-shot callback that suspends mid-flight.
//!     {
//!         let r = reactor.clone();
//!         reactor.register_callback(move |now| {
//!             let resumed = r.pause(now + 0.5);
//!             println!("slept from {now:.3} to {resumed:.3}");
//!             r.end();
//!         }, NOW);
//!     }
//!
//!     reactor.run()
//! }
//! ```
//!
//! Foreign threads interact through [`Reactor::register_async_callback`]
//! and [`Reactor::async_complete`]; everything else belongs to the
//! reactor's own thread of control.

// Re-export core types
pub use kiln_core::{env_get, env_get_str, monotonic, Error, Result, Timestamp, NEVER, NOW};

// Re-export runtime types
pub use kiln_runtime::{
    Completion, FdHandle, PollerKind, Reactor, ReactorConfig, ReactorMutex, ReactorMutexGuard,
    TimerHandle,
};
