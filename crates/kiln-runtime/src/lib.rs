//! # kiln-runtime - the cooperative event reactor
//!
//! A single-threaded scheduling runtime that multiplexes timer callbacks,
//! fd-readiness callbacks, and cooperative tasks over one flow of control,
//! plus the synchronization fabric built on it: completions and FIFO
//! mutexes whose waits yield to the dispatch loop instead of blocking the
//! OS thread.
//!
//! ```text
//!                  ┌──────────────────────────────┐
//!                  │          user code           │
//!                  │ timers, fds, pause, wait     │
//!                  └──────────────┬───────────────┘
//!                                 │
//!                  ┌──────────────▼───────────────┐
//!                  │           Reactor            │
//!                  │ timer set · fd set · tasks   │
//!                  │ async queue · wake pipe      │
//!                  └──────┬───────────────┬───────┘
//!                         │               │
//!                 ┌───────▼──────┐ ┌──────▼───────┐
//!                 │    Poller    │ │    Tasks     │
//!                 │ epoll / poll │ │ switch cells │
//!                 │   / select   │ │  task pool   │
//!                 └──────────────┘ └──────────────┘
//! ```
//!
//! Everything but [`Reactor::register_async_callback`] and
//! [`Reactor::async_complete`] belongs to the reactor's own thread of
//! control.

mod completion;
mod config;
mod poller;
mod reactor;
mod sync;
mod task;
mod timer;

pub use completion::Completion;
pub use config::{PollerKind, ReactorConfig};
pub use reactor::{FdHandle, Reactor};
pub use sync::{ReactorMutex, ReactorMutexGuard};
pub use timer::TimerHandle;
