//! Error types for reactor setup
//!
//! Caller mistakes (double fd registration, releasing an unheld mutex) are
//! panics with a clear message, not error values. This enum covers the
//! fallible paths that depend on the OS: creating the readiness poller and
//! the wake pipe.

use thiserror::Error;

/// Result type for reactor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bringing a reactor up.
#[derive(Debug, Error)]
pub enum Error {
    /// Creating or arming the readiness poller failed.
    #[error("poller setup failed: {0}")]
    PollerSetup(#[source] std::io::Error),

    /// The requested poller backend is not available on this platform.
    #[error("poller backend {0:?} is not supported on this platform")]
    UnsupportedBackend(&'static str),

    /// Creating the self-pipe used for cross-thread wakeup failed.
    #[error("wake pipe setup failed: {0}")]
    WakePipe(#[source] std::io::Error),
}
