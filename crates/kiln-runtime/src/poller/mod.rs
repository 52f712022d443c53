//! Readiness pollers
//!
//! The dispatch loop needs one capability from the OS: "wait until any
//! registered fd is readable or hung up, or until a timeout". Three
//! backends provide it behind the [`Poller`] trait, selected once at
//! startup. The reactor observes no semantic difference between them
//! beyond the timeout's sub-millisecond resolution (epoll and poll round
//! up to milliseconds, select keeps microseconds).
//!
//! Backends keep their own fd bookkeeping behind a short-lived lock that
//! is never held across the blocking wait, so foreign threads can inject
//! work while the loop sleeps.

use std::io;
use std::os::unix::io::RawFd;

use kiln_core::{Error, Result};

use crate::config::PollerKind;

mod poll;
mod select;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod epoll;
    }
}

/// A readiness-polling mechanism.
///
/// All registrations are for read + hangup interest.
pub(crate) trait Poller: Send + Sync {
    /// Start watching `fd`.
    fn add(&self, fd: RawFd) -> io::Result<()>;

    /// Stop watching `fd`. Unknown fds are ignored.
    fn remove(&self, fd: RawFd);

    /// Block until readiness or timeout; return the ready fds.
    ///
    /// Interruption (EINTR) and transient errors return an empty set; the
    /// dispatch loop simply retries on its next iteration.
    fn wait(&self, timeout: f64) -> Vec<RawFd>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Millisecond timeout for the poll-family waits, rounded up.
fn timeout_ms(timeout: f64) -> libc::c_int {
    (timeout * 1000.0).ceil() as libc::c_int
}

/// Instantiate the configured backend.
///
/// `Auto` probes in preference order: epoll, then poll, then select.
pub(crate) fn create(kind: PollerKind) -> Result<Box<dyn Poller>> {
    match kind {
        PollerKind::Auto => {
            #[cfg(target_os = "linux")]
            match epoll::Epoll::new() {
                Ok(p) => return Ok(Box::new(p)),
                Err(e) => log::debug!("epoll unavailable, falling back to poll: {}", e),
            }
            Ok(Box::new(poll::Poll::new()))
        }
        PollerKind::Epoll => {
            #[cfg(target_os = "linux")]
            {
                let p = epoll::Epoll::new().map_err(Error::PollerSetup)?;
                Ok(Box::new(p))
            }
            #[cfg(not(target_os = "linux"))]
            {
                Err(Error::UnsupportedBackend("epoll"))
            }
        }
        PollerKind::Poll => Ok(Box::new(poll::Poll::new())),
        PollerKind::Select => Ok(Box::new(select::Select::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    fn assert_reports_readable(poller: &dyn Poller) {
        let (rd, wr) = nix::unistd::pipe().expect("pipe");
        let rfd = rd.as_raw_fd();
        poller.add(rfd).unwrap();

        // Nothing written yet: a short wait comes back empty.
        assert!(poller.wait(0.01).is_empty());

        let byte = [b'x'];
        let n = unsafe { libc::write(wr.as_raw_fd(), byte.as_ptr() as *const libc::c_void, 1) };
        assert_eq!(n, 1);

        let ready = poller.wait(0.1);
        assert_eq!(ready, vec![rfd]);

        poller.remove(rfd);
        assert!(poller.wait(0.01).is_empty());
    }

    #[test]
    fn test_poll_backend_readiness() {
        assert_reports_readable(&poll::Poll::new());
    }

    #[test]
    fn test_select_backend_readiness() {
        assert_reports_readable(&select::Select::new());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_epoll_backend_readiness() {
        assert_reports_readable(&epoll::Epoll::new().unwrap());
    }

    #[test]
    fn test_auto_selects_a_backend() {
        let poller = create(PollerKind::Auto).unwrap();
        assert!(!poller.name().is_empty());
    }

    #[test]
    fn test_timeout_rounds_up() {
        assert_eq!(timeout_ms(0.0005), 1);
        assert_eq!(timeout_ms(0.25), 250);
        assert_eq!(timeout_ms(1.0), 1000);
    }
}
