//! poll(2) backend

use std::io;
use std::os::unix::io::RawFd;

use parking_lot::Mutex;

use super::{timeout_ms, Poller};

pub(crate) struct Poll {
    fds: Mutex<Vec<RawFd>>,
}

impl Poll {
    pub(crate) fn new() -> Self {
        Self {
            fds: Mutex::new(Vec::new()),
        }
    }
}

impl Poller for Poll {
    fn add(&self, fd: RawFd) -> io::Result<()> {
        self.fds.lock().push(fd);
        Ok(())
    }

    fn remove(&self, fd: RawFd) {
        self.fds.lock().retain(|&f| f != fd);
    }

    fn wait(&self, timeout: f64) -> Vec<RawFd> {
        // Snapshot the registered set; the lock must not be held while
        // blocked in poll().
        let snapshot: Vec<RawFd> = self.fds.lock().clone();
        let mut pollfds: Vec<libc::pollfd> = snapshot
            .iter()
            .map(|&fd| libc::pollfd {
                fd,
                events: libc::POLLIN | libc::POLLHUP,
                revents: 0,
            })
            .collect();
        let n = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                timeout_ms(timeout),
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                log::error!("poll failed: {}", err);
            }
            return Vec::new();
        }
        pollfds
            .iter()
            .filter(|pfd| pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
            .map(|pfd| pfd.fd)
            .collect()
    }

    fn name(&self) -> &'static str {
        "poll"
    }
}
