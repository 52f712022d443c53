//! select(2) fallback backend

use std::io;
use std::os::unix::io::RawFd;
use std::ptr;

use parking_lot::Mutex;

use super::Poller;

pub(crate) struct Select {
    fds: Mutex<Vec<RawFd>>,
}

impl Select {
    pub(crate) fn new() -> Self {
        Self {
            fds: Mutex::new(Vec::new()),
        }
    }
}

impl Poller for Select {
    fn add(&self, fd: RawFd) -> io::Result<()> {
        if fd as usize >= libc::FD_SETSIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("fd {} exceeds FD_SETSIZE", fd),
            ));
        }
        self.fds.lock().push(fd);
        Ok(())
    }

    fn remove(&self, fd: RawFd) {
        self.fds.lock().retain(|&f| f != fd);
    }

    fn wait(&self, timeout: f64) -> Vec<RawFd> {
        let snapshot: Vec<RawFd> = self.fds.lock().clone();
        let mut set: libc::fd_set = unsafe { std::mem::zeroed() };
        unsafe { libc::FD_ZERO(&mut set) };
        let mut nfds = 0;
        for &fd in &snapshot {
            unsafe { libc::FD_SET(fd, &mut set) };
            nfds = nfds.max(fd + 1);
        }
        // select keeps microsecond resolution where the others round to
        // milliseconds.
        let mut tv = libc::timeval {
            tv_sec: timeout.floor() as libc::time_t,
            tv_usec: ((timeout - timeout.floor()) * 1e6) as libc::suseconds_t,
        };
        let n = unsafe {
            libc::select(nfds, &mut set, ptr::null_mut(), ptr::null_mut(), &mut tv)
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                log::error!("select failed: {}", err);
            }
            return Vec::new();
        }
        snapshot
            .into_iter()
            .filter(|&fd| unsafe { libc::FD_ISSET(fd, &set) })
            .collect()
    }

    fn name(&self) -> &'static str {
        "select"
    }
}
