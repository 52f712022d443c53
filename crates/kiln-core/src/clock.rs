//! Monotonic timestamps
//!
//! All scheduling in the reactor is expressed in seconds as `f64`, read from
//! `CLOCK_MONOTONIC`. Two sentinels bracket the realistic range of the
//! clock: `NOW` sorts before every real timestamp and `NEVER` after.

use std::sync::atomic::{AtomicU64, Ordering};

use nix::time::{clock_gettime, ClockId};

/// Seconds on the monotonic clock.
pub type Timestamp = f64;

/// Earliest possible wake time. Sorts before any real timestamp.
pub const NOW: Timestamp = 0.0;

/// A wake time that never arrives. Sorts after any real timestamp.
pub const NEVER: Timestamp = 9999999999999999.0;

/// Read the monotonic clock as seconds.
///
/// The value is strictly non-decreasing for the lifetime of the process and
/// unrelated to the wall clock.
pub fn monotonic() -> Timestamp {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)
        .expect("clock_gettime(CLOCK_MONOTONIC) failed");
    ts.tv_sec() as f64 + ts.tv_nsec() as f64 * 1e-9
}

/// A `Timestamp` that can be read and written from any task.
///
/// Stored as the bit pattern of the `f64` in an `AtomicU64`. The reactor
/// uses this for per-timer wake times and for the cached next-timer lower
/// bound, both of which are touched from whichever task currently drives
/// the dispatch loop.
pub struct AtomicTimestamp(AtomicU64);

impl AtomicTimestamp {
    pub fn new(t: Timestamp) -> Self {
        Self(AtomicU64::new(t.to_bits()))
    }

    #[inline]
    pub fn get(&self) -> Timestamp {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, t: Timestamp) {
        self.0.store(t.to_bits(), Ordering::Release);
    }

    /// Lower the stored value to `t` if `t` is smaller.
    pub fn fold_min(&self, t: Timestamp) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                if t < f64::from_bits(bits) {
                    Some(t.to_bits())
                } else {
                    None
                }
            });
    }
}

impl std::fmt::Debug for AtomicTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtomicTimestamp({})", self.get())
    }
}
