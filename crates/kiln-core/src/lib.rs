//! # kiln-core - platform-agnostic leaves of the kiln reactor
//!
//! Timestamps and the monotonic clock, the error type, and small
//! environment-variable helpers shared by the runtime and the demos.

pub mod clock;
pub mod env;
pub mod error;

pub use clock::{monotonic, AtomicTimestamp, Timestamp, NEVER, NOW};
pub use env::{env_get, env_get_str};
pub use error::{Error, Result};
