//! Environment variable helpers
//!
//! Small typed getters for the runtime's env-tunable settings, for example
//! `KILN_POLLER` to pin the poller backend.

use std::str::FromStr;

/// Get an environment variable parsed as `T`, or the default.
///
/// Unset or unparseable values return the default.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get an environment variable as a string, or the default.
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
