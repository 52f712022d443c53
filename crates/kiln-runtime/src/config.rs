//! Reactor configuration

use kiln_core::env_get_str;

/// Which readiness poller backs the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerKind {
    /// Probe at startup: epoll where available, then poll, then select.
    Auto,
    Epoll,
    Poll,
    Select,
}

impl PollerKind {
    pub fn parse(name: &str) -> Option<PollerKind> {
        match name.to_ascii_lowercase().as_str() {
            "auto" => Some(PollerKind::Auto),
            "epoll" => Some(PollerKind::Epoll),
            "poll" => Some(PollerKind::Poll),
            "select" => Some(PollerKind::Select),
            _ => None,
        }
    }
}

/// Tunables for a reactor instance.
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    pub poller: PollerKind,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            poller: PollerKind::Auto,
        }
    }
}

impl ReactorConfig {
    /// Default configuration with environment overrides applied.
    ///
    /// `KILN_POLLER` pins the poller backend (`auto`, `epoll`, `poll`,
    /// `select`); unknown values fall back to auto with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let name = env_get_str("KILN_POLLER", "auto");
        match PollerKind::parse(&name) {
            Some(kind) => config.poller = kind,
            None => log::warn!("unknown KILN_POLLER value '{}', using auto", name),
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_backends() {
        assert_eq!(PollerKind::parse("auto"), Some(PollerKind::Auto));
        assert_eq!(PollerKind::parse("EPOLL"), Some(PollerKind::Epoll));
        assert_eq!(PollerKind::parse("poll"), Some(PollerKind::Poll));
        assert_eq!(PollerKind::parse("select"), Some(PollerKind::Select));
        assert_eq!(PollerKind::parse("kqueue"), None);
    }

    #[test]
    fn test_default_is_auto() {
        assert_eq!(ReactorConfig::default().poller, PollerKind::Auto);
    }
}
