//! Configuration for HTTP sessions
//!
//! Default values live in the constant modules; a [`SessionConfig`] carries
//! the effective settings into each session.

use std::time::Duration;

/// Network-related defaults
pub mod network {
    /// Client identification sent with every request
    pub const USER_AGENT: &str = concat!("radiohttp/", env!("CARGO_PKG_VERSION"));

    /// Connection timeout in seconds
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Per-wait socket read/write timeout in seconds
    pub const IO_TIMEOUT_SECS: u64 = 30;

    /// Port used when the URL does not name one
    pub const DEFAULT_HTTP_PORT: u16 = 80;
}

/// Protocol limits
pub mod limits {
    /// Maximum redirect and playlist hops followed while opening a session
    pub const MAX_REDIRECTS: usize = 10;

    /// Longest status, header or chunk-size line accepted (bytes)
    pub const MAX_LINE_LEN: usize = 1024;

    /// Body lines scanned for a target URL when following a playlist
    pub const MAX_PLAYLIST_LINES: usize = 64;

    /// Largest chunk accepted from a chunked body (bytes)
    pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
}

/// Socket timeouts, applied per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub io: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(network::CONNECT_TIMEOUT_SECS),
            io: Duration::from_secs(network::IO_TIMEOUT_SECS),
        }
    }
}

/// HTTP proxy settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    /// Host substrings that bypass the proxy
    pub no_proxy: Vec<String>,
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            no_proxy: Vec::new(),
        }
    }

    /// Set the exclusion list from a comma-separated string.
    ///
    /// Entries are trimmed; empty entries are dropped since they would match
    /// every host.
    pub fn with_no_proxy(mut self, domains: &str) -> Self {
        self.no_proxy = domains
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// First exclusion entry contained in `host`, if any.
    pub fn bypass_for(&self, host: &str) -> Option<&str> {
        self.no_proxy
            .iter()
            .map(String::as_str)
            .find(|domain| host.contains(domain))
    }
}

/// Settings for one session, owned by the caller
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_agent: String,
    pub timeouts: Timeouts,
    pub proxy: Option<ProxyConfig>,
    pub max_redirects: usize,
    pub max_line_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: network::USER_AGENT.to_string(),
            timeouts: Timeouts::default(),
            proxy: None,
            max_redirects: limits::MAX_REDIRECTS,
            max_line_len: limits::MAX_LINE_LEN,
        }
    }
}

impl SessionConfig {
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.timeouts = Timeouts { connect, io };
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.timeouts.connect, Duration::from_secs(10));
        assert_eq!(config.timeouts.io, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.max_line_len, 1024);
        assert!(config.proxy.is_none());
        assert!(config.user_agent.starts_with("radiohttp/"));
    }

    #[test]
    fn no_proxy_list_is_trimmed() {
        let proxy = ProxyConfig::new("proxy.lan", 3128).with_no_proxy(" local , example.org,, ");
        assert_eq!(proxy.no_proxy, vec!["local", "example.org"]);
    }

    #[test]
    fn bypass_matches_substring_first_entry_wins() {
        let proxy = ProxyConfig::new("proxy.lan", 3128).with_no_proxy("example, radio.example.org");
        assert_eq!(proxy.bypass_for("radio.example.org"), Some("example"));
        assert_eq!(proxy.bypass_for("stream.other.net"), None);
    }

    #[test]
    fn bypass_is_case_sensitive() {
        let proxy = ProxyConfig::new("proxy.lan", 3128).with_no_proxy("Example");
        assert_eq!(proxy.bypass_for("radio.example.org"), None);
    }

    #[test]
    fn builder_methods() {
        let config = SessionConfig::default()
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(2))
            .with_user_agent("test/1.0")
            .with_max_redirects(3)
            .with_proxy(ProxyConfig::new("p", 8080));
        assert_eq!(config.timeouts.io, Duration::from_secs(2));
        assert_eq!(config.user_agent, "test/1.0");
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.proxy.map(|p| p.port), Some(8080));
    }
}
