//! `http://` URL parsing

use std::fmt;

use crate::config::network::DEFAULT_HTTP_PORT;
use crate::error::{HttpcError, Result};

const SCHEME: &str = "http://";

/// Check whether `s` looks like a plain-HTTP URL.
///
/// Only the scheme prefix is checked (case-insensitively); `https://` and
/// anything shorter than eight characters are rejected.
pub fn is_http_url(s: &str) -> bool {
    s.len() >= 8
        && s.get(..SCHEME.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SCHEME))
}

/// A parsed `http://host[:port][/path]` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl HttpUrl {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if !is_http_url(s) {
            return Err(HttpcError::Url(format!("not an http:// URL: {s:?}")));
        }

        let rest = &s[SCHEME.len()..];
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.split_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| HttpcError::Url(format!("invalid port {port_str:?} in {s:?}")))?;
                (host, port)
            }
            None => (authority, DEFAULT_HTTP_PORT),
        };

        if host.is_empty() {
            return Err(HttpcError::Url(format!("missing host in {s:?}")));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// Value for the `Host` request header: the port only when non-default.
    pub fn host_header(&self) -> String {
        if self.port == DEFAULT_HTTP_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Absolute form, as used on a proxied request line.
    pub fn absolute(&self) -> String {
        format!("http://{}{}", self.host_header(), self.path)
    }

    /// Resolve a `Location` value or playlist entry against this URL.
    pub fn join(&self, reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if is_http_url(reference) {
            return Self::parse(reference);
        }
        if reference.is_empty() || reference.contains("://") {
            return Err(HttpcError::Url(format!("cannot follow {reference:?}")));
        }

        let path = if reference.starts_with('/') {
            reference.to_string()
        } else {
            let dir = match self.path.split('?').next().and_then(|p| p.rfind('/')) {
                Some(i) => &self.path[..=i],
                None => "/",
            };
            format!("{dir}{reference}")
        };

        Ok(Self {
            host: self.host.clone(),
            port: self.port,
            path,
        })
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.absolute())
    }
}
