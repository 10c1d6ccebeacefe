//! Request composition and proxy routing

use crate::config::ProxyConfig;
use crate::http::url::HttpUrl;

/// Where the socket connects for a given URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub host: String,
    pub port: u16,
    pub via_proxy: bool,
}

impl Route {
    pub fn for_url(url: &HttpUrl, proxy: Option<&ProxyConfig>) -> Self {
        match proxy {
            Some(proxy) => match proxy.bypass_for(&url.host) {
                Some(domain) => {
                    tracing::debug!("{domain} matches {}, no proxy", url.host);
                    Self::direct(url)
                }
                None => Self {
                    host: proxy.host.clone(),
                    port: proxy.port,
                    via_proxy: true,
                },
            },
            None => Self::direct(url),
        }
    }

    fn direct(url: &HttpUrl) -> Self {
        Self {
            host: url.host.clone(),
            port: url.port,
            via_proxy: false,
        }
    }
}

/// Render the GET request for `url`.
///
/// Proxied requests use the absolute-URL request target. A `Range` header is
/// only sent when resuming from a non-zero offset.
pub fn compose_request(url: &HttpUrl, via_proxy: bool, start_byte: u64, user_agent: &str) -> String {
    let target = if via_proxy {
        url.absolute()
    } else {
        url.path.clone()
    };

    let mut req = format!(
        "GET {target} HTTP/1.1\r\n\
         Host: {}\r\n\
         User-Agent: {user_agent}\r\n\
         Icy-MetaData: 1\r\n",
        url.host_header()
    );
    if start_byte != 0 {
        req.push_str(&format!("Range: bytes={start_byte}-\r\n"));
    }
    req.push_str("Connection: close\r\n\r\n");
    req
}
