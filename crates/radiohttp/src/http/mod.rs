//! HTTP/1.x client protocol pieces: URLs, requests and response heads

pub mod headers;
pub mod request;
pub mod url;

pub use headers::{HeaderField, HeaderSet, StatusLine};
pub use request::{compose_request, Route};
pub use url::{is_http_url, HttpUrl};
