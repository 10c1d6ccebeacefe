//! Error types for radiohttp
//!
//! Centralized error handling using thiserror. Every failure exit of the
//! session state machine maps to one of the result codes in [`HttpcError::code`].

use std::io;

use thiserror::Error;

/// Main error type for HTTP sessions
#[derive(Error, Debug)]
pub enum HttpcError {
    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("{}", friendly_connect_error(.host, .port, .source))]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    #[error("Redirect error: {0}")]
    Redirect(String),

    #[error("Socket I/O timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("Session closed")]
    Closed,
}

/// Failures while reading or interpreting the response head
#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("client error: {status}")]
    ClientError { status: String },

    #[error("server error: {status}")]
    ServerError { status: String },

    #[error("malformed status line: {0:?}")]
    MalformedStatus(String),

    #[error("malformed header line: {0:?}")]
    Malformed(String),

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("header line too long")]
    LineTooLong,

    #[error("timed out reading headers")]
    Timeout,

    #[error("I/O error reading headers: {0}")]
    Io(io::Error),
}

/// Result type alias for radiohttp
pub type Result<T> = std::result::Result<T, HttpcError>;

impl HttpcError {
    /// Integer result code reported to callers that only surface a number.
    pub fn code(&self) -> i32 {
        match self {
            HttpcError::Url(_) => -1,
            HttpcError::Connection { .. } => -2,
            HttpcError::Header(_) => -3,
            HttpcError::Redirect(_) => -4,
            HttpcError::Timeout | HttpcError::Io(_) => -5,
            HttpcError::Closed => -6,
        }
    }

    /// Whether reopening the session could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HttpcError::Connection { .. } | HttpcError::Timeout | HttpcError::Io(_)
        )
    }

    /// Classify a raw socket error from steady-state I/O.
    pub(crate) fn from_io(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => HttpcError::Timeout,
            _ => HttpcError::Io(e),
        }
    }
}

impl From<HttpcError> for HeaderError {
    /// Socket failures while the head is being read belong to the header stage.
    fn from(e: HttpcError) -> Self {
        match e {
            HttpcError::Timeout => HeaderError::Timeout,
            HttpcError::Io(e) => HeaderError::Io(e),
            HttpcError::Header(h) => h,
            other => HeaderError::Io(io::Error::other(other.to_string())),
        }
    }
}

impl From<HttpcError> for io::Error {
    fn from(e: HttpcError) -> Self {
        match e {
            HttpcError::Io(e) => e,
            HttpcError::Timeout => io::Error::new(io::ErrorKind::TimedOut, "socket I/O timed out"),
            HttpcError::Closed => io::Error::new(io::ErrorKind::NotConnected, "session closed"),
            HttpcError::Connection { source, .. } => source,
            other => io::Error::other(other),
        }
    }
}

fn friendly_connect_error(host: &str, port: &u16, e: &io::Error) -> String {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            format!("Connection to {host}:{port} timed out")
        }
        io::ErrorKind::NotFound => format!("Could not resolve {host}"),
        _ => format!("Could not connect to {host}:{port}: {e}"),
    }
}
