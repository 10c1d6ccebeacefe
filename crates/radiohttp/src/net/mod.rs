//! Socket layer
//!
//! Transports, connectors and the timeout-bounded read/write primitives the
//! session builds on.

pub mod socket;

pub use socket::{
    connect_with_timeout, read_bytes, read_bytes_partial, read_line, write_bytes, Connector, Line,
    LineEnd, TcpConnector, Transport,
};
