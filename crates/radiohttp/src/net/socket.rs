//! Timeout-bounded socket primitives
//!
//! Each wait on the socket is bounded by the timeout armed on the transport
//! at connect time; a wait that expires surfaces as [`HttpcError::Timeout`].

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use crate::config::Timeouts;
use crate::error::{HttpcError, Result};

/// A connected byte stream owned by a session
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Opens transports to `host:port`
pub trait Connector: Send {
    fn connect(&self, host: &str, port: u16, timeouts: &Timeouts) -> io::Result<Box<dyn Transport>>;
}

impl<C: Connector + Sync + ?Sized> Connector for std::sync::Arc<C> {
    fn connect(&self, host: &str, port: u16, timeouts: &Timeouts) -> io::Result<Box<dyn Transport>> {
        (**self).connect(host, port, timeouts)
    }
}

/// Plain TCP connector
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16, timeouts: &Timeouts) -> io::Result<Box<dyn Transport>> {
        let stream = connect_with_timeout(host, port, timeouts)?;
        Ok(Box::new(stream))
    }
}

/// Resolve `host` and connect to the first address that answers within the
/// connect timeout, then arm the per-wait read/write timeouts.
pub fn connect_with_timeout(host: &str, port: u16, timeouts: &Timeouts) -> io::Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?
        .collect();

    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address for {host}"),
        ));
    }

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeouts.connect) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeouts.io))?;
                stream.set_write_timeout(Some(timeouts.io))?;
                tracing::debug!("connected to {host}:{port} ({addr})");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!("connect to {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::TimedOut)))
}

/// Read until `buf` is full or the peer closes.
///
/// Returns the number of bytes read; fewer than `buf.len()` only when the
/// peer closed the connection. Bytes received before a failed wait are lost;
/// use [`read_bytes_partial`] where they must be accounted for.
pub fn read_bytes<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    match read_bytes_partial(src, buf) {
        (n, None) => Ok(n),
        (_, Some(e)) => Err(e),
    }
}

/// Like [`read_bytes`], but reports the bytes already placed in `buf`
/// alongside the error that stopped the read.
pub fn read_bytes_partial<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> (usize, Option<HttpcError>) {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (filled, Some(HttpcError::from_io(e))),
        }
    }
    (filled, None)
}

/// How a line read by [`read_line`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    Newline,
    Nul,
    Eof,
    Truncated,
}

/// One line read from the socket, terminator removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub end: LineEnd,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Read one LF-terminated line of at most `max_len` bytes.
///
/// A CR directly before the LF is stripped. An embedded NUL or a peer close
/// also ends the line.
pub fn read_line<R: Read + ?Sized>(src: &mut R, max_len: usize) -> Result<Line> {
    let mut bytes = Vec::with_capacity(64);
    let mut byte = [0u8; 1];

    let end = loop {
        if bytes.len() >= max_len {
            break LineEnd::Truncated;
        }
        match src.read(&mut byte) {
            Ok(0) => break LineEnd::Eof,
            Ok(_) => match byte[0] {
                b'\n' => {
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                    break LineEnd::Newline;
                }
                0 => break LineEnd::Nul,
                b => bytes.push(b),
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HttpcError::from_io(e)),
        }
    };

    Ok(Line {
        text: String::from_utf8_lossy(&bytes).into_owned(),
        end,
    })
}

/// Write all of `buf`.
pub fn write_bytes<W: Write + ?Sized>(dst: &mut W, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match dst.write(&buf[written..]) {
            Ok(0) => return Err(HttpcError::Io(io::Error::from(io::ErrorKind::WriteZero))),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HttpcError::from_io(e)),
        }
    }
    dst.flush().map_err(HttpcError::from_io)
}
