//! HTTP session controller
//!
//! Opens a connection (following redirects and playlists), classifies the
//! body into a [`TransferMode`] and exposes one read interface over all
//! three modes. Fixed-length resources can be repositioned with
//! [`HttpSession::seek`], which reopens the connection with a `Range` request
//! on the next read.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use crate::config::SessionConfig;
use crate::error::{HeaderError, HttpcError, Result};
use crate::http::headers::HeaderSet;
use crate::http::request::{compose_request, Route};
use crate::http::url::HttpUrl;
use crate::net::{read_bytes, read_bytes_partial, write_bytes, Connector, TcpConnector, Transport};
use crate::stream::chunked::ChunkState;
use crate::stream::detect_format_hint;
use crate::stream::icy::IcyState;
use crate::stream::metadata::{MetadataSink, StreamMetadata};
use crate::stream::playlist::{read_playlist_target, PlaylistKind};

const SKIP_CHUNK_SIZE: usize = 8 * 1024;

/// How the response body is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Exactly `length` bytes
    Fixed { length: u64 },
    /// Hex-size-prefixed chunks ending with a zero-size chunk
    Chunked,
    /// Open-ended; metadata blocks every `metaint` bytes when non-zero
    Streaming { metaint: u32 },
}

impl TransferMode {
    /// Classify a response: a known non-zero length wins, then chunked
    /// transfer-coding, otherwise an open-ended stream.
    pub fn classify(headers: &HeaderSet) -> Self {
        match headers.content_length() {
            Some(length) if length > 0 => TransferMode::Fixed { length },
            _ if headers.is_chunked() => TransferMode::Chunked,
            _ => TransferMode::Streaming {
                metaint: headers.metaint().unwrap_or(0),
            },
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Fixed { length } => write!(f, "fixed-length ({length} bytes)"),
            TransferMode::Chunked => f.write_str("chunked"),
            TransferMode::Streaming { metaint: 0 } => f.write_str("stream"),
            TransferMode::Streaming { metaint } => write!(f, "stream (metadata every {metaint} bytes)"),
        }
    }
}

enum Connection {
    Active(Box<dyn Transport>),
    /// Dropped by a seek; reopened by the next read
    Pending,
    Closed,
}

/// Result of the connect/redirect loop
struct Established {
    url: HttpUrl,
    transport: Box<dyn Transport>,
    headers: HeaderSet,
}

/// Builder for [`HttpSession`]
pub struct SessionBuilder {
    config: SessionConfig,
    connector: Box<dyn Connector>,
    sink: Option<Box<dyn MetadataSink>>,
    start_byte: u64,
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            connector: Box::new(TcpConnector),
            sink: None,
            start_byte: 0,
        }
    }

    /// Replace the TCP connector (tests, custom sockets).
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Box::new(connector);
        self
    }

    /// Bind a metadata sink.
    pub fn metadata_sink(mut self, sink: impl MetadataSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Resume a fixed-length resource from `offset`.
    pub fn start_at(mut self, offset: u64) -> Self {
        self.start_byte = offset;
        self
    }

    pub fn open(self, url: &str) -> Result<HttpSession> {
        let Self {
            config,
            connector,
            sink,
            start_byte,
        } = self;

        let mut established = establish(connector.as_ref(), &config, url, start_byte)?;
        let mut mode = TransferMode::classify(&established.headers);
        let mut cursor = 0;

        if let TransferMode::Fixed { length } = mode {
            if start_byte > 0 {
                if established.headers.status().is_partial() {
                    let total = length.checked_add(start_byte).ok_or_else(|| {
                        HeaderError::InvalidValue {
                            field: "content-length",
                            value: length.to_string(),
                        }
                    })?;
                    established.headers.set_content_length(Some(total));
                    mode = TransferMode::Fixed { length: total };
                } else {
                    skip_prefix(&mut established.transport, start_byte.min(length))?;
                }
                cursor = start_byte.min(length_of(mode));
            }
        }

        tracing::debug!("HTTP session opened to {}, {mode}", established.url);

        let icy = match mode {
            TransferMode::Streaming { metaint } => IcyState::new(metaint),
            _ => IcyState::new(0),
        };

        let mut session = HttpSession {
            config,
            connector,
            sink,
            origin_url: url.trim().to_string(),
            effective_url: established.url,
            conn: Connection::Active(established.transport),
            headers: established.headers,
            mode,
            cursor,
            chunks: ChunkState::new(),
            icy,
        };
        session.emit_header_metadata();
        Ok(session)
    }
}

/// A single-owner HTTP session for one audio resource
pub struct HttpSession {
    config: SessionConfig,
    connector: Box<dyn Connector>,
    sink: Option<Box<dyn MetadataSink>>,
    origin_url: String,
    effective_url: HttpUrl,
    conn: Connection,
    headers: HeaderSet,
    mode: TransferMode,
    cursor: u64,
    chunks: ChunkState,
    icy: IcyState,
}

impl HttpSession {
    /// Open `url` over plain TCP without a metadata sink.
    pub fn open(url: &str, config: SessionConfig) -> Result<Self> {
        SessionBuilder::new(config).open(url)
    }

    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// URL the session was opened with.
    pub fn origin_url(&self) -> &str {
        &self.origin_url
    }

    /// URL actually serving the body, after redirects and playlists.
    pub fn effective_url(&self) -> &HttpUrl {
        &self.effective_url
    }

    /// Whether a connection is currently open.
    pub fn is_active(&self) -> bool {
        matches!(self.conn, Connection::Active(_))
    }

    pub fn format_hint(&self) -> Option<&'static str> {
        detect_format_hint(&self.effective_url.path, self.headers.content_type())
    }

    /// Read body bytes into `buf`; 0 means end of data.
    ///
    /// Streaming mode never fails: read errors on a live stream end the
    /// current read early instead.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if matches!(self.conn, Connection::Closed) {
            return Err(HttpcError::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        match self.mode {
            TransferMode::Fixed { length } => self.read_fixed(buf, length),
            TransferMode::Chunked => {
                let Connection::Active(transport) = &mut self.conn else {
                    return Err(HttpcError::Closed);
                };
                self.chunks.read(transport, buf, self.config.max_line_len)
            }
            TransferMode::Streaming { .. } => {
                let Connection::Active(transport) = &mut self.conn else {
                    return Err(HttpcError::Closed);
                };
                Ok(self.icy.read(transport, buf, self.sink.as_deref_mut(), &self.headers))
            }
        }
    }

    fn read_fixed(&mut self, buf: &mut [u8], length: u64) -> Result<usize> {
        let remaining = length.saturating_sub(self.cursor);
        if remaining == 0 {
            return Ok(0);
        }
        if matches!(self.conn, Connection::Pending) {
            self.reconnect(length)?;
        }
        let Connection::Active(transport) = &mut self.conn else {
            return Err(HttpcError::Closed);
        };

        let want = remaining.min(buf.len() as u64) as usize;
        let (n, err) = read_bytes_partial(transport, &mut buf[..want]);
        self.cursor += n as u64;
        match err {
            Some(e) if n == 0 => Err(e),
            // Hand out what arrived; a persistent failure shows up on the next read
            Some(e) => {
                tracing::debug!("fixed-length read stopped after {n} bytes: {e}");
                Ok(n)
            }
            None => Ok(n),
        }
    }

    /// Current position; `None` unless the resource has a fixed length.
    pub fn tell(&self) -> Option<u64> {
        match self.mode {
            TransferMode::Fixed { .. } => Some(self.cursor),
            _ => None,
        }
    }

    /// Reposition within a fixed-length resource.
    ///
    /// The target is clamped to `[0, length]`. Returns `None` for chunked and
    /// streaming sessions and for closed sessions. A target equal to the
    /// current position leaves the connection untouched; any other target
    /// drops it and the next read reconnects with a `Range` request.
    pub fn seek(&mut self, pos: SeekFrom) -> Option<u64> {
        let TransferMode::Fixed { length } = self.mode else {
            return None;
        };
        if matches!(self.conn, Connection::Closed) {
            return None;
        }

        let target = match pos {
            SeekFrom::Start(offset) => offset.min(length),
            SeekFrom::Current(delta) => offset_from(self.cursor, delta, length),
            SeekFrom::End(delta) => offset_from(length, delta, length),
        };

        if target == self.cursor {
            tracing::trace!("seek to current position {target}, no-op");
            return Some(self.cursor);
        }

        if self.is_active() {
            tracing::debug!("closing connection for seek to {target}");
        }
        self.conn = Connection::Pending;
        self.cursor = target;
        Some(target)
    }

    /// Release the connection and any chunk buffer. Later reads fail with
    /// [`HttpcError::Closed`].
    pub fn close(&mut self) {
        if self.is_active() {
            tracing::debug!("closing HTTP connection to {}", self.effective_url);
        }
        self.conn = Connection::Closed;
        self.chunks.release();
    }

    fn reconnect(&mut self, length: u64) -> Result<()> {
        tracing::debug!("reopening {} at byte {}", self.effective_url, self.cursor);
        let url = self.effective_url.absolute();
        let mut established = establish(self.connector.as_ref(), &self.config, &url, self.cursor)
            .inspect_err(|e| tracing::warn!("HTTP session reopen failed: {e}"))?;

        let partial = established.headers.status().is_partial();
        match TransferMode::classify(&established.headers) {
            TransferMode::Chunked => {
                return Err(HeaderError::InvalidValue {
                    field: "transfer-encoding",
                    value: established
                        .headers
                        .transfer_encoding()
                        .unwrap_or_default()
                        .to_string(),
                }
                .into());
            }
            TransferMode::Streaming { .. } => {
                tracing::warn!("reopened {url} without a content length, reading {length} bytes");
            }
            TransferMode::Fixed { length: served } => {
                let expected = if partial { length - self.cursor } else { length };
                if served != expected {
                    tracing::warn!("reopened {url} serves {served} bytes, expected {expected}");
                }
            }
        }

        if !partial {
            skip_prefix(&mut established.transport, self.cursor)?;
        }
        // Partial responses carry only the remaining length
        established.headers.set_content_length(Some(length));

        self.effective_url = established.url;
        self.headers = established.headers;
        self.conn = Connection::Active(established.transport);
        self.emit_header_metadata();
        Ok(())
    }

    fn emit_header_metadata(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_metadata(StreamMetadata::from_headers(&self.headers));
        }
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl Read for HttpSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        HttpSession::read(self, buf).map_err(io::Error::from)
    }
}

impl Seek for HttpSession {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        HttpSession::seek(self, pos).ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "seek needs a fixed-length resource")
        })
    }
}

impl fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSession")
            .field("origin_url", &self.origin_url)
            .field("effective_url", &self.effective_url)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Connect, send the request and read the head, following redirects and
/// playlists for at most `max_redirects` hops. Each hop drops the previous
/// connection before opening the next.
fn establish(
    connector: &dyn Connector,
    config: &SessionConfig,
    url: &str,
    start_byte: u64,
) -> Result<Established> {
    let mut target = HttpUrl::parse(url)?;
    let mut start_byte = start_byte;

    for hop in 0..=config.max_redirects {
        let route = Route::for_url(&target, config.proxy.as_ref());
        let connect_err = |source: io::Error| HttpcError::Connection {
            host: route.host.clone(),
            port: route.port,
            source,
        };

        let mut transport = connector
            .connect(&route.host, route.port, &config.timeouts)
            .map_err(connect_err)?;

        let request = compose_request(&target, route.via_proxy, start_byte, &config.user_agent);
        tracing::debug!(
            "GET {target} via {}:{} (hop {hop}, start byte {start_byte})",
            route.host,
            route.port
        );
        write_bytes(&mut transport, request.as_bytes()).map_err(|e| connect_err(e.into()))?;

        let headers = HeaderSet::read_from(&mut transport, config.max_line_len)?;

        if headers.status().is_redirect() {
            let location = headers.location().ok_or_else(|| {
                HttpcError::Redirect(format!("{} without a location", headers.status().text))
            })?;
            let next = target
                .join(location)
                .map_err(|e| HttpcError::Redirect(format!("unusable location {location:?}: {e}")))?;
            tracing::debug!("redirecting to {next}");
            drop(transport);
            target = next;
            start_byte = 0;
            continue;
        }

        if let Some(kind) = headers.content_type().and_then(PlaylistKind::from_content_type) {
            let next = read_playlist_target(&mut transport, kind, &target, config.max_line_len)?;
            drop(transport);
            target = next;
            start_byte = 0;
            continue;
        }

        return Ok(Established {
            url: target,
            transport,
            headers,
        });
    }

    Err(HttpcError::Redirect(format!(
        "gave up after {} redirects",
        config.max_redirects
    )))
}

/// Discard `count` body bytes from a server that ignored the `Range` request.
fn skip_prefix(transport: &mut Box<dyn Transport>, count: u64) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    tracing::warn!("server ignored range request, skipping {count} bytes");
    let mut scratch = vec![0u8; SKIP_CHUNK_SIZE];
    let mut left = count;
    while left > 0 {
        let want = left.min(SKIP_CHUNK_SIZE as u64) as usize;
        let n = read_bytes(transport, &mut scratch[..want])?;
        if n < want {
            return Err(HttpcError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "body ended before resume offset",
            )));
        }
        left -= n as u64;
    }
    Ok(())
}

fn offset_from(base: u64, delta: i64, length: u64) -> u64 {
    let target = if delta >= 0 {
        base.saturating_add(delta as u64)
    } else {
        base.saturating_sub(delta.unsigned_abs())
    };
    target.min(length)
}

fn length_of(mode: TransferMode) -> u64 {
    match mode {
        TransferMode::Fixed { length } => length,
        _ => 0,
    }
}
