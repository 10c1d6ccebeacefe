//! ICY streaming reader
//!
//! Open-ended bodies (Icecast/Shoutcast) optionally interleave a metadata
//! block after every `metaint` audio bytes:
//!
//! ```text
//! [metaint audio bytes][len byte][len * 16 metadata bytes][metaint audio bytes]...
//! ```
//!
//! The reader hands out audio only and routes the blocks to the sink.

use std::io::{self, Read};

use crate::error::{HttpcError, Result};
use crate::http::headers::HeaderSet;
use crate::net::read_bytes_partial;
use crate::stream::metadata::{parse_icy_block, MetadataSink};

/// Position relative to the metadata interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcyState {
    metaint: usize,
    since_meta: usize,
    pending: Option<PendingBlock>,
}

/// A metadata block whose bytes have only partly arrived
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingBlock {
    buf: Vec<u8>,
    filled: usize,
}

impl IcyState {
    pub fn new(metaint: u32) -> Self {
        Self {
            metaint: metaint as usize,
            since_meta: 0,
            pending: None,
        }
    }

    pub fn metaint(&self) -> usize {
        self.metaint
    }

    /// Audio bytes delivered since the last metadata block.
    pub fn since_meta(&self) -> usize {
        self.since_meta
    }

    /// Read audio bytes into `out`.
    ///
    /// Errors never escape: a live stream that stalls or drops reports the
    /// bytes delivered so far (possibly 0) as a benign end of data. Bytes
    /// consumed before a failed wait are always counted, so a later call
    /// resumes at the right place relative to the next metadata block.
    pub fn read<R: Read + ?Sized>(
        &mut self,
        src: &mut R,
        out: &mut [u8],
        sink: Option<&mut (dyn MetadataSink + '_)>,
        headers: &HeaderSet,
    ) -> usize {
        let (n, err) = if self.metaint == 0 {
            read_bytes_partial(src, out)
        } else {
            self.read_interleaved(src, out, sink, headers)
        };

        if let Some(e) = err {
            tracing::warn!("stream read stopped after {n} bytes: {e}");
        }
        n
    }

    /// Returns the audio byte count and the error that cut the read short, if any.
    fn read_interleaved<R: Read + ?Sized>(
        &mut self,
        src: &mut R,
        out: &mut [u8],
        mut sink: Option<&mut (dyn MetadataSink + '_)>,
        headers: &HeaderSet,
    ) -> (usize, Option<HttpcError>) {
        let mut filled = 0;
        while filled < out.len() {
            if self.since_meta == self.metaint {
                if let Err(e) = read_block(&mut self.pending, src, sink.as_deref_mut(), headers) {
                    return (filled, Some(e));
                }
                self.since_meta = 0;
            }

            let want = (out.len() - filled).min(self.metaint - self.since_meta);
            let (n, err) = read_bytes_partial(src, &mut out[filled..filled + want]);
            filled += n;
            self.since_meta += n;
            if err.is_some() {
                return (filled, err);
            }
            if n < want {
                break;
            }
        }
        (filled, None)
    }
}

/// Consume one metadata block at an interval boundary.
///
/// The length byte counts 16-byte units; zero means no metadata this time.
pub fn demux<R: Read + ?Sized>(
    src: &mut R,
    sink: Option<&mut (dyn MetadataSink + '_)>,
    headers: &HeaderSet,
) -> Result<()> {
    read_block(&mut None, src, sink, headers)
}

/// Read (or finish reading) the block at the boundary. On error the bytes
/// received so far stay in `pending`.
fn read_block<R: Read + ?Sized>(
    pending: &mut Option<PendingBlock>,
    src: &mut R,
    sink: Option<&mut (dyn MetadataSink + '_)>,
    headers: &HeaderSet,
) -> Result<()> {
    let mut block = match pending.take() {
        Some(block) => block,
        None => {
            let mut len_byte = [0u8; 1];
            let (n, err) = read_bytes_partial(src, &mut len_byte);
            if let Some(e) = err {
                return Err(e);
            }
            if n != 1 {
                return Err(unexpected_eof("stream ended before metadata length"));
            }
            let meta_len = len_byte[0] as usize * 16;
            if meta_len == 0 {
                return Ok(());
            }
            PendingBlock {
                buf: vec![0u8; meta_len],
                filled: 0,
            }
        }
    };

    let (n, err) = read_bytes_partial(src, &mut block.buf[block.filled..]);
    block.filled += n;
    if let Some(e) = err {
        *pending = Some(block);
        return Err(e);
    }
    if block.filled < block.buf.len() {
        return Err(unexpected_eof("stream ended inside metadata block"));
    }

    if let Some(sink) = sink {
        let mut meta = parse_icy_block(&block.buf);
        tracing::debug!("metadata block ({} bytes): {:?}", block.buf.len(), meta.stream_title());
        meta.append_header_fields(headers);
        sink.on_metadata(meta);
    }
    Ok(())
}

fn unexpected_eof(msg: &'static str) -> HttpcError {
    HttpcError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, msg))
}
