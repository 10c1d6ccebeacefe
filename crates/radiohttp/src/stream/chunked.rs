//! Chunked transfer-coding reader

use std::io::{self, Read};

use crate::config::limits::MAX_CHUNK_SIZE;
use crate::error::{HttpcError, Result};
use crate::net::{read_bytes, read_line};

/// Decoder state for a chunked body
#[derive(Debug, Default)]
pub struct ChunkState {
    buf: Vec<u8>,
    pos: usize,
    end_of_data: bool,
}

impl ChunkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn end_of_data(&self) -> bool {
        self.end_of_data
    }

    /// Bytes of the current chunk not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Drop the current chunk buffer.
    pub fn release(&mut self) {
        self.buf = Vec::new();
        self.pos = 0;
    }

    /// Fill `out` from the chunk stream.
    ///
    /// Returns fewer bytes than requested only at end of data. The next chunk
    /// is fetched only while `out` still has room; bytes of a short final
    /// chunk are still handed out.
    pub fn read<R: Read + ?Sized>(&mut self, src: &mut R, out: &mut [u8], max_line_len: usize) -> Result<usize> {
        let mut filled = 0;
        while filled < out.len() && !(self.end_of_data && self.buffered() == 0) {
            let available = self.buffered();
            if available > 0 {
                let n = available.min(out.len() - filled);
                out[filled..filled + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
                self.pos += n;
                filled += n;
                continue;
            }
            self.next_chunk(src, max_line_len)?;
        }
        Ok(filled)
    }

    fn next_chunk<R: Read + ?Sized>(&mut self, src: &mut R, max_line_len: usize) -> Result<()> {
        self.release();

        let line = read_line(src, max_line_len)?;
        let size = parse_chunk_size(&line.text).ok_or_else(|| {
            HttpcError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed chunk size line {:?}", line.text),
            ))
        })?;

        if size > MAX_CHUNK_SIZE {
            return Err(HttpcError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("chunk of {size} bytes exceeds limit of {MAX_CHUNK_SIZE}"),
            )));
        }

        if size == 0 {
            tracing::debug!("end of chunked data");
            self.end_of_data = true;
            return Ok(());
        }

        tracing::trace!("chunk size = {size}");
        let mut chunk = vec![0u8; size];
        let n = read_bytes(src, &mut chunk)?;
        if n < size {
            tracing::warn!("premature end of chunk: got {n} of {size} bytes");
            chunk.truncate(n);
            self.end_of_data = true;
        } else {
            // CRLF after the chunk data
            read_line(src, max_line_len)?;
        }
        self.buf = chunk;
        Ok(())
    }
}

/// Parse a chunk-size line: hexadecimal, `;` extensions ignored.
pub fn parse_chunk_size(line: &str) -> Option<usize> {
    let size = line.split(';').next().unwrap_or("").trim();
    if size.is_empty() {
        return None;
    }
    usize::from_str_radix(size, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(body: &str) -> Cursor<Vec<u8>> {
        Cursor::new(body.as_bytes().to_vec())
    }

    // --- parse_chunk_size ---

    #[test]
    fn chunk_size_hex() {
        assert_eq!(parse_chunk_size("4"), Some(4));
        assert_eq!(parse_chunk_size("1A"), Some(26));
        assert_eq!(parse_chunk_size("ff"), Some(255));
        assert_eq!(parse_chunk_size("0"), Some(0));
    }

    #[test]
    fn chunk_size_extension_ignored() {
        assert_eq!(parse_chunk_size("10;name=value"), Some(16));
        assert_eq!(parse_chunk_size("5 ; ext"), Some(5));
    }

    #[test]
    fn chunk_size_invalid() {
        assert_eq!(parse_chunk_size(""), None);
        assert_eq!(parse_chunk_size("zz"), None);
    }

    // --- read ---

    #[test]
    fn wikipedia_example() {
        let mut src = source("4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
        let mut state = ChunkState::new();
        let mut out = [0u8; 64];
        let n = state.read(&mut src, &mut out, 1024).unwrap();
        assert_eq!(&out[..n], b"Wikipedia");
        assert!(state.end_of_data());
        assert_eq!(state.read(&mut src, &mut out, 1024).unwrap(), 0);
    }

    #[test]
    fn small_reads_across_chunk_boundaries() {
        let mut src = source("4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
        let mut state = ChunkState::new();
        let mut collected = Vec::new();
        let mut out = [0u8; 3];
        loop {
            let n = state.read(&mut src, &mut out, 1024).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&out[..n]);
        }
        assert_eq!(collected, b"Wikipedia");
    }

    #[test]
    fn does_not_fetch_ahead_when_full() {
        let mut src = source("4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
        let mut state = ChunkState::new();
        let mut out = [0u8; 4];
        assert_eq!(state.read(&mut src, &mut out, 1024).unwrap(), 4);
        assert_eq!(&out, b"Wiki");
        // Next chunk header still unread
        assert_eq!(src.position(), 9);
    }

    #[test]
    fn zero_chunk_terminates_regardless_of_trailing_data() {
        let mut src = source("3\r\nabc\r\n0\r\n\r\n5\r\nextra\r\n");
        let mut state = ChunkState::new();
        let mut out = [0u8; 64];
        let n = state.read(&mut src, &mut out, 1024).unwrap();
        assert_eq!(&out[..n], b"abc");
        assert_eq!(state.read(&mut src, &mut out, 1024).unwrap(), 0);
    }

    #[test]
    fn chunk_extensions_in_stream() {
        let mut src = source("3;foo=bar\r\nabc\r\n0\r\n\r\n");
        let mut state = ChunkState::new();
        let mut out = [0u8; 8];
        let n = state.read(&mut src, &mut out, 1024).unwrap();
        assert_eq!(&out[..n], b"abc");
    }

    #[test]
    fn premature_end_keeps_partial_chunk() {
        let mut src = source("a\r\n12345");
        let mut state = ChunkState::new();
        let mut out = [0u8; 16];
        let n = state.read(&mut src, &mut out, 1024).unwrap();
        assert_eq!(&out[..n], b"12345");
        assert!(state.end_of_data());
    }

    #[test]
    fn malformed_size_line_is_error() {
        let mut src = source("xyz\r\nabc\r\n");
        let mut state = ChunkState::new();
        let mut out = [0u8; 8];
        assert!(matches!(state.read(&mut src, &mut out, 1024), Err(HttpcError::Io(_))));
    }

    #[test]
    fn premature_end_across_small_reads() {
        let mut src = source("a\r\n12345");
        let mut state = ChunkState::new();
        let mut out = [0u8; 2];
        let mut collected = Vec::new();
        loop {
            let n = state.read(&mut src, &mut out, 1024).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&out[..n]);
        }
        assert_eq!(collected, b"12345");
    }

    #[test]
    fn oversized_chunk_rejected() {
        let mut state = ChunkState::new();
        let mut out = [0u8; 8];
        let mut src = source("FFFFFFFFFFFFFFFF\r\nabc\r\n");
        assert!(matches!(state.read(&mut src, &mut out, 1024), Err(HttpcError::Io(_))));

        let mut state = ChunkState::new();
        let mut src = source(&format!("{:x}\r\nabc\r\n", MAX_CHUNK_SIZE + 1));
        match state.read(&mut src, &mut out, 1024) {
            Err(HttpcError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn release_drops_buffer() {
        let mut src = source("8\r\n12345678\r\n0\r\n\r\n");
        let mut state = ChunkState::new();
        let mut out = [0u8; 2];
        state.read(&mut src, &mut out, 1024).unwrap();
        assert_eq!(state.buffered(), 6);
        state.release();
        assert_eq!(state.buffered(), 0);
    }
}
