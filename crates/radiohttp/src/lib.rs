//! radiohttp: streaming HTTP client for audio
//!
//! Opens plain-HTTP sessions to audio resources and hands out body bytes,
//! whatever the framing: fixed-length files, chunked responses, or ICY
//! (Icecast/Shoutcast) streams with interleaved metadata. Redirects and
//! M3U/PLS playlists are followed while opening; fixed-length resources can
//! be repositioned with a ranged reconnect.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::io::SeekFrom;
//! use radiohttp::{HttpSession, SessionConfig};
//!
//! let mut session = HttpSession::open("http://example.com/song.mp3", SessionConfig::default())?;
//! let mut buf = [0u8; 4096];
//! let n = session.read(&mut buf)?;
//! session.seek(SeekFrom::Start(1 << 20));
//! # Ok::<(), radiohttp::HttpcError>(())
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod stream;

pub use config::{ProxyConfig, SessionConfig, Timeouts};
pub use error::{HeaderError, HttpcError, Result};
pub use http::{is_http_url, HttpUrl};
pub use stream::{
    HttpSession, MetadataSink, MetadataSource, SessionBuilder, StreamMetadata, TransferMode,
};
