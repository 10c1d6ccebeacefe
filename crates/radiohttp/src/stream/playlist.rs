//! Playlist indirection (M3U/PLS)
//!
//! A response whose content type names a playlist is not audio: its body
//! holds the URL of the actual stream.

use std::io::Read;

use crate::config::limits::MAX_PLAYLIST_LINES;
use crate::error::{HttpcError, Result};
use crate::http::url::HttpUrl;
use crate::net::{read_line, LineEnd};

/// Playlist formats followed while opening a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    M3u,
    Pls,
}

impl PlaylistKind {
    /// Match a `Content-Type` value, parameters ignored.
    ///
    /// HLS (`application/vnd.apple.mpegurl`) is not a redirection format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or("").trim();
        if mime.eq_ignore_ascii_case("audio/x-mpegurl") || mime.eq_ignore_ascii_case("audio/mpegurl") {
            Some(PlaylistKind::M3u)
        } else if mime.eq_ignore_ascii_case("audio/x-scpls") {
            Some(PlaylistKind::Pls)
        } else {
            None
        }
    }
}

/// Stream URL named by one playlist line, if any
pub fn entry_from_line(kind: PlaylistKind, line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match kind {
        PlaylistKind::M3u => (!line.starts_with('#')).then_some(line),
        PlaylistKind::Pls => {
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            (key.trim().to_ascii_lowercase().starts_with("file") && !value.is_empty()).then_some(value)
        }
    }
}

/// Read the playlist body until the first stream entry and resolve it
/// against the playlist URL.
pub fn read_playlist_target<R: Read + ?Sized>(
    src: &mut R,
    kind: PlaylistKind,
    base: &HttpUrl,
    max_line_len: usize,
) -> Result<HttpUrl> {
    for _ in 0..MAX_PLAYLIST_LINES {
        let line = read_line(src, max_line_len)?;
        if let Some(entry) = entry_from_line(kind, &line.text) {
            tracing::debug!("following {kind:?} playlist to {entry}");
            return base.join(entry);
        }
        if line.end == LineEnd::Eof {
            break;
        }
    }
    Err(HttpcError::Redirect(format!(
        "no stream URL in {kind:?} playlist at {base}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn base() -> HttpUrl {
        HttpUrl::parse("http://example.com/lists/radio.m3u").unwrap()
    }

    fn target(kind: PlaylistKind, body: &str) -> Result<HttpUrl> {
        read_playlist_target(&mut Cursor::new(body.as_bytes().to_vec()), kind, &base(), 1024)
    }

    // --- from_content_type ---

    #[test]
    fn content_type_m3u() {
        assert_eq!(PlaylistKind::from_content_type("audio/x-mpegurl"), Some(PlaylistKind::M3u));
        assert_eq!(PlaylistKind::from_content_type("Audio/X-MpegURL"), Some(PlaylistKind::M3u));
        assert_eq!(
            PlaylistKind::from_content_type("audio/mpegurl; charset=utf-8"),
            Some(PlaylistKind::M3u)
        );
    }

    #[test]
    fn content_type_pls() {
        assert_eq!(PlaylistKind::from_content_type("audio/x-scpls"), Some(PlaylistKind::Pls));
    }

    #[test]
    fn content_type_not_playlist() {
        assert_eq!(PlaylistKind::from_content_type("audio/mpeg"), None);
        assert_eq!(PlaylistKind::from_content_type("application/vnd.apple.mpegurl"), None);
        assert_eq!(PlaylistKind::from_content_type(""), None);
    }

    // --- entry_from_line ---

    #[test]
    fn m3u_skips_comments() {
        assert_eq!(entry_from_line(PlaylistKind::M3u, "#EXTM3U"), None);
        assert_eq!(entry_from_line(PlaylistKind::M3u, "  "), None);
        assert_eq!(
            entry_from_line(PlaylistKind::M3u, "http://s.example/live\r"),
            Some("http://s.example/live")
        );
    }

    #[test]
    fn pls_file_entries() {
        assert_eq!(entry_from_line(PlaylistKind::Pls, "[playlist]"), None);
        assert_eq!(entry_from_line(PlaylistKind::Pls, "NumberOfEntries=1"), None);
        assert_eq!(
            entry_from_line(PlaylistKind::Pls, "File1=http://s.example:8000/live"),
            Some("http://s.example:8000/live")
        );
        assert_eq!(entry_from_line(PlaylistKind::Pls, "File1="), None);
    }

    // --- read_playlist_target ---

    #[test]
    fn single_line_m3u() {
        let url = target(PlaylistKind::M3u, "http://stream.example.com:8000/live\n").unwrap();
        assert_eq!(url.host, "stream.example.com");
        assert_eq!(url.port, 8000);
        assert_eq!(url.path, "/live");
    }

    #[test]
    fn extended_m3u() {
        let url = target(
            PlaylistKind::M3u,
            "#EXTM3U\r\n#EXTINF:-1,Test Radio\r\nhttp://stream.example.com/live\r\n",
        )
        .unwrap();
        assert_eq!(url.absolute(), "http://stream.example.com/live");
    }

    #[test]
    fn relative_m3u_entry() {
        let url = target(PlaylistKind::M3u, "#EXTM3U\nstream/live.mp3\n").unwrap();
        assert_eq!(url.absolute(), "http://example.com/lists/stream/live.mp3");
    }

    #[test]
    fn pls_body() {
        let url = target(
            PlaylistKind::Pls,
            "[playlist]\nNumberOfEntries=2\nFile1=http://s1.example/live\nFile2=http://s2.example/live\n",
        )
        .unwrap();
        assert_eq!(url.host, "s1.example");
    }

    #[test]
    fn empty_playlist_is_redirect_error() {
        assert!(matches!(target(PlaylistKind::M3u, "#EXTM3U\n"), Err(HttpcError::Redirect(_))));
        assert!(matches!(target(PlaylistKind::Pls, ""), Err(HttpcError::Redirect(_))));
    }

    #[test]
    fn https_entry_is_url_error() {
        assert!(matches!(
            target(PlaylistKind::M3u, "https://secure.example/live\n"),
            Err(HttpcError::Url(_))
        ));
    }
}
