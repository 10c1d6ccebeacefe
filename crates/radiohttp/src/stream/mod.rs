//! Stream handling
//!
//! Opens HTTP sessions for audio resources, follows redirects and M3U/PLS
//! playlists, and reads the body in one of three transfer modes: fixed
//! length, chunked, or an open-ended ICY stream with in-band metadata.

pub mod chunked;
pub mod icy;
pub mod metadata;
pub mod playlist;
pub mod session;

pub use metadata::{MetadataField, MetadataSink, MetadataSource, StreamMetadata};
pub use playlist::PlaylistKind;
pub use session::{HttpSession, SessionBuilder, TransferMode};

/// Guess the audio container from the content type, falling back to the
/// path extension.
pub fn detect_format_hint(path: &str, content_type: Option<&str>) -> Option<&'static str> {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("audio/mpeg") || ct.contains("audio/mp3") {
            return Some("mp3");
        }
        if ct.contains("audio/aac") {
            return Some("aac");
        }
        if ct.contains("audio/ogg") || ct.contains("application/ogg") {
            return Some("ogg");
        }
        if ct.contains("audio/flac") {
            return Some("flac");
        }
        if ct.contains("audio/opus") {
            return Some("opus");
        }
    }

    let path = path.split('?').next().unwrap_or(path).to_ascii_lowercase();
    let (_, ext) = path.rsplit_once('.')?;
    match ext {
        "mp3" => Some("mp3"),
        "aac" | "adts" => Some("aac"),
        "ogg" | "oga" => Some("ogg"),
        "opus" => Some("opus"),
        "flac" => Some("flac"),
        "m4a" | "mp4" => Some("mp4"),
        _ => None,
    }
}
