//! Stream metadata types and ICY block parsing
//!
//! Metadata reaches the caller through a [`MetadataSink`]: once when the
//! session is established (from the `icy-*` response headers) and again at
//! every non-empty in-band block.

use crossbeam_channel::Sender;

use crate::http::headers::HeaderSet;

/// Origin of a metadata event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    Headers,
    Icy,
}

/// One `key = value` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub key: String,
    pub value: String,
}

/// A metadata event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub fields: Vec<MetadataField>,
    pub source: MetadataSource,
}

impl StreamMetadata {
    pub fn new(source: MetadataSource) -> Self {
        Self {
            fields: Vec::new(),
            source,
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push(MetadataField {
            key: key.into(),
            value: value.into(),
        });
    }

    /// First value stored under `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key.eq_ignore_ascii_case(key))
            .map(|f| f.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Non-empty `StreamTitle`, trimmed.
    pub fn stream_title(&self) -> Option<&str> {
        self.get("StreamTitle").map(str::trim).filter(|t| !t.is_empty())
    }

    /// Artist part of an `Artist - Title` stream title.
    pub fn artist(&self) -> Option<&str> {
        self.stream_title().and_then(|t| split_artist_title(t).0)
    }

    /// Title part of the stream title; the whole title when there is no artist.
    pub fn title(&self) -> Option<&str> {
        self.stream_title().and_then(|t| split_artist_title(t).1)
    }

    /// Event built from the station headers of a response.
    pub fn from_headers(headers: &HeaderSet) -> Self {
        let mut meta = Self::new(MetadataSource::Headers);
        meta.append_header_fields(headers);
        meta
    }

    /// Append `Icy-Name`, `Icy-Genre` and `Icy-Description` from the response
    /// headers, whether or not the block already carries such keys.
    pub fn append_header_fields(&mut self, headers: &HeaderSet) {
        if let Some(name) = headers.icy_name() {
            self.push("Icy-Name", name);
        }
        if let Some(genre) = headers.icy_genre() {
            self.push("Icy-Genre", genre);
        }
        if let Some(description) = headers.icy_description() {
            self.push("Icy-Description", description);
        }
    }
}

/// Split on the first ` - `: "Artist - Title" gives (Some("Artist"), Some("Title")).
/// Without a separator the whole string is the title.
pub fn split_artist_title(raw: &str) -> (Option<&str>, Option<&str>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (None, None);
    }
    fn non_empty(s: &str) -> Option<&str> {
        let s = s.trim();
        (!s.is_empty()).then_some(s)
    }
    match raw.split_once(" - ") {
        Some((artist, title)) => match (non_empty(artist), non_empty(title)) {
            (Some(artist), Some(title)) => (Some(artist), Some(title)),
            _ => (None, Some(raw)),
        },
        None => (None, Some(raw)),
    }
}

/// Parse a raw in-band metadata block.
///
/// Blocks look like `StreamTitle='Artist - Song';StreamUrl='';` and are
/// NUL-padded to a multiple of 16 bytes. A value runs to the next `';`, so
/// titles containing a lone quote survive.
pub fn parse_icy_block(raw_block: &[u8]) -> StreamMetadata {
    let end = raw_block.iter().position(|&b| b == 0).unwrap_or(raw_block.len());
    let text = String::from_utf8_lossy(&raw_block[..end]);

    let mut meta = StreamMetadata::new(MetadataSource::Icy);
    let mut rest = text.trim();
    while let Some((key, after)) = rest.split_once("='") {
        let (value, next) = match after.find("';") {
            Some(i) => (&after[..i], &after[i + 2..]),
            None => (after.strip_suffix('\'').unwrap_or(after), ""),
        };
        let key = key.rsplit(';').next().unwrap_or(key).trim();
        if !key.is_empty() {
            meta.push(key, value);
        }
        rest = next;
    }
    meta
}

/// Receives metadata events from a session
pub trait MetadataSink: Send {
    fn on_metadata(&mut self, metadata: StreamMetadata);
}

/// Channel sink; a dropped receiver silently discards events.
impl MetadataSink for Sender<StreamMetadata> {
    fn on_metadata(&mut self, metadata: StreamMetadata) {
        let _ = self.send(metadata);
    }
}

impl<F> MetadataSink for F
where
    F: FnMut(StreamMetadata) + Send,
{
    fn on_metadata(&mut self, metadata: StreamMetadata) {
        self(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::StatusLine;

    fn headers(lines: &[&str]) -> HeaderSet {
        let mut h = HeaderSet::new(StatusLine::parse("ICY 200 OK"));
        for line in lines {
            h.push_line(line).unwrap();
        }
        h
    }

    // --- split_artist_title ---

    #[test]
    fn split_with_separator() {
        assert_eq!(
            split_artist_title("Pink Floyd - Comfortably Numb"),
            (Some("Pink Floyd"), Some("Comfortably Numb"))
        );
    }

    #[test]
    fn split_without_separator() {
        assert_eq!(split_artist_title("Just A Title"), (None, Some("Just A Title")));
        assert_eq!(split_artist_title("Artist-Title"), (None, Some("Artist-Title")));
    }

    #[test]
    fn split_multiple_separators_takes_first() {
        assert_eq!(split_artist_title("A - B - C"), (Some("A"), Some("B - C")));
    }

    #[test]
    fn split_dangling_separator() {
        assert_eq!(split_artist_title("Artist - "), (None, Some("Artist -")));
        assert_eq!(split_artist_title(" - Title"), (None, Some("- Title")));
    }

    #[test]
    fn split_empty() {
        assert_eq!(split_artist_title("   "), (None, None));
    }

    #[test]
    fn split_unicode() {
        assert_eq!(
            split_artist_title("ΠΑΝΟΣ ΚΙΑΜΟΣ - ΘΑ ΜΕ ΖΗΤΑΣ - 2022"),
            (Some("ΠΑΝΟΣ ΚΙΑΜΟΣ"), Some("ΘΑ ΜΕ ΖΗΤΑΣ - 2022"))
        );
    }

    // --- parse_icy_block ---

    #[test]
    fn parse_standard_block() {
        let mut block = b"StreamTitle='Pink Floyd - Comfortably Numb';StreamUrl='';".to_vec();
        block.resize(64, 0);
        let meta = parse_icy_block(&block);
        assert_eq!(meta.source, MetadataSource::Icy);
        assert_eq!(meta.fields.len(), 2);
        assert_eq!(meta.stream_title(), Some("Pink Floyd - Comfortably Numb"));
        assert_eq!(meta.get("streamurl"), Some(""));
        assert_eq!(meta.artist(), Some("Pink Floyd"));
        assert_eq!(meta.title(), Some("Comfortably Numb"));
    }

    #[test]
    fn parse_title_with_quote() {
        let meta = parse_icy_block(b"StreamTitle='It's Alright';");
        assert_eq!(meta.stream_title(), Some("It's Alright"));
    }

    #[test]
    fn parse_unterminated_value() {
        let meta = parse_icy_block(b"StreamTitle='No Closing");
        assert_eq!(meta.stream_title(), Some("No Closing"));
    }

    #[test]
    fn parse_all_nul_block_is_empty() {
        assert!(parse_icy_block(&[0u8; 32]).is_empty());
        assert!(parse_icy_block(&[]).is_empty());
    }

    #[test]
    fn parse_non_utf8_block() {
        let mut block = vec![0xFF, 0xFE];
        block.extend_from_slice(b";StreamTitle='Fallback';");
        block.resize(48, 0);
        let meta = parse_icy_block(&block);
        assert_eq!(meta.stream_title(), Some("Fallback"));
    }

    #[test]
    fn empty_title_is_none() {
        let meta = parse_icy_block(b"StreamTitle='';");
        assert_eq!(meta.get("StreamTitle"), Some(""));
        assert_eq!(meta.stream_title(), None);
        assert_eq!(meta.artist(), None);
    }

    // --- header fields ---

    #[test]
    fn from_headers_in_fixed_order() {
        let h = headers(&[
            "icy-description: Smooth",
            "icy-genre: Jazz",
            "icy-name: Test FM",
        ]);
        let meta = StreamMetadata::from_headers(&h);
        assert_eq!(meta.source, MetadataSource::Headers);
        let keys: Vec<&str> = meta.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["Icy-Name", "Icy-Genre", "Icy-Description"]);
    }

    #[test]
    fn from_headers_without_station_fields() {
        let meta = StreamMetadata::from_headers(&headers(&["content-type: audio/mpeg"]));
        assert!(meta.is_empty());
    }

    #[test]
    fn header_fields_are_appended_not_overridden() {
        let mut meta = parse_icy_block(b"StreamTitle='Song';Icy-Name='In band';");
        meta.append_header_fields(&headers(&["icy-name: From header"]));
        let names: Vec<&str> = meta
            .fields
            .iter()
            .filter(|f| f.key == "Icy-Name")
            .map(|f| f.value.as_str())
            .collect();
        assert_eq!(names, vec!["In band", "From header"]);
        assert_eq!(meta.get("icy-name"), Some("In band"));
    }

    // --- sinks ---

    #[test]
    fn channel_sink_delivers() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sink = tx;
        sink.on_metadata(parse_icy_block(b"StreamTitle='A';"));
        assert_eq!(rx.try_recv().unwrap().stream_title(), Some("A"));
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded::<StreamMetadata>();
        drop(rx);
        let mut sink = tx;
        sink.on_metadata(StreamMetadata::new(MetadataSource::Icy));
    }

    #[test]
    fn closure_sink_delivers() {
        let mut seen = Vec::new();
        {
            let mut sink = |m: StreamMetadata| seen.push(m.source);
            sink.on_metadata(StreamMetadata::new(MetadataSource::Headers));
        }
        assert_eq!(seen, vec![MetadataSource::Headers]);
    }
}
