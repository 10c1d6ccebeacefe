//! Response head parsing
//!
//! Reads the status line and the header block into a [`HeaderSet`]. Only a
//! fixed vocabulary of fields gets typed accessors; every field is kept in
//! arrival order for diagnostics.

use std::collections::HashMap;
use std::io::Read;

use crate::error::HeaderError;
use crate::net::{read_line, Line, LineEnd};

/// Parsed status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub code: Option<u16>,
}

impl StatusLine {
    /// Parse `HTTP/1.0 NNN ...`, `HTTP/1.1 NNN ...` or Shoutcast's `ICY NNN ...`.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_ascii_whitespace();
        let code = match parts.next() {
            Some("HTTP/1.0" | "HTTP/1.1" | "ICY") => parts
                .next()
                .filter(|c| c.len() == 3)
                .and_then(|c| c.parse::<u16>().ok()),
            _ => None,
        };
        Self {
            text: text.to_string(),
            code,
        }
    }

    fn class(&self) -> Option<u16> {
        self.code.map(|c| c / 100)
    }

    pub fn is_success(&self) -> bool {
        self.class() == Some(2)
    }

    pub fn is_partial(&self) -> bool {
        self.code == Some(206)
    }

    pub fn is_redirect(&self) -> bool {
        self.class() == Some(3)
    }

    pub fn is_client_error(&self) -> bool {
        self.class() == Some(4)
    }

    pub fn is_server_error(&self) -> bool {
        self.class() == Some(5)
    }
}

/// Header fields with typed meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Location,
    ContentLength,
    ContentType,
    TransferEncoding,
    IcyMetaint,
    IcyBitrate,
    IcyGenre,
    IcyName,
    IcyDescription,
}

impl HeaderField {
    pub fn from_name(name: &str) -> Option<Self> {
        const NAMES: [(&str, HeaderField); 9] = [
            ("location", HeaderField::Location),
            ("content-length", HeaderField::ContentLength),
            ("content-type", HeaderField::ContentType),
            ("transfer-encoding", HeaderField::TransferEncoding),
            ("icy-metaint", HeaderField::IcyMetaint),
            ("icy-br", HeaderField::IcyBitrate),
            ("icy-genre", HeaderField::IcyGenre),
            ("icy-name", HeaderField::IcyName),
            ("icy-description", HeaderField::IcyDescription),
        ];
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, field)| *field)
    }

    pub fn name(self) -> &'static str {
        match self {
            HeaderField::Location => "location",
            HeaderField::ContentLength => "content-length",
            HeaderField::ContentType => "content-type",
            HeaderField::TransferEncoding => "transfer-encoding",
            HeaderField::IcyMetaint => "icy-metaint",
            HeaderField::IcyBitrate => "icy-br",
            HeaderField::IcyGenre => "icy-genre",
            HeaderField::IcyName => "icy-name",
            HeaderField::IcyDescription => "icy-description",
        }
    }
}

/// Response status plus header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSet {
    status: StatusLine,
    values: HashMap<HeaderField, String>,
    raw: Vec<(String, String)>,
    content_length: Option<u64>,
    metaint: Option<u32>,
    bitrate: Option<u32>,
}

impl HeaderSet {
    pub fn new(status: StatusLine) -> Self {
        Self {
            status,
            values: HashMap::new(),
            raw: Vec::new(),
            content_length: None,
            metaint: None,
            bitrate: None,
        }
    }

    /// Read a complete response head from `src`.
    ///
    /// 4xx and 5xx statuses fail immediately after the status line, carrying
    /// the status text.
    pub fn read_from<R: Read + ?Sized>(src: &mut R, max_len: usize) -> Result<Self, HeaderError> {
        let line = read_line(src, max_len)?;
        check_length(&line)?;
        if line.is_empty() {
            return Err(HeaderError::MalformedStatus(line.text));
        }

        let status = StatusLine::parse(&line.text);
        tracing::debug!("status: {}", status.text);
        if status.is_client_error() {
            return Err(HeaderError::ClientError { status: status.text });
        }
        if status.is_server_error() {
            return Err(HeaderError::ServerError { status: status.text });
        }
        if status.code.is_none() {
            return Err(HeaderError::MalformedStatus(status.text));
        }

        let mut headers = Self::new(status);
        loop {
            let line = read_line(src, max_len)?;
            check_length(&line)?;
            if line.is_empty() {
                break;
            }
            headers.push_line(&line.text)?;
            if line.end == LineEnd::Eof {
                break;
            }
        }
        Ok(headers)
    }

    /// Apply one header line: a new `Name: value` field or a folded
    /// continuation of the previous one.
    pub fn push_line(&mut self, line: &str) -> Result<(), HeaderError> {
        if line.starts_with([' ', '\t']) {
            let (name, value) = self
                .raw
                .last_mut()
                .ok_or_else(|| HeaderError::Malformed(line.to_string()))?;
            value.push(' ');
            value.push_str(line.trim_matches([' ', '\t']));
            let (name, value) = (name.clone(), value.clone());
            return self.apply(&name, value);
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HeaderError::Malformed(line.to_string()))?;
        let name = name.trim_matches([' ', '\t']).to_string();
        let value = value.trim_matches([' ', '\t']).to_string();
        self.raw.push((name.clone(), value.clone()));
        self.apply(&name, value)
    }

    fn apply(&mut self, name: &str, value: String) -> Result<(), HeaderError> {
        tracing::debug!("header {name:?} = {value:?}");
        let Some(field) = HeaderField::from_name(name) else {
            return Ok(());
        };
        match field {
            HeaderField::ContentLength => {
                self.content_length = Some(leading_int(&value).ok_or_else(|| invalid(field, &value))?);
            }
            HeaderField::IcyMetaint => {
                let n = leading_int(&value).ok_or_else(|| invalid(field, &value))?;
                self.metaint = Some(u32::try_from(n).map_err(|_| invalid(field, &value))?);
            }
            HeaderField::IcyBitrate => {
                let n = leading_int(&value)
                    .or_else(|| value.strip_prefix("Quality").and_then(leading_int))
                    .ok_or_else(|| invalid(field, &value))?;
                self.bitrate = Some(u32::try_from(n).map_err(|_| invalid(field, &value))?);
            }
            _ => {}
        }
        self.values.insert(field, value);
        Ok(())
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn get(&self, field: HeaderField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Every field as received, unrecognized names included.
    pub fn raw_fields(&self) -> &[(String, String)] {
        &self.raw
    }

    pub fn location(&self) -> Option<&str> {
        self.get(HeaderField::Location)
    }

    /// Declared body length: `None` when absent, `Some(0)` for an empty body.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub(crate) fn set_content_length(&mut self, length: Option<u64>) {
        self.content_length = length;
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get(HeaderField::ContentType)
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.get(HeaderField::TransferEncoding)
    }

    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding()
            .is_some_and(|te| te.eq_ignore_ascii_case("chunked"))
    }

    pub fn metaint(&self) -> Option<u32> {
        self.metaint
    }

    pub fn bitrate(&self) -> Option<u32> {
        self.bitrate
    }

    pub fn icy_genre(&self) -> Option<&str> {
        self.get(HeaderField::IcyGenre)
    }

    pub fn icy_name(&self) -> Option<&str> {
        self.get(HeaderField::IcyName)
    }

    pub fn icy_description(&self) -> Option<&str> {
        self.get(HeaderField::IcyDescription)
    }

    /// Status line followed by every received field, one per line.
    pub fn describe(&self) -> String {
        let mut out = self.status.text.clone();
        for (name, value) in &self.raw {
            out.push('\n');
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
        }
        out
    }
}

fn check_length(line: &Line) -> Result<(), HeaderError> {
    if line.end == LineEnd::Truncated {
        Err(HeaderError::LineTooLong)
    } else {
        Ok(())
    }
}

fn invalid(field: HeaderField, value: &str) -> HeaderError {
    HeaderError::InvalidValue {
        field: field.name(),
        value: value.to_string(),
    }
}

/// Parse the leading decimal digits of `s`, ignoring leading blanks and
/// anything after the number.
fn leading_int(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}
