//! Self-delimiting header that precedes every embedded payload.
//!
//! # Wire format
//! ```text
//! <size>,<source_type>,<enc1>/<enc2>/...!/
//! ```
//! - `size`: decimal length of the pre-encoded payload (header excluded).
//! - `source_type`: extension of the payload file, `txt` for plain text.
//! - encoding list: canonical transform names joined by `/`, immediately
//!   followed by the terminator `!/`.  An empty list is just `!/`.
//!
//! Examples: `2,txt,!/` and `16,png,base16/base64!/`.
//!
//! The header is never pre-encoded.  An extractor does not know its length in
//! advance; it feeds recovered bytes into a [`HeaderScanner`] until the
//! stream ends with the terminator.

use serde::Serialize;

use crate::error::StegoError;
use crate::transform::TransformId;

pub const TERMINATOR: &[u8; 2] = b"!/";
pub const FIELD_SEP:  char = ',';
pub const LIST_SEP:   char = '/';

/// Source type recorded for literal text and standard input.
pub const SOURCE_TEXT: &str = "txt";
/// Source type recorded for input files without an extension.
pub const SOURCE_BINARY: &str = "bin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub size:         usize,
    pub source_type:  String,
    pub pre_encoding: Vec<TransformId>,
}

impl Header {
    pub fn new(size: usize, source_type: &str, pre_encoding: &[TransformId]) -> Result<Self, StegoError> {
        validate_source_type(source_type)?;
        Ok(Self {
            size,
            source_type:  source_type.to_owned(),
            pre_encoding: pre_encoding.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let list = self
            .pre_encoding
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join("/");
        let mut out = format!("{}{FIELD_SEP}{}{FIELD_SEP}{list}", self.size, self.source_type).into_bytes();
        out.extend_from_slice(TERMINATOR);
        out
    }

    /// Parse a complete header, terminator included.
    pub fn parse(bytes: &[u8]) -> Result<Self, StegoError> {
        let body = bytes
            .strip_suffix(TERMINATOR.as_slice())
            .ok_or_else(|| StegoError::MalformedHeader("missing terminator".into()))?;
        let text = std::str::from_utf8(body)
            .map_err(|_| StegoError::MalformedHeader("header is not valid UTF-8".into()))?;

        let fields: Vec<&str> = text.split(FIELD_SEP).collect();
        let [size, source_type, list] = fields[..] else {
            return Err(StegoError::MalformedHeader(format!(
                "expected 3 comma-separated fields, found {}", fields.len()
            )));
        };

        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StegoError::MalformedHeader(format!("size field {size:?} is not a non-negative integer")));
        }
        let size = size
            .parse::<usize>()
            .map_err(|e| StegoError::MalformedHeader(format!("size field {size:?}: {e}")))?;

        let pre_encoding = if list.is_empty() {
            Vec::new()
        } else {
            list.split(LIST_SEP)
                .map(TransformId::from_canonical)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self { size, source_type: source_type.to_owned(), pre_encoding })
    }

    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> usize {
        self.to_bytes().len()
    }
}

fn validate_source_type(source_type: &str) -> Result<(), StegoError> {
    let bad = source_type.contains(FIELD_SEP)
        || source_type.as_bytes().windows(2).any(|w| w == TERMINATOR)
        || source_type.ends_with('!');
    if bad {
        return Err(StegoError::InvalidSourceType(source_type.to_owned()));
    }
    Ok(())
}

/// Build the serialized header for a payload of `payload_len` pre-encoded bytes.
pub fn encode(payload_len: usize, source_type: &str, ops: &[TransformId]) -> Result<Vec<u8>, StegoError> {
    Ok(Header::new(payload_len, source_type, ops)?.to_bytes())
}

/// Return the header if `accumulated` ends with the terminator.
///
/// This is the whole-buffer form; extraction uses [`HeaderScanner`], which
/// gives the same answer one byte at a time.
pub fn scan(accumulated: &[u8]) -> Result<Option<Header>, StegoError> {
    if accumulated.ends_with(TERMINATOR) {
        Header::parse(accumulated).map(Some)
    } else {
        Ok(None)
    }
}

// ── Incremental scanner ──────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ScanState {
    Scanning { buffer: Vec<u8> },
    Found { header: Header, header_len: usize },
}

/// Feeds recovered bytes one at a time until a header is complete.
///
/// Only the last two buffered bytes are inspected per push, so a scan is
/// linear in the header length.
#[derive(Debug)]
pub struct HeaderScanner {
    state:   ScanState,
    max_len: usize,
}

impl HeaderScanner {
    pub fn new(max_len: usize) -> Self {
        Self { state: ScanState::Scanning { buffer: Vec::new() }, max_len }
    }

    /// Push one byte.  Returns `Ok(true)` the moment the header completes.
    ///
    /// Pushing after the header was found is a no-op returning `Ok(false)`.
    /// Fails with `HeaderNotFound` once `max_len` bytes were seen without a
    /// terminator, and with `MalformedHeader` if the terminated prefix does
    /// not parse.
    pub fn push(&mut self, byte: u8) -> Result<bool, StegoError> {
        let ScanState::Scanning { buffer } = &mut self.state else {
            return Ok(false);
        };
        buffer.push(byte);
        if buffer.ends_with(TERMINATOR) {
            let header = Header::parse(buffer)?;
            let header_len = buffer.len();
            self.state = ScanState::Found { header, header_len };
            return Ok(true);
        }
        if buffer.len() >= self.max_len {
            return Err(StegoError::HeaderNotFound);
        }
        Ok(false)
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn into_header(self) -> Option<Header> {
        match self.state {
            ScanState::Found { header, .. } => Some(header),
            ScanState::Scanning { .. }      => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::DEFAULT_MAX_HEADER_LEN;

    #[test]
    fn encode_plain_text_header() {
        assert_eq!(encode(2, "txt", &[]).unwrap(), b"2,txt,!/");
    }

    #[test]
    fn encode_with_pre_encoding() {
        let bytes = encode(1024, "png", &[TransformId::Base16, TransformId::Base32]).unwrap();
        assert_eq!(bytes, b"1024,png,base16/base32!/");
    }

    #[test]
    fn parse_roundtrip() {
        let h = Header::new(77, "pdf", &[TransformId::Rot13, TransformId::Base64]).unwrap();
        assert_eq!(Header::parse(&h.to_bytes()).unwrap(), h);
        assert_eq!(h.encoded_len(), "77,pdf,rot13/base64!/".len());
    }

    #[test]
    fn parse_empty_source_type() {
        let h = Header::parse(b"5,,!/").unwrap();
        assert_eq!(h.size, 5);
        assert_eq!(h.source_type, "");
        assert!(h.pre_encoding.is_empty());
    }

    #[test]
    fn scan_waits_for_terminator() {
        assert_eq!(scan(b"2,txt,").unwrap(), None);
        assert_eq!(scan(b"2,txt,!").unwrap(), None);
        let h = scan(b"2,txt,!/").unwrap().unwrap();
        assert_eq!(h, Header { size: 2, source_type: "txt".into(), pre_encoding: vec![] });
    }

    #[test]
    fn scan_rejects_malformed() {
        assert!(matches!(scan(b"2,txt!/"), Err(StegoError::MalformedHeader(_))));
        assert!(matches!(scan(b"2,a,b,!/"), Err(StegoError::MalformedHeader(_))));
        assert!(matches!(scan(b"-2,txt,!/"), Err(StegoError::MalformedHeader(_))));
        assert!(matches!(scan(b"x,txt,!/"), Err(StegoError::MalformedHeader(_))));
        assert!(matches!(scan(b",txt,!/"), Err(StegoError::MalformedHeader(_))));
        assert!(matches!(scan(b"99999999999999999999999,txt,!/"), Err(StegoError::MalformedHeader(_))));
    }

    #[test]
    fn scan_unknown_transform() {
        assert!(matches!(scan(b"3,txt,rot47!/"), Err(StegoError::Transform(_))));
    }

    #[test]
    fn source_type_validation() {
        assert!(matches!(encode(1, "a,b", &[]), Err(StegoError::InvalidSourceType(_))));
        assert!(matches!(encode(1, "a!/b", &[]), Err(StegoError::InvalidSourceType(_))));
        assert!(matches!(encode(1, "wow!", &[]), Err(StegoError::InvalidSourceType(_))));
        assert!(encode(1, "tar.gz", &[]).is_ok());
    }

    #[test]
    fn scanner_stops_at_first_terminator() {
        let mut stream = b"3,txt,base64!/".to_vec();
        stream.extend_from_slice(b"!/!/garbage,,,");
        let mut scanner = HeaderScanner::new(DEFAULT_MAX_HEADER_LEN);
        let mut found_at = None;
        for (i, &b) in stream.iter().enumerate() {
            if scanner.push(b).unwrap() {
                found_at = Some(i);
            }
        }
        assert_eq!(found_at, Some(13));
        let h = scanner.into_header().unwrap();
        assert_eq!(h.pre_encoding, vec![TransformId::Base64]);
    }

    #[test]
    fn scanner_matches_whole_buffer_scan() {
        let header = encode(4242, "zip", &[TransformId::Base85]).unwrap();
        let mut scanner = HeaderScanner::new(DEFAULT_MAX_HEADER_LEN);
        for (i, &b) in header.iter().enumerate() {
            let done = scanner.push(b).unwrap();
            assert_eq!(done, scan(&header[..=i]).unwrap().is_some());
        }
        match scanner.state() {
            ScanState::Found { header_len, .. } => assert_eq!(*header_len, header.len()),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn scanner_gives_up_after_limit() {
        let mut scanner = HeaderScanner::new(8);
        for &b in b"1234567" {
            assert!(!scanner.push(b).unwrap());
        }
        assert!(matches!(scanner.push(b'8'), Err(StegoError::HeaderNotFound)));
    }
}
