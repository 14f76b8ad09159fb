//! High-level embed/extract API, the primary library surface.
//!
//! ```no_run
//! use steggo::container;
//! use steggo::stego::{self, EmbedOptions};
//! use steggo::transform::TransformId;
//!
//! // Embed
//! let mut loaded = container::load("avatar.png")?;
//! let opts = EmbedOptions { pre_encoding: vec![TransformId::Base64], ..EmbedOptions::default() };
//! stego::embed(&mut loaded.carrier, b"meet at noon", &opts)?;
//! container::save("output.png", &loaded.carrier, container::output_format(loaded.format))?;
//!
//! // Extract
//! let loaded = container::load("output.png")?;
//! let msg = stego::extract(&loaded.carrier, &opts.limits)?;
//! assert_eq!(msg.payload, b"meet at noon");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use serde::Serialize;

use crate::bits::{self, VALUES_PER_BYTE};
use crate::capacity::{self, Capacity, CodecLimits};
use crate::carrier::{Carrier, CarrierKind};
use crate::error::StegoError;
use crate::header::{Header, SOURCE_BINARY, SOURCE_TEXT, TERMINATOR};
use crate::transform::{self, TransformId};

// ── EmbedOptions ─────────────────────────────────────────────────────────────

/// Configuration for [`embed`].
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Written into the header; `txt` for literal text.
    pub source_type:  String,
    /// Applied left to right before framing.
    pub pre_encoding: Vec<TransformId>,
    pub limits:       CodecLimits,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            source_type:  SOURCE_TEXT.to_owned(),
            pre_encoding: Vec::new(),
            limits:       CodecLimits::default(),
        }
    }
}

impl EmbedOptions {
    /// Options for embedding the contents of `path`, tagged with its extension.
    pub fn for_file<P: AsRef<Path>>(path: P) -> Self {
        Self { source_type: source_type_for_path(path), ..Self::default() }
    }
}

/// Extension of `path` without the dot, or `bin` when it has none.
pub fn source_type_for_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(SOURCE_BINARY)
        .to_owned()
}

// ── Framing ──────────────────────────────────────────────────────────────────

/// Header bytes followed by the pre-encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedStream {
    pub header:     Header,
    pub header_len: usize,
    pub bytes:      Vec<u8>,
}

impl FramedStream {
    /// Sub-byte values the stream occupies in a carrier.
    pub fn value_count(&self) -> usize {
        self.bytes.len() * VALUES_PER_BYTE
    }

    pub fn values(&self) -> Vec<u8> {
        bits::split(&self.bytes)
    }
}

/// Pre-encode `payload` and prepend its header.
pub fn frame(payload: &[u8], opts: &EmbedOptions) -> Result<FramedStream, StegoError> {
    transform::validate_list(&opts.pre_encoding, &opts.limits)?;
    let encoded = transform::apply(payload, &opts.pre_encoding)?;
    let header = Header::new(encoded.len(), &opts.source_type, &opts.pre_encoding)?;

    let mut bytes = header.to_bytes();
    let header_len = bytes.len();
    bytes.extend_from_slice(&encoded);
    Ok(FramedStream { header, header_len, bytes })
}

// ── Embed ────────────────────────────────────────────────────────────────────

/// Summary of a successful [`embed`].
#[derive(Debug, Clone, Serialize)]
pub struct EmbedReport {
    pub kind:          CarrierKind,
    pub header:        Header,
    pub header_len:    usize,
    pub payload_len:   usize,
    pub framed_values: usize,
    pub capacity:      Capacity,
}

/// Hide `payload` in `carrier`.  On `Err` the carrier is unchanged.
pub fn embed(carrier: &mut Carrier, payload: &[u8], opts: &EmbedOptions) -> Result<EmbedReport, StegoError> {
    let framed = frame(payload, opts)?;
    let capacity = capacity::plan(carrier, &opts.limits);
    carrier.embed(&framed.values(), &opts.limits)?;

    tracing::info!(
        kind = carrier.kind().name(),
        payload = payload.len(),
        framed = framed.bytes.len(),
        slots = capacity.slots,
        "payload embedded"
    );
    Ok(EmbedReport {
        kind:          carrier.kind(),
        framed_values: framed.value_count(),
        header_len:    framed.header_len,
        header:        framed.header,
        payload_len:   payload.len(),
        capacity,
    })
}

// ── Extract ──────────────────────────────────────────────────────────────────

/// A recovered payload with the header it was framed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub header:  Header,
    /// Payload with every pre-encoding reversed.
    pub payload: Vec<u8>,
}

impl Extracted {
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// File name the payload should be written under, e.g. `message.txt`.
    ///
    /// The source type comes from the carrier, so anything other than ASCII
    /// alphanumerics, `.`, `-` and `_` is replaced with `_`. The result is
    /// always a single path component.
    pub fn file_name(&self) -> String {
        let ext: String = self
            .header
            .source_type
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        if ext.is_empty() {
            format!("message.{SOURCE_BINARY}")
        } else {
            format!("message.{ext}")
        }
    }
}

/// Recover the payload hidden in `carrier`.
pub fn extract(carrier: &Carrier, limits: &CodecLimits) -> Result<Extracted, StegoError> {
    let (header, encoded) = carrier.extract(limits)?;
    let payload = transform::reverse(&encoded, &header.pre_encoding)?;
    tracing::info!(kind = carrier.kind().name(), size = payload.len(), source_type = %header.source_type, "payload extracted");
    Ok(Extracted { header, payload })
}

/// Read the embedded header only.
pub fn inspect(carrier: &Carrier, limits: &CodecLimits) -> Result<Header, StegoError> {
    carrier.header(limits)
}

// ── Capacity report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CapacityReport {
    pub kind:              CarrierKind,
    pub capacity:          Capacity,
    /// Largest un-encoded text payload that fits behind a `txt` header.
    pub max_text_payload:  usize,
}

pub fn capacity_report(carrier: &Carrier, limits: &CodecLimits) -> CapacityReport {
    let capacity = capacity::plan(carrier, limits);
    CapacityReport {
        kind:             carrier.kind(),
        max_text_payload: max_plain_payload(capacity, SOURCE_TEXT),
        capacity,
    }
}

/// Largest payload, with no pre-encoding, that fits `capacity` behind a
/// header with the given source type.
pub fn max_plain_payload(capacity: Capacity, source_type: &str) -> usize {
    // size digits + ',' + source type + ',' + terminator
    let overhead = |n: usize| n.to_string().len() + source_type.len() + 2 + TERMINATOR.len();
    let budget = capacity.max_framed_bytes();
    if budget < overhead(0) {
        return 0;
    }
    // A header sized for the whole budget is never shorter than the real one.
    let mut n = capacity.max_payload_bytes(overhead(budget));
    while n + 1 + overhead(n + 1) <= budget {
        n += 1;
    }
    n
}
