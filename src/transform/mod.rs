//! Pre-encoding registry: reversible byte transforms applied to a payload
//! before it is framed and embedded.
//!
//! # Identity rules
//! Every transform has exactly one canonical name.  That name is:
//!   - Written into the embedded header's pre-encoding list.
//!   - The only spelling the header parser accepts.
//!
//! Short aliases (`b64`, `r13`, ...) are an input convenience for the command
//! line only.  They are never written into a header.
//!
//! # Ordering
//! A pre-encoding list is applied left-to-right on embed and reversed
//! right-to-left on extract.  `gzip` may not be combined with anything else.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::Serialize;
use thiserror::Error;

use crate::capacity::CodecLimits;

pub mod base85;

// ── TransformId enum ─────────────────────────────────────────────────────────

/// Closed set of supported pre-encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformId {
    Rot13,
    Base16,
    Base32,
    Base64,
    Base85,
    Gzip,
}

impl TransformId {
    pub const ALL: [TransformId; 6] = [
        TransformId::Rot13,
        TransformId::Base16,
        TransformId::Base32,
        TransformId::Base64,
        TransformId::Base85,
        TransformId::Gzip,
    ];

    /// Canonical name, as written into the header.
    pub fn name(self) -> &'static str {
        match self {
            TransformId::Rot13  => "rot13",
            TransformId::Base16 => "base16",
            TransformId::Base32 => "base32",
            TransformId::Base64 => "base64",
            TransformId::Base85 => "base85",
            TransformId::Gzip   => "gzip",
        }
    }

    /// Parse a canonical name only.  Used when reading a header back.
    pub fn from_canonical(s: &str) -> Result<Self, TransformError> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| TransformError::Unknown { name: s.to_owned() })
    }

    /// Parse from a CLI string.  Accepts canonical names and short aliases.
    pub fn from_name(s: &str) -> Result<Self, TransformError> {
        match s.trim().to_lowercase().as_str() {
            "rot13"  | "r13"         => Ok(TransformId::Rot13),
            "base16" | "b16" | "hex" => Ok(TransformId::Base16),
            "base32" | "b32"         => Ok(TransformId::Base32),
            "base64" | "b64"         => Ok(TransformId::Base64),
            "base85" | "b85"         => Ok(TransformId::Base85),
            "gzip"   | "gz"          => Ok(TransformId::Gzip),
            _ => Err(TransformError::Unknown { name: s.to_owned() }),
        }
    }

    /// Parse a list of CLI entries, each of which may itself be a
    /// comma-separated list (`--pre-encoding b16,b64 --pre-encoding rot13`).
    pub fn parse_list<S: AsRef<str>>(entries: &[S]) -> Result<Vec<Self>, TransformError> {
        entries
            .iter()
            .flat_map(|e| e.as_ref().split(','))
            .filter(|s| !s.trim().is_empty())
            .map(Self::from_name)
            .collect()
    }
}

impl std::fmt::Display for TransformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Unknown pre-encoding '{name}'")]
    Unknown { name: String },
    #[error("{name} encode failed: {reason}")]
    Encode { name: &'static str, reason: String },
    #[error("{name} decode failed: {reason}")]
    Decode { name: &'static str, reason: String },
    #[error("Too many pre-encodings ({count}), maximum is {max}")]
    TooMany { count: usize, max: usize },
    #[error("gzip cannot be combined with other pre-encodings")]
    GzipNotExclusive,
}

// ── Transform trait ──────────────────────────────────────────────────────────

pub trait Transform: Send + Sync {
    fn transform_id(&self) -> TransformId;
    fn forward(&self, data: &[u8]) -> Result<Vec<u8>, TransformError>;
    fn inverse(&self, data: &[u8]) -> Result<Vec<u8>, TransformError>;
}

fn decode_err<E: std::fmt::Display>(id: TransformId) -> impl FnOnce(E) -> TransformError {
    move |e| TransformError::Decode { name: id.name(), reason: e.to_string() }
}

// ── Built-in transform implementations ──────────────────────────────────────

pub struct Rot13;
impl Rot13 {
    fn rotate(b: u8) -> u8 {
        match b {
            b'a'..=b'z' => (b - b'a' + 13) % 26 + b'a',
            b'A'..=b'Z' => (b - b'A' + 13) % 26 + b'A',
            _ => b,
        }
    }
}
impl Transform for Rot13 {
    fn transform_id(&self) -> TransformId { TransformId::Rot13 }
    fn forward(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        Ok(data.iter().copied().map(Self::rotate).collect())
    }
    // Rotating by 13 twice is the identity.
    fn inverse(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        self.forward(data)
    }
}

pub struct Base16;
impl Transform for Base16 {
    fn transform_id(&self) -> TransformId { TransformId::Base16 }
    fn forward(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        Ok(hex::encode(data).into_bytes())
    }
    fn inverse(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        hex::decode(data).map_err(decode_err(TransformId::Base16))
    }
}

pub struct Base32;
impl Transform for Base32 {
    fn transform_id(&self) -> TransformId { TransformId::Base32 }
    fn forward(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        Ok(data_encoding::BASE32.encode(data).into_bytes())
    }
    fn inverse(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        data_encoding::BASE32.decode(data).map_err(decode_err(TransformId::Base32))
    }
}

pub struct Base64;
impl Transform for Base64 {
    fn transform_id(&self) -> TransformId { TransformId::Base64 }
    fn forward(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        Ok(STANDARD.encode(data).into_bytes())
    }
    fn inverse(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        STANDARD.decode(data).map_err(decode_err(TransformId::Base64))
    }
}

pub struct Base85;
impl Transform for Base85 {
    fn transform_id(&self) -> TransformId { TransformId::Base85 }
    fn forward(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        Ok(base85::encode(data))
    }
    fn inverse(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        base85::decode(data).map_err(decode_err(TransformId::Base85))
    }
}

pub struct Gzip;
impl Transform for Gzip {
    fn transform_id(&self) -> TransformId { TransformId::Gzip }
    fn forward(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        let encode_err = |e: std::io::Error| TransformError::Encode {
            name:   TransformId::Gzip.name(),
            reason: e.to_string(),
        };
        let mut w = GzEncoder::new(Vec::new(), Compression::default());
        w.write_all(data).map_err(encode_err)?;
        w.finish().map_err(encode_err)
    }
    fn inverse(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        let mut out = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(decode_err(TransformId::Gzip))?;
        Ok(out)
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a TransformId to a built-in transform.
pub fn get_transform(id: TransformId) -> Box<dyn Transform> {
    match id {
        TransformId::Rot13  => Box::new(Rot13),
        TransformId::Base16 => Box::new(Base16),
        TransformId::Base32 => Box::new(Base32),
        TransformId::Base64 => Box::new(Base64),
        TransformId::Base85 => Box::new(Base85),
        TransformId::Gzip   => Box::new(Gzip),
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// Check a pre-encoding list against the length limit and gzip exclusivity.
///
/// [`apply`] assumes this has already passed; it does not re-check.
pub fn validate_list(ops: &[TransformId], limits: &CodecLimits) -> Result<(), TransformError> {
    if ops.len() > limits.max_pre_encodings {
        return Err(TransformError::TooMany { count: ops.len(), max: limits.max_pre_encodings });
    }
    if ops.len() > 1 && ops.contains(&TransformId::Gzip) {
        return Err(TransformError::GzipNotExclusive);
    }
    Ok(())
}

/// Run `payload` through every transform's `forward`, left to right.
pub fn apply(payload: &[u8], ops: &[TransformId]) -> Result<Vec<u8>, TransformError> {
    ops.iter().try_fold(payload.to_vec(), |acc, &id| {
        let out = get_transform(id).forward(&acc)?;
        tracing::trace!(transform = id.name(), input = acc.len(), output = out.len(), "pre-encoded");
        Ok(out)
    })
}

/// Undo [`apply`]: run every transform's `inverse`, right to left.
pub fn reverse(payload: &[u8], ops: &[TransformId]) -> Result<Vec<u8>, TransformError> {
    ops.iter().rev().try_fold(payload.to_vec(), |acc, &id| {
        get_transform(id).inverse(&acc)
    })
}
