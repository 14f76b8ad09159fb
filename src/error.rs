//! Error taxonomy for the embed/extract codec.
//!
//! Every failure is local and synchronous.  Checks that can fail on the embed
//! side run before the carrier is touched, so an `Err` never leaves a
//! half-written carrier behind.

use thiserror::Error;

use crate::transform::TransformError;

#[derive(Error, Debug)]
pub enum StegoError {
    /// Framed stream needs `required` sub-byte slots, carrier offers `available`.
    #[error("payload too large: needs {required} sub-byte slots, carrier has {available} (must be strictly fewer)")]
    PayloadTooLarge { required: usize, available: usize },
    #[error("unsupported carrier: {0}")]
    UnsupportedCarrierFormat(String),
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("no embedded header found")]
    HeaderNotFound,
    /// Header announced `expected` payload bytes, carrier ran out after `recovered`.
    #[error("incomplete message: header announced {expected} bytes, carrier held {recovered}")]
    IncompleteMessage { expected: usize, recovered: usize },
    #[error("truncated sub-byte stream: {len} values is not a multiple of 3")]
    TruncatedStream { len: usize },
    #[error("source type {0:?} cannot be stored in a header")]
    InvalidSourceType(String),
    /// Palette carriers skip slots that read back as 0x00, so they cannot hold one
    /// unless the zero-skip rule is off on both embed and extract.
    #[error("byte {offset} of the framed stream is 0x00, which a palette carrier skips; apply a base16/32/64/85 pre-encoding, or pass --no-zero-skip (skip_zero_slots = false) to both embed and extract, which gzip always needs")]
    ZeroByteInPaletteStream { offset: usize },
    #[error(transparent)]
    Transform(#[from] TransformError),
}
