//! Capacity planning: how many sub-byte values a carrier can take, computed
//! before any write happens.
//!
//! A carrier exposes *slots* (pixels, or unused palette entries).  Each slot
//! holds one byte as three sub-byte values.  The framed stream must be
//! strictly smaller than the capacity, so the last slot is always left
//! unused.

use serde::Serialize;

use crate::bits::VALUES_PER_BYTE;
use crate::carrier::Carrier;
use crate::error::StegoError;

/// Maximum number of entries in a pre-encoding list.
pub const DEFAULT_MAX_PRE_ENCODINGS: usize = 5;
/// Bytes the extractor reads before giving up on finding a terminator.
pub const DEFAULT_MAX_HEADER_LEN: usize = 512;
/// Palette entries an indexed frame can address with a `u8` index.
pub const MAX_PALETTE_SLOTS: usize = 256;

/// Codec tunables.  Embed and extract must use the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecLimits {
    pub max_pre_encodings: usize,
    pub max_header_len:    usize,
    /// Palette slots at or above this index are never used.
    pub max_palette_slots: usize,
    /// Skip palette slots whose colour reads back as `0x00`.  Needed for GIF
    /// encoders that collapse such entries when re-serializing.
    pub skip_zero_slots:   bool,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_pre_encodings: DEFAULT_MAX_PRE_ENCODINGS,
            max_header_len:    DEFAULT_MAX_HEADER_LEN,
            max_palette_slots: MAX_PALETTE_SLOTS,
            skip_zero_slots:   true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capacity {
    /// Embeddable slots (pixels or usable palette entries).
    pub slots:  usize,
    /// Sub-byte values those slots can hold.
    pub values: usize,
}

impl Capacity {
    pub fn from_slots(slots: usize) -> Self {
        Self { slots, values: slots * VALUES_PER_BYTE }
    }

    /// Largest framed stream, in bytes, that still passes [`validate`].
    pub fn max_framed_bytes(&self) -> usize {
        self.slots.saturating_sub(1)
    }

    /// Largest pre-encoded payload that fits next to a `header_len`-byte header.
    pub fn max_payload_bytes(&self, header_len: usize) -> usize {
        self.max_framed_bytes().saturating_sub(header_len)
    }
}

/// Count the sub-byte slots `carrier` offers under `limits`.
pub fn plan(carrier: &Carrier, limits: &CodecLimits) -> Capacity {
    let capacity = carrier.capacity(limits);
    tracing::debug!(kind = carrier.kind().name(), slots = capacity.slots, values = capacity.values, "planned capacity");
    capacity
}

/// Fail unless `framed_values` is strictly below the capacity.
pub fn validate(capacity: Capacity, framed_values: usize) -> Result<(), StegoError> {
    if framed_values >= capacity.values {
        return Err(StegoError::PayloadTooLarge { required: framed_values, available: capacity.values });
    }
    Ok(())
}
