//! Carriers: the decoded image data a payload is hidden in.
//!
//! Two shapes, one interface:
//!
//! | Variant | Slot | Slot order |
//! |---------|------|------------|
//! | [`PixelGrid`] | one pixel, channels 0..3 | row-major |
//! | [`IndexedFrames`] | one palette entry no pixel references | frame order, then ascending index |
//!
//! Each slot carries exactly one framed byte as three sub-byte values.  Both
//! variants implement [`StegoSurface`]; [`Carrier`] dispatches to them and the
//! extraction driver is shared.

use serde::Serialize;

use crate::capacity::{self, Capacity, CodecLimits};
use crate::error::StegoError;
use crate::header::{Header, HeaderScanner};

pub mod palette;
pub mod pixel;

pub use palette::{FrameMeta, IndexedFrame, IndexedFrames, LoopCount};
pub use pixel::PixelGrid;

// ── Surface trait ────────────────────────────────────────────────────────────

/// One embedding strategy.
///
/// `write_values` may assume `capacity` and `preflight` have already passed
/// for the same `values` and `limits`; [`Carrier::embed`] guarantees this.
pub trait StegoSurface {
    /// Number of slots that can hold a byte.
    fn slot_count(&self, limits: &CodecLimits) -> usize;

    fn capacity(&self, limits: &CodecLimits) -> Capacity {
        Capacity::from_slots(self.slot_count(limits))
    }

    /// Strategy-specific checks on the framed values.  Must not mutate.
    fn preflight(&self, _values: &[u8], _limits: &CodecLimits) -> Result<(), StegoError> {
        Ok(())
    }

    /// Write sub-byte values into consecutive slots.
    fn write_values(&mut self, values: &[u8], limits: &CodecLimits);

    /// Bytes read back from every slot, in slot order.
    fn recovered_bytes<'a>(&'a self, limits: &'a CodecLimits) -> Box<dyn Iterator<Item = u8> + 'a>;
}

// ── Carrier ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierKind {
    Pixel,
    Palette,
}

impl CarrierKind {
    pub fn name(self) -> &'static str {
        match self {
            CarrierKind::Pixel   => "pixel",
            CarrierKind::Palette => "palette",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Carrier {
    Pixels(PixelGrid),
    Indexed(IndexedFrames),
}

impl Carrier {
    pub fn kind(&self) -> CarrierKind {
        match self {
            Carrier::Pixels(_)  => CarrierKind::Pixel,
            Carrier::Indexed(_) => CarrierKind::Palette,
        }
    }

    fn surface(&self) -> &dyn StegoSurface {
        match self {
            Carrier::Pixels(p)  => p,
            Carrier::Indexed(f) => f,
        }
    }

    fn surface_mut(&mut self) -> &mut dyn StegoSurface {
        match self {
            Carrier::Pixels(p)  => p,
            Carrier::Indexed(f) => f,
        }
    }

    pub fn capacity(&self, limits: &CodecLimits) -> Capacity {
        self.surface().capacity(limits)
    }

    /// Embed a framed sub-byte sequence in place.
    ///
    /// Capacity and strategy checks run first; on `Err` the carrier is
    /// unchanged.
    pub fn embed(&mut self, values: &[u8], limits: &CodecLimits) -> Result<(), StegoError> {
        let capacity = capacity::plan(self, limits);
        capacity::validate(capacity, values.len())?;
        self.surface().preflight(values, limits)?;
        self.surface_mut().write_values(values, limits);
        tracing::debug!(kind = self.kind().name(), values = values.len(), "embedded framed stream");
        Ok(())
    }

    /// Recover the header and the still pre-encoded payload bytes.
    pub fn extract(&self, limits: &CodecLimits) -> Result<(Header, Vec<u8>), StegoError> {
        extract_from(self.surface(), limits)
    }

    /// Read only the header, without requiring the payload to be complete.
    pub fn header(&self, limits: &CodecLimits) -> Result<Header, StegoError> {
        let mut bytes = self.surface().recovered_bytes(limits);
        scan_header(&mut bytes, limits)
    }
}

impl From<PixelGrid> for Carrier {
    fn from(p: PixelGrid) -> Self { Carrier::Pixels(p) }
}

impl From<IndexedFrames> for Carrier {
    fn from(f: IndexedFrames) -> Self { Carrier::Indexed(f) }
}

// ── Extraction driver ────────────────────────────────────────────────────────

/// Read bytes from `surface` until a header is complete, then exactly
/// `header.size` more.
pub fn extract_from(surface: &dyn StegoSurface, limits: &CodecLimits) -> Result<(Header, Vec<u8>), StegoError> {
    let mut bytes = surface.recovered_bytes(limits);
    let header = scan_header(&mut bytes, limits)?;

    let payload: Vec<u8> = bytes.take(header.size).collect();
    if payload.len() < header.size {
        return Err(StegoError::IncompleteMessage { expected: header.size, recovered: payload.len() });
    }
    Ok((header, payload))
}

fn scan_header(bytes: &mut dyn Iterator<Item = u8>, limits: &CodecLimits) -> Result<Header, StegoError> {
    let mut scanner = HeaderScanner::new(limits.max_header_len);
    for b in bytes {
        if scanner.push(b)? {
            break;
        }
    }
    let header = scanner.into_header().ok_or(StegoError::HeaderNotFound)?;
    tracing::debug!(size = header.size, source_type = %header.source_type, "found header");
    Ok(header)
}
