//! Indexed (palette) carrier, e.g. an animated GIF.
//!
//! Changing a palette entry that any pixel references would change what the
//! frame looks like, so only entries no pixel in that frame uses are
//! written.  Each such slot takes one byte across its R, G and B components.
//!
//! # Zero-skip rule
//! With `CodecLimits::skip_zero_slots` set, a slot whose colour currently
//! reads back as `0x00` is skipped by both embedder and extractor.  The rule
//! depends only on the slot's colour, so both sides agree on any carrier
//! state.  To keep that true after embedding, a `0x00` framed byte is
//! rejected up front (`StegoError::ZeroByteInPaletteStream`).

use crate::bits::{self, VALUES_PER_BYTE};
use crate::capacity::{CodecLimits, MAX_PALETTE_SLOTS};
use crate::error::StegoError;

use super::StegoSurface;

/// Per-frame data a container needs to re-emit the frame unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameMeta {
    pub left:        u16,
    pub top:         u16,
    /// Hundredths of a second.
    pub delay:       u16,
    /// GIF disposal method code (0-3).
    pub dispose:     u8,
    pub transparent: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopCount {
    Infinite,
    /// Number of repeats after the first play.
    Finite(u16),
    #[default]
    Once,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFrame {
    pub width:   u16,
    pub height:  u16,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
    pub palette: Vec<[u8; 3]>,
    pub meta:    FrameMeta,
}

impl IndexedFrame {
    pub fn new(width: u16, height: u16, indices: Vec<u8>, palette: Vec<[u8; 3]>) -> Result<Self, StegoError> {
        if indices.len() != width as usize * height as usize {
            return Err(StegoError::UnsupportedCarrierFormat(format!(
                "{width}x{height} frame has {} palette indices", indices.len()
            )));
        }
        if palette.is_empty() || palette.len() > MAX_PALETTE_SLOTS {
            return Err(StegoError::UnsupportedCarrierFormat(format!(
                "frame palette has {} entries, expected 1..={MAX_PALETTE_SLOTS}", palette.len()
            )));
        }
        Ok(Self { width, height, indices, palette, meta: FrameMeta::default() })
    }

    pub fn with_meta(mut self, meta: FrameMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Palette indices no pixel references, ascending.
    pub fn unused_slots(&self, limits: &CodecLimits) -> Vec<usize> {
        let mut used = [false; MAX_PALETTE_SLOTS];
        for &i in &self.indices {
            used[i as usize] = true;
        }
        let end = self.palette.len().min(limits.max_palette_slots).min(MAX_PALETTE_SLOTS);
        (0..end).filter(|&slot| !used[slot]).collect()
    }

    /// Unused slots after the zero-skip rule, in visiting order.
    pub fn embeddable_slots(&self, limits: &CodecLimits) -> Vec<usize> {
        let mut slots = self.unused_slots(limits);
        if limits.skip_zero_slots {
            slots.retain(|&slot| bits::extract_triple(self.palette[slot]) != 0);
        }
        slots
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFrames {
    /// Logical screen size.
    pub width:      u16,
    pub height:     u16,
    pub frames:     Vec<IndexedFrame>,
    pub loop_count: LoopCount,
}

impl IndexedFrames {
    pub fn new(width: u16, height: u16, frames: Vec<IndexedFrame>) -> Result<Self, StegoError> {
        if frames.is_empty() {
            return Err(StegoError::UnsupportedCarrierFormat("indexed carrier has no frames".into()));
        }
        Ok(Self { width, height, frames, loop_count: LoopCount::default() })
    }

    pub fn with_loop_count(mut self, loop_count: LoopCount) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Embeddable slots of every frame, in frame order.
    pub fn slot_plan(&self, limits: &CodecLimits) -> Vec<Vec<usize>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            self.frames.par_iter().map(|f| f.embeddable_slots(limits)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.frames.iter().map(|f| f.embeddable_slots(limits)).collect()
        }
    }
}

impl StegoSurface for IndexedFrames {
    fn slot_count(&self, limits: &CodecLimits) -> usize {
        self.slot_plan(limits).iter().map(Vec::len).sum()
    }

    fn preflight(&self, values: &[u8], limits: &CodecLimits) -> Result<(), StegoError> {
        if !limits.skip_zero_slots {
            return Ok(());
        }
        match values
            .chunks_exact(VALUES_PER_BYTE)
            .position(|v| bits::extract_triple([v[0], v[1], v[2]]) == 0)
        {
            Some(offset) => Err(StegoError::ZeroByteInPaletteStream { offset }),
            None         => Ok(()),
        }
    }

    fn write_values(&mut self, values: &[u8], limits: &CodecLimits) {
        let plan = self.slot_plan(limits);
        let mut pending = values.chunks(VALUES_PER_BYTE).peekable();

        for (n, (frame, slots)) in self.frames.iter_mut().zip(plan).enumerate() {
            if pending.peek().is_none() {
                break;
            }
            let mut written = 0usize;
            for (slot, vals) in slots.into_iter().zip(pending.by_ref()) {
                for (channel, &sub) in frame.palette[slot].iter_mut().zip(vals) {
                    *channel = bits::embed_channel(sub, *channel);
                }
                written += 1;
            }
            tracing::trace!(frame = n, slots = written, "wrote palette slots");
        }
    }

    fn recovered_bytes<'a>(&'a self, limits: &'a CodecLimits) -> Box<dyn Iterator<Item = u8> + 'a> {
        Box::new(self.frames.iter().flat_map(move |frame| {
            frame
                .embeddable_slots(limits)
                .into_iter()
                .map(move |slot| bits::extract_triple(frame.palette[slot]))
        }))
    }
}
