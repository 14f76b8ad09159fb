//! True-colour carrier: one byte per pixel, spread over its first three
//! channels.  Any further channel (alpha) is never touched.

use crate::bits::{self, VALUES_PER_BYTE};
use crate::capacity::CodecLimits;
use crate::error::StegoError;

use super::StegoSurface;

/// Interleaved 8-bit pixels, `channels` bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width:    u32,
    height:   u32,
    channels: usize,
    data:     Vec<u8>,
}

impl PixelGrid {
    pub fn new(width: u32, height: u32, channels: usize, data: Vec<u8>) -> Result<Self, StegoError> {
        if channels < VALUES_PER_BYTE {
            return Err(StegoError::UnsupportedCarrierFormat(format!(
                "pixel carrier needs at least 3 colour channels, got {channels}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(channels));
        if expected != Some(data.len()) {
            return Err(StegoError::UnsupportedCarrierFormat(format!(
                "{width}x{height}x{channels} pixel buffer has {} bytes", data.len()
            )));
        }
        Ok(Self { width, height, channels, data })
    }

    pub fn width(&self)    -> u32   { self.width }
    pub fn height(&self)   -> u32   { self.height }
    pub fn channels(&self) -> usize { self.channels }
    pub fn as_raw(&self)   -> &[u8] { &self.data }
    pub fn into_raw(self)  -> Vec<u8> { self.data }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / self.channels
    }

    pub fn pixel(&self, index: usize) -> Option<&[u8]> {
        self.data.chunks_exact(self.channels).nth(index)
    }
}

fn write_pixel(px: &mut [u8], values: &[u8]) {
    for (channel, &sub) in px.iter_mut().zip(values) {
        *channel = bits::embed_channel(sub, *channel);
    }
}

impl StegoSurface for PixelGrid {
    fn slot_count(&self, _limits: &CodecLimits) -> usize {
        self.pixel_count()
    }

    fn write_values(&mut self, values: &[u8], _limits: &CodecLimits) {
        // Pixels past the end of `values` are left as they are.
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            self.data
                .par_chunks_exact_mut(self.channels)
                .zip(values.par_chunks(VALUES_PER_BYTE))
                .for_each(|(px, vals)| write_pixel(px, vals));
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.data
                .chunks_exact_mut(self.channels)
                .zip(values.chunks(VALUES_PER_BYTE))
                .for_each(|(px, vals)| write_pixel(px, vals));
        }
    }

    fn recovered_bytes<'a>(&'a self, _limits: &'a CodecLimits) -> Box<dyn Iterator<Item = u8> + 'a> {
        Box::new(
            self.data
                .chunks_exact(self.channels)
                .map(|px| bits::extract_triple([px[0], px[1], px[2]])),
        )
    }
}
