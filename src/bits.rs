//! 2-3-3 bit splitting.
//!
//! Each byte `b` becomes three sub-byte values, one per colour channel:
//!
//! | value | bits of `b` | channel mask |
//! |-------|-------------|--------------|
//! | `v0`  | `bb------`  | `0x03` (width marker `0x80` set) |
//! | `v1`  | `--bbb---`  | `0x07` |
//! | `v2`  | `-----bbb`  | `0x07` |
//!
//! The marker on `v0` only matters on the embed side.  Extraction knows the
//! slot position and masks the read-back channel directly.

use crate::error::StegoError;

/// Sub-byte values per payload byte, and colour channels used per slot.
pub const VALUES_PER_BYTE: usize = 3;

/// Set on `v0` to mark a 2-bit value.
pub const WIDTH_MARKER: u8 = 0b1000_0000;
pub const HIGH_MASK:    u8 = 0b0000_0011;
pub const LOW_MASK:     u8 = 0b0000_0111;

#[inline]
pub fn split_byte(b: u8) -> [u8; 3] {
    [WIDTH_MARKER | (b >> 6), (b >> 3) & LOW_MASK, b & LOW_MASK]
}

/// Split every byte into its three sub-byte values, in order `v0, v1, v2`.
pub fn split(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * VALUES_PER_BYTE);
    for &b in bytes {
        out.extend_from_slice(&split_byte(b));
    }
    out
}

/// Write one sub-byte value into the low bits of a channel.
#[inline]
pub fn embed_channel(sub: u8, channel: u8) -> u8 {
    if sub & WIDTH_MARKER != 0 {
        (channel & !HIGH_MASK) | (sub & HIGH_MASK)
    } else {
        (channel & !LOW_MASK) | (sub & LOW_MASK)
    }
}

/// Low bits of a read-back channel: two for the first channel of a slot,
/// three for the others.
#[inline]
pub fn extract_channel(channel: u8, position: usize) -> u8 {
    if position == 0 { channel & HIGH_MASK } else { channel & LOW_MASK }
}

/// Recover one byte from the three channels of a slot.
#[inline]
pub fn extract_triple(channels: [u8; 3]) -> u8 {
    (extract_channel(channels[0], 0) << 6) | (extract_channel(channels[1], 1) << 3) | extract_channel(channels[2], 2)
}

/// Rebuild bytes from channel values read back in slot order, three per byte.
pub fn reassemble(values: &[u8]) -> Result<Vec<u8>, StegoError> {
    if values.len() % VALUES_PER_BYTE != 0 {
        return Err(StegoError::TruncatedStream { len: values.len() });
    }
    Ok(values
        .chunks_exact(VALUES_PER_BYTE)
        .map(|c| extract_triple([c[0], c[1], c[2]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_layout() {
        // 'H' = 0b01_001_000
        assert_eq!(split(b"H"), vec![0x81, 0b001, 0b000]);
        // 0xFF = 0b11_111_111
        assert_eq!(split(&[0xFF]), vec![0x83, 0x07, 0x07]);
        assert!(split(&[]).is_empty());
    }

    #[test]
    fn split_then_reassemble_every_byte() {
        let all: Vec<u8> = (0..=255).collect();
        let values = split(&all);
        assert_eq!(values.len(), 3 * 256);
        assert_eq!(reassemble(&values).unwrap(), all);
    }

    #[test]
    fn embed_channel_masks() {
        // Marker set: only the low two bits change.
        assert_eq!(embed_channel(0x80 | 0b10, 0b1111_1111), 0b1111_1110);
        assert_eq!(embed_channel(0x80 | 0b01, 0b0000_0100), 0b0000_0101);
        // No marker: low three bits change.
        assert_eq!(embed_channel(0b010, 0b1010_1101), 0b1010_1010);
        assert_eq!(embed_channel(0b000, 0b0000_0111), 0);
    }

    #[test]
    fn embed_then_extract_through_channels() {
        let carrier = [0xA5u8, 0x3C, 0xFF];
        for b in 0..=255u8 {
            let v = split_byte(b);
            let written = [
                embed_channel(v[0], carrier[0]),
                embed_channel(v[1], carrier[1]),
                embed_channel(v[2], carrier[2]),
            ];
            assert_eq!(extract_triple(written), b);
            // Bits above the written window are untouched.
            assert_eq!(written[0] & !HIGH_MASK, carrier[0] & !HIGH_MASK);
            assert_eq!(written[1] & !LOW_MASK,  carrier[1] & !LOW_MASK);
        }
    }

    #[test]
    fn reassemble_masks_raw_channels() {
        // High bits of real channel values are ignored.
        assert_eq!(reassemble(&[0b1111_1101, 0b1010_1001, 0b0101_0000]).unwrap(), vec![0b01_001_000]);
    }

    #[test]
    fn extract_channel_by_position() {
        assert_eq!(extract_channel(0xFF, 0), 0x03);
        assert_eq!(extract_channel(0xFF, 1), 0x07);
        assert_eq!(extract_channel(0b1010_1110, 2), 0b110);
    }

    #[test]
    fn reassemble_rejects_partial_triple() {
        match reassemble(&[1, 2, 3, 4]) {
            Err(StegoError::TruncatedStream { len }) => assert_eq!(len, 4),
            other => panic!("expected TruncatedStream, got {other:?}"),
        }
    }
}
