//! Image containers: decoding files into a [`Carrier`] and writing it back.
//!
//! | Source | Carrier | Written as |
//! |--------|---------|------------|
//! | PNG    | pixels (RGB8 or RGBA8) | PNG |
//! | JPEG   | pixels (RGB8) | PNG, a lossy re-encode would destroy the payload |
//! | BMP    | pixels (RGB8 or RGBA8) | BMP |
//! | GIF    | indexed frames | GIF, one local palette per frame |
//!
//! GIF goes through the `gif` crate directly: `image` would expand frames to
//! RGBA and lose the palettes.

use std::borrow::Cow;
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use gif::{ColorOutput, DecodeOptions, DisposalMethod, Encoder, Repeat};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use serde::Serialize;
use thiserror::Error;

use crate::carrier::{Carrier, FrameMeta, IndexedFrame, IndexedFrames, LoopCount, PixelGrid};
use crate::error::StegoError;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("GIF decode error: {0}")]
    GifDecode(#[from] gif::DecodingError),
    #[error("GIF encode error: {0}")]
    GifEncode(#[from] gif::EncodingError),
    #[error(transparent)]
    Stego(#[from] StegoError),
    #[error("unsupported container: {0}")]
    Unsupported(String),
    #[error("GIF frame {frame} has no palette and the file has no global palette")]
    MissingPalette { frame: usize },
}

// ── ContainerFormat ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Png,
    Jpeg,
    Bmp,
    Gif,
}

impl ContainerFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Png  => "png",
            ContainerFormat::Jpeg => "jpeg",
            ContainerFormat::Bmp  => "bmp",
            ContainerFormat::Gif  => "gif",
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, ContainerFormat::Jpeg)
    }

    /// Detect the format from magic bytes.
    pub fn detect(bytes: &[u8]) -> Result<Self, ContainerError> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png)  => Ok(ContainerFormat::Png),
            Ok(ImageFormat::Jpeg) => Ok(ContainerFormat::Jpeg),
            Ok(ImageFormat::Bmp)  => Ok(ContainerFormat::Bmp),
            Ok(ImageFormat::Gif)  => Ok(ContainerFormat::Gif),
            Ok(other) => Err(ContainerError::Unsupported(format!("{other:?} images are not supported"))),
            Err(_)    => Err(ContainerError::Unsupported("unrecognised image data".into())),
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ContainerFormat::Png  => ImageFormat::Png,
            ContainerFormat::Jpeg => ImageFormat::Jpeg,
            ContainerFormat::Bmp  => ImageFormat::Bmp,
            ContainerFormat::Gif  => ImageFormat::Gif,
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Format an embedded carrier is written as.  Lossy sources become PNG.
pub fn output_format(source: ContainerFormat) -> ContainerFormat {
    if source.is_lossy() { ContainerFormat::Png } else { source }
}

/// `output.<ext>`, or `output_<ext>.png` for lossy sources.
pub fn output_file_name(source: ContainerFormat) -> String {
    let out = output_format(source);
    if out == source {
        format!("output.{}", out.extension())
    } else {
        format!("output_{}.{}", source.extension(), out.extension())
    }
}

// ── Decode ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedCarrier {
    pub format:  ContainerFormat,
    pub carrier: Carrier,
}

pub fn decode(bytes: &[u8]) -> Result<LoadedCarrier, ContainerError> {
    let format = ContainerFormat::detect(bytes)?;
    let carrier = match format {
        ContainerFormat::Gif => decode_gif(bytes)?.into(),
        _                    => decode_pixels(bytes, format)?.into(),
    };
    tracing::debug!(%format, bytes = bytes.len(), "decoded carrier");
    Ok(LoadedCarrier { format, carrier })
}

fn decode_pixels(bytes: &[u8], format: ContainerFormat) -> Result<PixelGrid, ContainerError> {
    let img = image::load_from_memory_with_format(bytes, format.image_format())?;
    let (width, height) = (img.width(), img.height());
    let grid = if img.color().has_alpha() {
        PixelGrid::new(width, height, 4, img.to_rgba8().into_raw())?
    } else {
        PixelGrid::new(width, height, 3, img.to_rgb8().into_raw())?
    };
    Ok(grid)
}

fn decode_gif(bytes: &[u8]) -> Result<IndexedFrames, ContainerError> {
    let mut opts = DecodeOptions::new();
    opts.set_color_output(ColorOutput::Indexed);
    let mut decoder = opts.read_info(Cursor::new(bytes))?;

    let global = decoder.global_palette().map(rgb_triples);
    let (width, height) = (decoder.width(), decoder.height());

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame()? {
        let palette = match (&frame.palette, &global) {
            (Some(local), _)     => rgb_triples(local),
            (None, Some(global)) => global.clone(),
            (None, None)         => return Err(ContainerError::MissingPalette { frame: frames.len() }),
        };
        let meta = FrameMeta {
            left:        frame.left,
            top:         frame.top,
            delay:       frame.delay,
            dispose:     frame.dispose as u8,
            transparent: frame.transparent,
        };
        let indexed = IndexedFrame::new(frame.width, frame.height, frame.buffer.to_vec(), palette)?;
        frames.push(indexed.with_meta(meta));
    }

    let loop_count = match decoder.repeat() {
        Repeat::Infinite  => LoopCount::Infinite,
        Repeat::Finite(0) => LoopCount::Once,
        Repeat::Finite(n) => LoopCount::Finite(n),
    };
    tracing::trace!(frames = frames.len(), ?loop_count, "decoded gif");
    Ok(IndexedFrames::new(width, height, frames)?.with_loop_count(loop_count))
}

fn rgb_triples(flat: &[u8]) -> Vec<[u8; 3]> {
    flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Serialize `carrier` for a `source`-format input, as [`output_format`] dictates.
pub fn encode(carrier: &Carrier, source: ContainerFormat) -> Result<Vec<u8>, ContainerError> {
    let format = output_format(source);
    let bytes = match (carrier, format) {
        (Carrier::Pixels(grid), ContainerFormat::Png | ContainerFormat::Bmp) => encode_pixels(grid, format)?,
        (Carrier::Indexed(frames), ContainerFormat::Gif) => encode_gif(frames)?,
        (c, f) => {
            return Err(ContainerError::Unsupported(format!(
                "a {} carrier cannot be written as {f}", c.kind().name()
            )))
        }
    };
    tracing::debug!(%format, bytes = bytes.len(), "encoded carrier");
    Ok(bytes)
}

fn encode_pixels(grid: &PixelGrid, format: ContainerFormat) -> Result<Vec<u8>, ContainerError> {
    let (w, h) = (grid.width(), grid.height());
    let raw = grid.as_raw().to_vec();
    let img = match grid.channels() {
        3 => RgbImage::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
        n => return Err(ContainerError::Unsupported(format!("cannot write {n}-channel pixels"))),
    }
    .ok_or_else(|| ContainerError::Unsupported("pixel buffer does not match its dimensions".into()))?;

    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format.image_format())?;
    Ok(out)
}

fn encode_gif(frames: &IndexedFrames) -> Result<Vec<u8>, ContainerError> {
    let mut out = Vec::new();
    {
        // Empty global palette: every frame carries its own.
        let mut encoder = Encoder::new(&mut out, frames.width, frames.height, &[])?;
        match frames.loop_count {
            LoopCount::Infinite  => encoder.set_repeat(Repeat::Infinite)?,
            LoopCount::Finite(n) => encoder.set_repeat(Repeat::Finite(n))?,
            LoopCount::Once      => {}
        }
        // Indices are held in display order and the encoder writes them as
        // given, so frames always go out non-interlaced.
        for f in &frames.frames {
            let mut frame = gif::Frame::default();
            frame.width       = f.width;
            frame.height      = f.height;
            frame.left        = f.meta.left;
            frame.top         = f.meta.top;
            frame.delay       = f.meta.delay;
            frame.dispose     = DisposalMethod::from_u8(f.meta.dispose).unwrap_or(DisposalMethod::Keep);
            frame.transparent = f.meta.transparent;
            frame.palette     = Some(f.palette.concat());
            frame.buffer      = Cow::Borrowed(f.indices.as_slice());
            encoder.write_frame(&frame)?;
        }
        // Trailer is written when the encoder drops.
    }
    Ok(out)
}

// ── Files ────────────────────────────────────────────────────────────────────

pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedCarrier, ContainerError> {
    let bytes = fs::read(path.as_ref())?;
    decode(&bytes)
}

/// Write `carrier` to `path` in the output format for `source`.
pub fn save<P: AsRef<Path>>(path: P, carrier: &Carrier, source: ContainerFormat) -> Result<(), ContainerError> {
    let bytes = encode(carrier, source)?;
    fs::write(path.as_ref(), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_grid() -> PixelGrid {
        let data = (0..6 * 4 * 4).map(|i| (i * 11 % 256) as u8).collect();
        PixelGrid::new(6, 4, 4, data).unwrap()
    }

    fn two_frame_gif() -> IndexedFrames {
        let palette: Vec<[u8; 3]> = (0..16).map(|i| [i * 16, 255 - i * 16, 0x40 | i]).collect();
        let a = IndexedFrame::new(4, 2, vec![0, 1, 2, 3, 3, 2, 1, 0], palette.clone())
            .unwrap()
            .with_meta(FrameMeta { delay: 10, dispose: 1, ..FrameMeta::default() });
        let b = IndexedFrame::new(2, 2, vec![5, 5, 6, 6], palette)
            .unwrap()
            .with_meta(FrameMeta { left: 1, delay: 20, dispose: 2, transparent: Some(7), ..FrameMeta::default() });
        IndexedFrames::new(4, 2, vec![a, b]).unwrap().with_loop_count(LoopCount::Infinite)
    }

    #[test]
    fn output_naming() {
        assert_eq!(output_file_name(ContainerFormat::Png), "output.png");
        assert_eq!(output_file_name(ContainerFormat::Jpeg), "output_jpeg.png");
        assert_eq!(output_file_name(ContainerFormat::Bmp), "output.bmp");
        assert_eq!(output_file_name(ContainerFormat::Gif), "output.gif");
        assert_eq!(output_format(ContainerFormat::Jpeg), ContainerFormat::Png);
    }

    #[test]
    fn detect_rejects_unknown_data() {
        assert!(matches!(ContainerFormat::detect(b"definitely not an image"), Err(ContainerError::Unsupported(_))));
        assert_eq!(ContainerFormat::detect(b"GIF89a\x01\x00").unwrap(), ContainerFormat::Gif);
    }

    #[test]
    fn png_keeps_pixels_exactly() {
        let carrier: Carrier = rgba_grid().into();
        let bytes = encode(&carrier, ContainerFormat::Png).unwrap();
        let loaded = decode(&bytes).unwrap();
        assert_eq!(loaded.format, ContainerFormat::Png);
        assert_eq!(loaded.carrier, carrier);
    }

    #[test]
    fn bmp_keeps_pixels_exactly() {
        let data = (0..5 * 3 * 3).map(|i| (i * 7 % 256) as u8).collect();
        let carrier: Carrier = PixelGrid::new(5, 3, 3, data).unwrap().into();
        let bytes = encode(&carrier, ContainerFormat::Bmp).unwrap();
        let loaded = decode(&bytes).unwrap();
        assert_eq!(loaded.format, ContainerFormat::Bmp);
        assert_eq!(loaded.carrier, carrier);
    }

    #[test]
    fn gif_keeps_frames_and_palettes() {
        let carrier: Carrier = two_frame_gif().into();
        let bytes = encode(&carrier, ContainerFormat::Gif).unwrap();
        let loaded = decode(&bytes).unwrap();
        assert_eq!(loaded.format, ContainerFormat::Gif);
        assert_eq!(loaded.carrier, carrier);
    }

    #[test]
    fn interlaced_gif_rows_stay_in_display_order() {
        // Rows stored in interlace pass order: 0, 4, 2, 6, then the odd rows.
        let passes = [0u8, 4, 2, 6, 1, 3, 5, 7];
        let stored: Vec<u8> = passes.iter().flat_map(|&row| [row; 8]).collect();
        let palette: Vec<u8> = (0..16u8).flat_map(|i| [i * 16, 0x80, 0xFF - i]).collect();

        let mut bytes = Vec::new();
        {
            let mut encoder = Encoder::new(&mut bytes, 8, 8, &palette).unwrap();
            let mut frame = gif::Frame::default();
            frame.width      = 8;
            frame.height     = 8;
            frame.interlaced = true;
            frame.buffer     = Cow::Owned(stored);
            encoder.write_frame(&frame).unwrap();
        }

        let display: Vec<u8> = (0..8u8).flat_map(|row| [row; 8]).collect();
        let loaded = decode(&bytes).unwrap();
        let Carrier::Indexed(frames) = &loaded.carrier else { panic!("expected indexed carrier") };
        assert_eq!(frames.frames[0].indices, display);

        let reencoded = decode(&encode(&loaded.carrier, ContainerFormat::Gif).unwrap()).unwrap();
        assert_eq!(reencoded.carrier, loaded.carrier);
    }

    #[test]
    fn mismatched_kind_and_format() {
        let carrier: Carrier = two_frame_gif().into();
        assert!(matches!(encode(&carrier, ContainerFormat::Png), Err(ContainerError::Unsupported(_))));
        let carrier: Carrier = rgba_grid().into();
        assert!(matches!(encode(&carrier, ContainerFormat::Gif), Err(ContainerError::Unsupported(_))));
    }
}
