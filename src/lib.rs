//! LSB steganography for PNG, JPEG, BMP and animated GIF carriers.
//!
//! A payload is pre-encoded, prefixed with a self-delimiting header and
//! spread two-three-three bits at a time over the low bits of three colour
//! channels per slot.  Pixel images use every pixel as a slot; palette images
//! use the palette entries no pixel references.

pub mod bits;
pub mod capacity;
pub mod carrier;
pub mod container;
pub mod error;
pub mod header;
pub mod stego;
pub mod transform;

pub use capacity::{Capacity, CodecLimits};
pub use carrier::{Carrier, CarrierKind, IndexedFrame, IndexedFrames, PixelGrid, StegoSurface};
pub use container::{ContainerError, ContainerFormat, LoadedCarrier};
pub use error::StegoError;
pub use header::{Header, HeaderScanner};
pub use stego::{embed, extract, EmbedOptions, Extracted};
pub use transform::{get_transform, Transform, TransformError, TransformId};
