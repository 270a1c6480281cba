//! Byte-level helpers around [`encode`](super::encode) and [`decode`](super::decode).
//!
//! The image generator hands back encoded bytes (PNG or JPEG) and the display
//! takes encoded bytes, so the orchestrator works with these wrappers rather
//! than pixel buffers.  Output is always PNG: the payload lives in the lowest
//! bit of each channel and a lossy format would erase it.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use tracing::debug;

use super::{decode, encode, ClampReport, CodecError};
use crate::domain::weather::TemperatureRange;

/// An encoded PNG carrying a payload, plus what was stored.
#[derive(Debug, Clone)]
pub struct EncodedPng {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stored: TemperatureRange,
    pub clamped: ClampReport,
}

fn load_rgb(bytes: &[u8]) -> Result<RgbImage, CodecError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Decodes `bytes` (any format the `image` crate reads), embeds `payload`,
/// and re-encodes the result as PNG.
///
/// # Errors
///
/// Returns [`CodecError::Image`] if the bytes are not a decodable image and
/// [`CodecError::TooSmall`] if the image cannot hold the payload.
pub fn embed_in_image_bytes(
    bytes: &[u8],
    payload: TemperatureRange,
) -> Result<EncodedPng, CodecError> {
    let image = load_rgb(bytes)?;
    let encoded = encode(&image, payload)?;

    let mut png = Cursor::new(Vec::with_capacity(bytes.len()));
    encoded.image.write_to(&mut png, ImageFormat::Png)?;
    let png = png.into_inner();

    debug!(
        width = encoded.image.width(),
        height = encoded.image.height(),
        bytes = png.len(),
        "embedded payload into PNG"
    );

    Ok(EncodedPng {
        png,
        width: encoded.image.width(),
        height: encoded.image.height(),
        stored: encoded.stored,
        clamped: encoded.clamped,
    })
}

/// Reads a payload from encoded image bytes.
///
/// `Ok(None)` means the image decoded fine but carries no payload.
///
/// # Errors
///
/// Returns [`CodecError::Image`] only when the bytes are not an image.
pub fn extract_from_image_bytes(bytes: &[u8]) -> Result<Option<TemperatureRange>, CodecError> {
    Ok(decode(&load_rgb(bytes)?))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
