//! Steganographic pixel codec: hides a [`TemperatureRange`] in an image.
//!
//! # How it works (for beginners)
//!
//! Every pixel of an 8-bit RGB image stores three numbers from 0 to 255.
//! Changing the lowest bit of one of those numbers moves the colour by one
//! step out of 256, which is far below what the eye can notice.  The codec
//! writes one payload bit into the lowest bit of each colour channel of a
//! small, fixed block of pixels:
//!
//! ```text
//! (0,0)                       (7,0)
//!   ┌───┬───┬───┬───┬───┬───┬───┬───┐
//!   │RGB│RGB│RGB│RGB│RGB│RGB│RGB│RGB│   row 0: bits  0..23
//!   ├───┼───┼───┼───┼───┼───┼───┼───┤
//!   │RGB│RGB│RGB│RGB│RGB│RGB│RGB│RGB│   row 1: bits 24..47
//!   ├───┼───┼───┼───┼───┼───┼───┼───┤
//!   │RGB│RGB│ · │ · │ · │ · │ · │ · │   row 2: bits 48..53
//!   └───┴───┴───┴───┴───┴───┴───┴───┘
//! ```
//!
//! Because the block is always the top-left `8 × 3` pixels, the decoder
//! knows where to look without any side-channel metadata.  The bits form a
//! frame (see [`frame`]) that starts with a marker and ends with a CRC, so an
//! ordinary photo is reported as "no payload" rather than misread.
//!
//! The scheme survives only lossless storage.  Re-encoding as JPEG or
//! resizing destroys the low bits, and decode then reports absence.

use image::RgbImage;
use thiserror::Error;

use crate::domain::weather::TemperatureRange;

pub mod bytes;
pub mod frame;
pub mod payload;

pub use bytes::{embed_in_image_bytes, extract_from_image_bytes, EncodedPng};
pub use payload::{ClampReport, MAX_CELSIUS, MIN_CELSIUS};

/// Width of the embedding region in pixels.
pub const REGION_WIDTH: u32 = 8;

/// Height of the embedding region in pixels.
pub const REGION_HEIGHT: u32 = 3;

/// Colour channels used per pixel (R, G, B).
const CHANNELS: usize = 3;

/// Errors produced by the codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The image cannot hold the embedding region.
    #[error(
        "image is {width}x{height}, the payload needs at least {min_width}x{min_height} pixels"
    )]
    TooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    /// The bytes could not be decoded or re-encoded as an image.
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result of a successful [`encode`].
#[derive(Debug, Clone)]
pub struct Encoded {
    /// The image with the payload embedded.  Same dimensions as the input.
    pub image: RgbImage,
    /// The range exactly as [`decode`] will return it (after clamping and
    /// rounding to tenths).
    pub stored: TemperatureRange,
    /// Which fields were clamped into the supported range.
    pub clamped: ClampReport,
}

/// Iterates the `(x, y, channel)` slots of the embedding region in bit order.
fn region_slots() -> impl Iterator<Item = (u32, u32, usize)> {
    (0..REGION_HEIGHT)
        .flat_map(|y| (0..REGION_WIDTH).map(move |x| (x, y)))
        .flat_map(|(x, y)| (0..CHANNELS).map(move |c| (x, y, c)))
        .take(frame::FRAME_BITS)
}

fn fits(image: &RgbImage) -> bool {
    image.width() >= REGION_WIDTH && image.height() >= REGION_HEIGHT
}

/// Embeds `payload` into a copy of `image`.
///
/// Out-of-range temperatures are clamped, never rejected; the returned
/// [`Encoded::clamped`] says whether that happened.
///
/// # Errors
///
/// Returns [`CodecError::TooSmall`] if the image is smaller than the
/// `REGION_WIDTH × REGION_HEIGHT` embedding region.
///
/// # Examples
///
/// ```rust
/// use image::RgbImage;
/// use weatherart_core::{decode, encode, TemperatureRange};
///
/// let image = RgbImage::from_pixel(64, 36, image::Rgb([120, 80, 200]));
/// let encoded = encode(&image, TemperatureRange::new(14.5, 23.1)).unwrap();
/// assert_eq!(decode(&encoded.image), Some(TemperatureRange::new(14.5, 23.1)));
/// ```
pub fn encode(image: &RgbImage, payload: TemperatureRange) -> Result<Encoded, CodecError> {
    if !fits(image) {
        return Err(CodecError::TooSmall {
            width: image.width(),
            height: image.height(),
            min_width: REGION_WIDTH,
            min_height: REGION_HEIGHT,
        });
    }

    let (fields, stored, clamped) = payload::quantize(payload);
    let bits = frame::build(fields);

    let mut out = image.clone();
    for ((x, y, c), bit) in region_slots().zip(bits) {
        let channel = &mut out.get_pixel_mut(x, y).0[c];
        *channel = (*channel & !1) | u8::from(bit);
    }

    Ok(Encoded {
        image: out,
        stored,
        clamped,
    })
}

/// Reads a payload back out of `image`.
///
/// Returns `None` (payload not present) for images that are too small, lack
/// the marker, fail the checksum, or carry values outside the supported
/// range.  Never panics on any image.
pub fn decode(image: &RgbImage) -> Option<TemperatureRange> {
    if !fits(image) {
        return None;
    }
    let bits: Vec<bool> = region_slots()
        .map(|(x, y, c)| image.get_pixel(x, y).0[c] & 1 == 1)
        .collect();
    frame::parse(&bits).and_then(payload::dequantize)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
