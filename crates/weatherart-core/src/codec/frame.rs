//! Bit-level frame carried in the embedding region.
//!
//! ```text
//! [marker:24 "WXA"][min:11][max:11][crc8:8]      54 bits, MSB first
//! ```
//!
//! The marker lets decode bail out early on unrelated images.  The CRC-8
//! (polynomial 0x07) covers marker and payload so a random image that happens
//! to carry the marker bits is still rejected.

use super::payload::FIELD_BITS;

/// Marker bytes written before the payload.
pub const MARKER: [u8; 3] = *b"WXA";

const MARKER_BITS: usize = MARKER.len() * 8;
const CRC_BITS: usize = 8;
const BODY_BITS: usize = MARKER_BITS + 2 * FIELD_BITS;

/// Total number of bits in one frame.
pub const FRAME_BITS: usize = BODY_BITS + CRC_BITS;

/// CRC-8/SMBUS: polynomial 0x07, initial value 0, no reflection.
fn crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |mut crc, &byte| {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
        crc
    })
}

fn push_bits(bits: &mut Vec<bool>, value: u32, width: usize) {
    for shift in (0..width).rev() {
        bits.push((value >> shift) & 1 == 1);
    }
}

fn read_bits(bits: &[bool]) -> u32 {
    bits.iter().fold(0, |acc, &bit| (acc << 1) | u32::from(bit))
}

/// Packs bits MSB-first into bytes, zero-padding the final byte.
fn pack(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            let value = read_bits(chunk) as u8;
            value << (8 - chunk.len())
        })
        .collect()
}

/// Builds the frame for two stored temperature fields.
pub(crate) fn build(fields: [u16; 2]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(FRAME_BITS);
    for byte in MARKER {
        push_bits(&mut bits, u32::from(byte), 8);
    }
    for field in fields {
        push_bits(&mut bits, u32::from(field), FIELD_BITS);
    }
    let crc = crc8(&pack(&bits));
    push_bits(&mut bits, u32::from(crc), CRC_BITS);
    bits
}

/// Parses a frame; `None` if the marker or checksum does not match.
pub(crate) fn parse(bits: &[bool]) -> Option<[u16; 2]> {
    if bits.len() < FRAME_BITS {
        return None;
    }

    let marker = pack(&bits[..MARKER_BITS]);
    if marker != MARKER {
        return None;
    }

    let expected_crc = read_bits(&bits[BODY_BITS..FRAME_BITS]) as u8;
    if crc8(&pack(&bits[..BODY_BITS])) != expected_crc {
        return None;
    }

    let min = read_bits(&bits[MARKER_BITS..MARKER_BITS + FIELD_BITS]) as u16;
    let max = read_bits(&bits[MARKER_BITS + FIELD_BITS..BODY_BITS]) as u16;
    Some([min, max])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
