//! Side-socket upload framing.
//!
//! After `ready_to_use` the display listens on a separate TCP (or TLS)
//! socket for the image bytes:
//!
//! ```text
//! ┌──────────────────┬───────────────────────────┬────────────────────┐
//! │ header length    │ header JSON (UTF-8)       │ image bytes        │
//! │ u32, big-endian  │ {"num":0,"total":1,…}     │ fileLength bytes   │
//! └──────────────────┴───────────────────────────┴────────────────────┘
//! ```
//!
//! `secKey` is the `key` the display handed out in `conn_info`; the display
//! drops the connection if it does not match.

use serde::Serialize;

use crate::domain::artwork::ImageFileType;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadHeader<'a> {
    num: u32,
    total: u32,
    file_length: usize,
    file_name: &'a str,
    file_type: &'a str,
    sec_key: &'a str,
    version: &'a str,
}

/// Builds the length-prefixed header sent before the image bytes.
///
/// The caller writes the returned bytes followed by exactly `file_length`
/// image bytes.
pub fn encode_upload_header(file_length: usize, file_type: ImageFileType, sec_key: &str) -> Vec<u8> {
    let header = UploadHeader {
        num: 0,
        total: 1,
        file_length,
        file_name: "dummy",
        file_type: file_type.as_str(),
        sec_key,
        version: "0.0.1",
    };
    // Serialising a struct of plain strings and integers cannot fail.
    let json = serde_json::to_vec(&header).unwrap_or_default();

    let mut out = Vec::with_capacity(4 + json.len());
    out.extend_from_slice(&(json.len() as u32).to_be_bytes());
    out.extend_from_slice(&json);
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
