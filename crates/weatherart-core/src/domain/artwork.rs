//! Remote artwork items stored on the display.
//!
//! The display is the sole owner of its artwork list.  It allocates the
//! content ids, and the client never caches the list between runs: every
//! decision (what to select, what to delete) is made from a fresh listing.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format the display uses for `image_date`.
pub const DEVICE_TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Alternate format seen on some firmware versions.
const ALT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Category the display files user uploads under ("My Photos").
pub const MY_PHOTOS_CATEGORY: &str = "MY-C0002";

/// Identifier the display assigned to a stored item, e.g. `MY_F0042`.
///
/// Identifiers are opaque; they are not guaranteed to be monotonic across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One artwork item as reported by the display's content list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkItem {
    pub id: ContentId,
    pub category: String,
    /// Creation time in the display's local clock.  `None` when the device
    /// omitted the field or sent a format we do not recognise.
    pub created: Option<NaiveDateTime>,
    pub digest: Option<String>,
}

/// Parses a device timestamp in either known format.
///
/// ```rust
/// use weatherart_core::domain::artwork::parse_device_timestamp;
///
/// assert!(parse_device_timestamp("2026:01:02 07:30:00").is_some());
/// assert!(parse_device_timestamp("2026-01-02 07:30:00").is_some());
/// assert!(parse_device_timestamp("yesterday").is_none());
/// ```
pub fn parse_device_timestamp(value: &str) -> Option<NaiveDateTime> {
    [DEVICE_TIMESTAMP_FORMAT, ALT_TIMESTAMP_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value.trim(), fmt).ok())
}

/// Formats a timestamp the way the display expects it in upload requests.
pub fn format_device_timestamp(at: NaiveDateTime) -> String {
    at.format(DEVICE_TIMESTAMP_FORMAT).to_string()
}

/// Returns the most recently created item.
///
/// Items without a timestamp rank as oldest.  Among equal timestamps the
/// first item in listing order wins.
pub fn pick_latest<'a, I>(items: I) -> Option<&'a ArtworkItem>
where
    I: IntoIterator<Item = &'a ArtworkItem>,
{
    let mut best: Option<&ArtworkItem> = None;
    for item in items {
        match best {
            Some(current) if item.created <= current.created => {}
            _ => best = Some(item),
        }
    }
    best
}

/// Encoded image container format announced to the display before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFileType {
    Png,
    Jpeg,
}

impl ImageFileType {
    /// Wire name used in `send_image` requests.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFileType::Png => "png",
            ImageFileType::Jpeg => "jpg",
        }
    }

    /// Detects the container from the first bytes of the file.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
        if bytes.starts_with(PNG_MAGIC) {
            Some(ImageFileType::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(ImageFileType::Jpeg)
        } else {
            None
        }
    }
}

/// Parameters of an upload besides the image bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Category the item should be filed under.
    pub category: String,
    /// Matte (frame border) style, `"none"` for a full-bleed image.
    pub matte: String,
    pub file_type: ImageFileType,
    /// Device-format timestamp recorded as the item's creation date.
    pub image_date: String,
}

impl UploadRequest {
    pub fn new(
        category: impl Into<String>,
        matte: impl Into<String>,
        file_type: ImageFileType,
        created: NaiveDateTime,
    ) -> Self {
        Self {
            category: category.into(),
            matte: matte.into(),
            file_type,
            image_date: format_device_timestamp(created),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
