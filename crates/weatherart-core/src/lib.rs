//! # weatherart-core
//!
//! Shared library for WeatherArt containing the domain entities, the pixel
//! payload codec, and the message types spoken on the display's art channel.
//!
//! This crate has zero dependencies on sockets, the file system, or the
//! async runtime.  Everything in here can be unit-tested on any machine.
//!
//! # Architecture overview (for beginners)
//!
//! WeatherArt generates one piece of artwork per day from the weather
//! forecast and shows it on a networked "Frame"-style TV in Art Mode.  The
//! forecast's temperature range is also hidden *inside* the image pixels so
//! that a stored picture can later be traced back to the day it described.
//!
//! - **`domain`** – Plain data: device endpoints and MAC addresses, remote
//!   artwork items, the temperature range, and the cleanup filter that
//!   decides which stored images belong to "today".
//!
//! - **`codec`** – The steganographic codec.  It writes a short marker, the
//!   two temperatures, and a checksum into the least-significant bits of a
//!   fixed corner of the image, and reads them back.
//!
//! - **`protocol`** – JSON envelopes for the device's WebSocket art channel
//!   and the binary header used on the side socket that carries image bytes.

pub mod codec;
pub mod domain;
pub mod protocol;

pub use codec::{decode, encode, CodecError, Encoded};
pub use domain::artwork::{ArtworkItem, ContentId, UploadRequest};
pub use domain::cleanup::{CleanupFilter, DayPolicy};
pub use domain::endpoint::{DeviceEndpoint, MacAddress, MacParseError};
pub use domain::weather::{Forecast, TemperatureRange};
pub use protocol::ProtocolError;
