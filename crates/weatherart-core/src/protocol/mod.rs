//! Wire formats spoken with the display.
//!
//! - [`messages`] – JSON envelopes on the WebSocket art channel.
//! - [`upload`] – the header sent on the side socket that carries image bytes.

pub mod messages;
pub mod upload;

pub use messages::{
    channel_url, encode_request, parse_event, ArtRequest, ArtResponse, ChannelEvent, UploadTarget,
};
pub use upload::encode_upload_header;

use thiserror::Error;

/// Errors raised while encoding or decoding art-channel traffic.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The text was not valid JSON or did not have the expected shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field the operation depends on was absent.
    #[error("response is missing field {0:?}")]
    MissingField(&'static str),

    /// A field was present but could not be interpreted.
    #[error("malformed field {field:?}: {reason}")]
    Malformed { field: &'static str, reason: String },
}
