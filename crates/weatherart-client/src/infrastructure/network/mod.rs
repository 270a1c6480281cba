//! Network adapters that speak to the display.
//!
//! - [`art_channel`] – the WebSocket control channel ([`ArtChannelConnector`]
//!   implements [`DeviceConnector`](crate::application::device_session::DeviceConnector)).
//! - [`upload`] – the one-shot side socket that carries image bytes.
//!
//! # How a connection is made (for beginners)
//!
//! ```text
//!  DeviceSession ──connect(addr)──► ArtChannelConnector
//!                                      │  wss://addr/api/v2/channels/com.samsung.art-app?name=…
//!                                      ▼
//!                                  ArtChannel (DeviceLink)
//!                                      │ authorize → wait for ms.channel.ready
//!                                      │ list / upload / select / delete
//!                                      ▼
//!                                  JSON frames on the WebSocket
//! ```
//!
//! The display presents a self-signed certificate, so certificate and
//! hostname verification are switched off for the display only.

pub mod art_channel;
pub mod upload;

pub use art_channel::{ArtChannel, ArtChannelConnector};

/// Settings for opening the art channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtChannelConfig {
    /// Use `wss://` (port 8002 on current models) instead of `ws://`.
    pub secure: bool,
    /// Name shown on the TV's pairing prompt.
    pub client_name: String,
    /// Pairing token from an earlier approval, if any.
    pub token: Option<String>,
}

impl Default for ArtChannelConfig {
    fn default() -> Self {
        Self {
            secure: true,
            client_name: "WeatherArt".to_string(),
            token: None,
        }
    }
}
