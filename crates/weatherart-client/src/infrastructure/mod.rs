//! Infrastructure layer for the display client.
//!
//! Contains the OS- and network-facing adapters behind the application
//! traits.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `weatherart_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`locator`** – Resolves the display's IP from configuration or the host
//!   neighbour table, and sends the Wake-on-LAN magic packet.
//!
//! - **`network`** – The WebSocket art channel (`ws://` or `wss://`) and the
//!   side socket that carries uploaded image bytes.
//!
//! - **`storage`** – TOML configuration plus the small state files
//!   (last uploaded id, pairing token).
//!
//! - **`collaborators`** – Simple forecast and image sources backed by
//!   command-line arguments and files.

pub mod collaborators;
pub mod locator;
pub mod network;
pub mod storage;
