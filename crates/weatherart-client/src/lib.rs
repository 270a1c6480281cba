//! weatherart-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does weatherart-client do? (for beginners)
//!
//! The client talks to a single Frame-style TV on the local network.  A run
//! of the `weatherart` binary:
//!
//! 1. Works out the TV's IP address, either from configuration or by looking
//!    its MAC address up in the host's neighbour (ARP) table.
//! 2. Optionally broadcasts a Wake-on-LAN packet and waits a few seconds for
//!    the TV to come up.
//! 3. Opens the TV's WebSocket "art channel" and waits for the user to
//!    approve the pairing prompt (skipped when a stored token is accepted).
//! 4. Uploads a picture, selects it for display, and optionally deletes the
//!    picture uploaded on the previous run.
//!
//! The steps live in two layers:
//!
//! - **`application`** – the session state machine and the use cases
//!   (publish, push, remove-today).  It only knows about traits.
//! - **`infrastructure`** – the concrete adapters: ARP lookup, the UDP wake
//!   packet, the WebSocket art channel, and the config/state files.

/// Application layer: session state machine and use cases.
pub mod application;

/// Infrastructure layer: network, locator, and storage adapters.
pub mod infrastructure;
