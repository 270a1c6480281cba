//! Application layer use cases for the display client.
//!
//! # What use cases does the client have?
//!
//! - **`device_session`** – The connection lifecycle to the TV: resolve,
//!   wake, connect with bounded retry, authorize, then list / upload /
//!   select / delete, and finally close.  Every other use case drives the TV
//!   through a [`device_session::DeviceSession`].
//!
//! - **`publish_artwork`** – The daily run: forecast → image → hide the
//!   temperature range in the pixels → upload → select → replace yesterday's
//!   picture.
//!
//! - **`push_image`** – Upload an existing image file unchanged.
//!
//! - **`remove_today`** – Delete every stored picture dated today.
//!
//! The network, ARP, and file-system adapters are injected as trait objects
//! so every use case can be tested with in-memory doubles.

pub mod device_session;
pub mod publish_artwork;
pub mod push_image;
pub mod remove_today;
