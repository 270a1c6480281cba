//! Storage infrastructure: configuration and small state files.
//!
//! - [`config`] reads and writes the TOML configuration file from the
//!   platform-appropriate directory, with defaults for every field.
//! - [`state_files`] keeps the pairing token and the id of the last upload
//!   in plain text files next to the configuration.
//!
//! Both are best-effort on the read side: a missing file means "use the
//! defaults" or "nothing remembered yet".

pub mod config;
pub mod state_files;
