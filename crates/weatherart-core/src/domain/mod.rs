//! Domain entities for WeatherArt.
//!
//! Pure data and rules with no infrastructure dependencies.  Code in the
//! client crate (sockets, files, the CLI) depends on these types, never the
//! other way round.

/// Remote artwork items and upload requests.
pub mod artwork;

/// Which stored items a cleanup pass should delete.
pub mod cleanup;

/// Device endpoint and MAC address parsing.
pub mod endpoint;

/// Forecast record and the temperature range embedded in images.
pub mod weather;
