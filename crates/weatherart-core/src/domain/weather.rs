//! Forecast record handed over by the weather collaborator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A day's temperature range in degrees Celsius, one decimal of precision.
///
/// This is the payload hidden in every generated image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl TemperatureRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// The structured forecast the orchestrator works from.
///
/// Treated as an opaque input record: no validation beyond its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub date: NaiveDate,
    pub temperatures: TemperatureRange,
    /// Short human-readable summary, e.g. "partly cloudy skies, light rain".
    pub description: String,
}
