//! Fixed-width quantisation of the temperature payload.
//!
//! Each temperature is stored as an 11-bit unsigned integer:
//!
//! ```text
//! stored = round(celsius * 10) + 500
//! ```
//!
//! so the representable range is -50.0 °C (`0`) up to +154.7 °C (`2047`).
//! The *documented* range is narrower, -50.0 ..= +60.0 °C; anything outside
//! it is clamped before quantisation so encoding never fails.  Decoding
//! rejects stored values above the documented maximum, which keeps random
//! images from producing plausible-looking temperatures.

use crate::domain::weather::TemperatureRange;

/// Lowest temperature that survives encoding unchanged.
pub const MIN_CELSIUS: f64 = -50.0;

/// Highest temperature that survives encoding unchanged.
pub const MAX_CELSIUS: f64 = 60.0;

/// Bits used per temperature field.
pub const FIELD_BITS: usize = 11;

const OFFSET_TENTHS: i32 = 500;
const MAX_STORED: u16 = ((MAX_CELSIUS * 10.0) as i32 + OFFSET_TENTHS) as u16;

/// Which fields were clamped during encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClampReport {
    pub min: bool,
    pub max: bool,
}

impl ClampReport {
    pub fn any(&self) -> bool {
        self.min || self.max
    }
}

/// Clamps one value into the documented range.
///
/// Returns the clamped value and whether clamping happened.  Non-finite
/// inputs are clamped too: `NaN` becomes the lower bound.
fn clamp(value: f64) -> (f64, bool) {
    if value.is_nan() {
        return (MIN_CELSIUS, true);
    }
    let clamped = value.clamp(MIN_CELSIUS, MAX_CELSIUS);
    (clamped, clamped != value)
}

fn to_stored(celsius: f64) -> u16 {
    ((celsius * 10.0).round() as i32 + OFFSET_TENTHS) as u16
}

fn from_stored(stored: u16) -> f64 {
    f64::from(i32::from(stored) - OFFSET_TENTHS) / 10.0
}

/// Quantises a range into two stored fields.
///
/// Also returns the range as it will decode, and which fields were clamped.
pub(crate) fn quantize(range: TemperatureRange) -> ([u16; 2], TemperatureRange, ClampReport) {
    let (min, min_clamped) = clamp(range.min);
    let (max, max_clamped) = clamp(range.max);
    let fields = [to_stored(min), to_stored(max)];
    let stored = TemperatureRange::new(from_stored(fields[0]), from_stored(fields[1]));
    let report = ClampReport {
        min: min_clamped,
        max: max_clamped,
    };
    (fields, stored, report)
}

/// Reverses [`quantize`]; `None` when a field is outside the documented range.
pub(crate) fn dequantize(fields: [u16; 2]) -> Option<TemperatureRange> {
    if fields.iter().any(|&f| f > MAX_STORED) {
        return None;
    }
    Some(TemperatureRange::new(
        from_stored(fields[0]),
        from_stored(fields[1]),
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_stored_fits_in_field_width() {
        assert_eq!(MAX_STORED, 1100);
        assert!(u32::from(MAX_STORED) < (1 << FIELD_BITS));
    }

    #[test]
    fn test_every_tenth_in_range_round_trips_exactly() {
        // Exhaustive over the documented range, one decimal of precision.
        for tenths in -500..=600 {
            let celsius = f64::from(tenths) / 10.0;
            let (fields, stored, report) = quantize(TemperatureRange::new(celsius, celsius));
            assert!(!report.any(), "{celsius} must not be clamped");
            assert_eq!(stored.min, celsius);
            assert_eq!(dequantize(fields), Some(TemperatureRange::new(celsius, celsius)));
        }
    }

    #[test]
    fn test_out_of_range_values_are_clamped_and_reported() {
        // Arrange / Act
        let (_, stored, report) = quantize(TemperatureRange::new(-80.0, 75.5));

        // Assert
        assert_eq!(stored, TemperatureRange::new(MIN_CELSIUS, MAX_CELSIUS));
        assert!(report.min && report.max);
    }

    #[test]
    fn test_nan_and_infinities_are_clamped() {
        let (_, stored, report) = quantize(TemperatureRange::new(f64::NAN, f64::INFINITY));
        assert_eq!(stored, TemperatureRange::new(MIN_CELSIUS, MAX_CELSIUS));
        assert!(report.min && report.max);

        let (_, stored, _) = quantize(TemperatureRange::new(f64::NEG_INFINITY, 0.0));
        assert_eq!(stored.min, MIN_CELSIUS);
    }

    #[test]
    fn test_extra_precision_is_rounded_to_tenths() {
        let (_, stored, report) = quantize(TemperatureRange::new(12.34, 18.96));
        assert!(!report.any(), "rounding is not clamping");
        assert_eq!(stored, TemperatureRange::new(12.3, 19.0));
    }

    #[test]
    fn test_dequantize_rejects_values_above_documented_range() {
        assert!(dequantize([0, MAX_STORED + 1]).is_none());
        assert!(dequantize([2047, 0]).is_none());
    }
}
