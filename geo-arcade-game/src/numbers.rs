//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the u64 range, returning 0 for NaN or negative values.
#[must_use]
pub fn round_f64_to_u64(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    let clamped = value.min(max).round();
    cast::<f64, u64>(clamped).unwrap_or(u64::MAX)
}

/// Round a f64 and clamp it to the u32 range, returning 0 for NaN or negative values.
#[must_use]
pub fn round_f64_to_u32(value: f64) -> u32 {
    u32::try_from(round_f64_to_u64(value)).unwrap_or(u32::MAX)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert u32 to f64 (lossless).
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Derived density: people per square kilometre, rounded to the nearest integer.
///
/// Returns `None` when the area is not a positive finite number.
#[must_use]
pub fn density(population: u64, area: f64) -> Option<u64> {
    if !area.is_finite() || area <= 0.0 {
        return None;
    }
    Some(round_f64_to_u64(u64_to_f64(population) / area))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f64_to_u64(1.6), 2);
        assert_eq!(round_f64_to_u64(2.5), 3);
        assert_eq!(round_f64_to_u64(f64::NAN), 0);
        assert_eq!(round_f64_to_u64(-4.0), 0);
        assert_eq!(round_f64_to_u32(f64::from(u32::MAX) * 2.0), u32::MAX);
    }

    #[test]
    fn density_rounds_and_rejects_bad_area() {
        assert_eq!(density(1_000, 3.0), Some(333));
        assert_eq!(density(1_000, 600.0), Some(2));
        assert_eq!(density(10, 0.0), None);
        assert_eq!(density(10, f64::INFINITY), None);
    }
}
