//! Conversions between integer cents and decimal currency units.

use serde::Serializer;

/// Number of cents in one currency unit.
pub const CENTS_PER_UNIT: u64 = 100;

/// Denominator for rates expressed in basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Convert cents to currency units.
pub fn to_units(cents: u64) -> f64 {
    cents as f64 / CENTS_PER_UNIT as f64
}

/// Convert a positive, finite currency amount to cents (rounded to the nearest cent).
///
/// Returns `None` when the amount is not finite, not positive, rounds to zero
/// cents, or does not fit in a `u64`.
pub fn from_units(units: f64) -> Option<u64> {
    if !units.is_finite() || units <= 0.0 {
        return None;
    }
    let cents = (units * CENTS_PER_UNIT as f64).round();
    if cents < 1.0 || cents >= u64::MAX as f64 {
        return None;
    }
    Some(cents as u64)
}

/// Apply a basis-point rate to an amount, rounding down.
pub fn apply_bps(cents: u64, bps: u16) -> u64 {
    ((cents as u128 * bps as u128) / BPS_DENOMINATOR as u128) as u64
}

pub fn serialize_units<S: Serializer>(cents: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(to_units(*cents))
}

pub fn serialize_units_vec<S: Serializer>(
    cents: &[u64],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(cents.iter().map(|value| to_units(*value)))
}
