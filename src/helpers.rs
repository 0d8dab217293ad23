//! Shared numeric helpers for response values.
//!
//! Output figures are rounded to a fixed number of decimal places so that
//! responses stay stable and readable:
//!
//! - `round_1dp`: energy (kWh) and irradiance totals
//! - `round_2dp`: areas (m²)
//! - `round_3dp`: capacities (kW)
//!
//! All return `0.0` for non-finite inputs (NaN, ±Inf).

/// Days per month in a 365-day year, January first.
pub(crate) const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn round_dp(v: f64, dp: i32, name: &str) -> f64 {
    if !v.is_finite() {
        tracing::warn!("{} received non-finite value {}, defaulting to 0", name, v);
        return 0.0;
    }
    let factor = 10f64.powi(dp);
    (v * factor).round() / factor
}

/// Round to 1 decimal place.
pub(crate) fn round_1dp(v: f64) -> f64 {
    round_dp(v, 1, "round_1dp")
}

/// Round to 2 decimal places.
pub(crate) fn round_2dp(v: f64) -> f64 {
    round_dp(v, 2, "round_2dp")
}

/// Round to 3 decimal places.
pub(crate) fn round_3dp(v: f64) -> f64 {
    round_dp(v, 3, "round_3dp")
}

/// Round an optional value to 1 decimal place, returning None if input is None.
pub(crate) fn opt_round_1dp(v: Option<f64>) -> Option<f64> {
    v.map(round_1dp)
}
