//! Quantity normalization against exchange lot-size constraints

use super::types::SymbolConstraints;

/// Absorbs binary representation error so exact step multiples survive the
/// floor (e.g. 0.003 / 0.001 evaluating to 2.9999999999999996).
const STEP_EPSILON: f64 = 1e-9;

/// Convert a desired quantity into an exchange-legal one.
///
/// Floors to the nearest multiple of `qty_step`, then rounds to the step's
/// implied decimal places with `f64::round` (half away from zero). The result
/// is a multiple of `qty_step` and never exceeds the input beyond float
/// tolerance. Quantities below `min_order_qty` are NOT rejected here; that is
/// the caller's responsibility.
pub fn normalize(desired_qty: f64, constraints: &SymbolConstraints) -> f64 {
    let steps = (desired_qty / constraints.qty_step + STEP_EPSILON).floor();
    round_to(steps * constraints.qty_step, constraints.qty_precision)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
