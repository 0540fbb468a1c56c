//! Numerical stability utilities.
//!
//! Provides guarded forms of the decay transforms used to turn normalized
//! responsibility and capability metrics into multiplicative adjustment
//! factors, plus shared tolerances for degeneracy checks.
//!
//! # Provided items
//! - [`DEGENERACY_EPS`]: denominators at or below this magnitude are treated
//!   as zero (e.g. `1 - w` in the convergence closed form).
//! - [`SHARE_SUM_TOL`]: tolerance for "shares sum to one" checks.
//! - [`CUMULATIVE_REL_TOL`]: relative tolerance for cumulative-target checks.
//! - [`asinh_decay`], [`power_decay`], [`linear_decay`]: the three
//!   functional forms of the adjustment factor.
//! - [`guarded_ratio`]: division that reports degenerate denominators.
//!
//! # Rationale
//! `asinh` grows logarithmically, so `exp(-k·asinh(x))` stays in `(0, ∞)`
//! for any finite `x` without overflow. The power and linear forms are
//! clamped so factors never turn zero, negative or non-finite.

/// Magnitude at or below which a denominator is treated as zero.
pub const DEGENERACY_EPS: f64 = 1e-12;

/// Absolute tolerance for per-year share sums.
pub const SHARE_SUM_TOL: f64 = 1e-10;

/// Relative tolerance on cumulative shares reached by convergence pathways.
pub const CUMULATIVE_REL_TOL: f64 = 1e-6;

/// Lower clamp of the linear adjustment form.
pub const LINEAR_FACTOR_FLOOR: f64 = 1e-6;

/// `exp(-rate · asinh(x))`.
///
/// Equals `1` at `x = 0`, decreases for `x > 0` and increases for `x < 0`
/// when `rate > 0`.
pub fn asinh_decay(x: f64, rate: f64) -> f64 {
    (-rate * x.asinh()).exp()
}

/// `x^(-rate)` for `x > 0`; non-positive or non-finite inputs map to `1`.
pub fn power_decay(x: f64, rate: f64) -> f64 {
    if x > 0.0 && x.is_finite() { x.powf(-rate) } else { 1.0 }
}

/// `max(1 - rate · x, LINEAR_FACTOR_FLOOR)`.
pub fn linear_decay(x: f64, rate: f64) -> f64 {
    (1.0 - rate * x).max(LINEAR_FACTOR_FLOOR)
}

/// `num / den`, or `None` when `den` is degenerate or the ratio is not finite.
pub fn guarded_ratio(num: f64, den: f64) -> Option<f64> {
    if den.abs() <= DEGENERACY_EPS || !den.is_finite() {
        return None;
    }
    let ratio = num / den;
    ratio.is_finite().then_some(ratio)
}
