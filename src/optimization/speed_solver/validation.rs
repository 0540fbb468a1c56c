//! Validation helpers for the convergence-speed solver.
//!
//! - **Bound checks**: [`verify_bounds`] ensures `0 <= lower < upper <= 1`
//!   with finite endpoints.
//! - **Tolerance checks**: [`verify_tol`] and [`verify_max_iter`] mirror the
//!   usual positive-and-finite rules.
//! - **Target values**: [`validate_target`] rejects NaN/±∞ evaluations.
use crate::optimization::errors::{SolverError, SolverResult};

/// Validate speed bounds.
///
/// # Errors
/// Returns [`SolverError::InvalidBounds`] if an endpoint is non-finite, the
/// interval is empty, or it leaves `[0, 1]`.
pub fn verify_bounds(lower: f64, upper: f64) -> SolverResult<()> {
    if !lower.is_finite() || !upper.is_finite() {
        return Err(SolverError::InvalidBounds { lower, upper, reason: "Bounds must be finite." });
    }
    if lower < 0.0 || upper > 1.0 {
        return Err(SolverError::InvalidBounds {
            lower,
            upper,
            reason: "Bounds must lie within [0, 1].",
        });
    }
    if lower >= upper {
        return Err(SolverError::InvalidBounds {
            lower,
            upper,
            reason: "Lower bound must be strictly below the upper bound.",
        });
    }
    Ok(())
}

/// Validate the root tolerance.
///
/// # Errors
/// Returns [`SolverError::InvalidTolerance`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol(tol: f64) -> SolverResult<()> {
    if !tol.is_finite() {
        return Err(SolverError::InvalidTolerance { tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(SolverError::InvalidTolerance { tol, reason: "Tolerance must be positive." });
    }
    Ok(())
}

/// Validate the iteration cap.
///
/// # Errors
/// Returns [`SolverError::InvalidMaxIter`] if `max_iter == 0`.
pub fn verify_max_iter(max_iter: u64) -> SolverResult<()> {
    if max_iter == 0 {
        return Err(SolverError::InvalidMaxIter {
            max_iter,
            reason: "Maximum iterations must be greater than zero.",
        });
    }
    Ok(())
}

/// Validate a target-function value at `speed`.
///
/// # Errors
/// Returns [`SolverError::NonFiniteTarget`] if the value is `NaN` or infinite.
pub fn validate_target(speed: f64, value: f64) -> SolverResult<f64> {
    if !value.is_finite() {
        return Err(SolverError::NonFiniteTarget { speed, value });
    }
    Ok(value)
}
