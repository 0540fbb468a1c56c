//! Configuration and outcome types for the convergence-speed solver.
//!
//! - [`SpeedBounds`]: validated search interval for the speed.
//! - [`SolverOptions`]: root tolerance, iteration cap and verbosity.
//! - [`SpeedSolution`]: normalized result returned by [`solve_speed`](super::solve_speed).
use serde::{Deserialize, Serialize};

use crate::optimization::{
    errors::SolverResult,
    speed_solver::validation::{verify_bounds, verify_max_iter, verify_tol},
};

/// Smallest speed considered by the convergence allocators.
pub const MIN_CONVERGENCE_SPEED: f64 = 0.001;

/// Default upper bound on the convergence speed.
pub const DEFAULT_MAX_CONVERGENCE_SPEED: f64 = 0.9;

/// Search interval for the convergence speed.
///
/// Constructor:
/// - `new(lower, upper) -> SolverResult<Self>` — requires finite endpoints
///   with `0 <= lower < upper <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBounds {
    lower: f64,
    upper: f64,
}

impl SpeedBounds {
    pub fn new(lower: f64, upper: f64) -> SolverResult<Self> {
        verify_bounds(lower, upper)?;
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }
}

/// Root-finder configuration.
///
/// Fields:
/// - `tol: f64` — Brent tolerance on the speed and the width of the final
///   feasibility bisection.
/// - `max_iter: u64` — hard cap for both the Brent run and the bisection.
/// - `verbose: bool` — if `true`, attaches a slog observer (behind the
///   `obs_slog` feature).
///
/// Default:
/// - `tol = 1e-9`, `max_iter = 100`, `verbose = false`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub tol: f64,
    pub max_iter: u64,
    pub verbose: bool,
}

impl SolverOptions {
    /// Create validated solver options.
    ///
    /// # Errors
    /// - `SolverError::InvalidTolerance` for non-finite or non-positive `tol`.
    /// - `SolverError::InvalidMaxIter` if `max_iter == 0`.
    pub fn new(tol: f64, max_iter: u64, verbose: bool) -> SolverResult<Self> {
        verify_tol(tol)?;
        verify_max_iter(max_iter)?;
        Ok(Self { tol, max_iter, verbose })
    }

    /// Re-run the constructor checks, e.g. after deserialization.
    pub fn validate(&self) -> SolverResult<()> {
        verify_tol(self.tol)?;
        verify_max_iter(self.max_iter)
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self { tol: 1e-9, max_iter: 100, verbose: false }
    }
}

/// How a speed was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedMethod {
    /// Target already non-negative at the lower bound.
    LowerBound,
    /// Brent root, possibly nudged upward by the feasibility bisection.
    Root,
}

/// Canonical result returned by `solve_speed`.
///
/// - `speed`: smallest speed found with a non-negative target value.
/// - `margin`: target value at `speed` (always `>= 0`).
/// - `iterations`: Brent iterations plus bisection steps.
/// - `converged`: `true` if Brent terminated with `SolverConverged` (always
///   `true` for `LowerBound`).
/// - `status`: human-readable termination status string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSolution {
    pub speed: f64,
    pub margin: f64,
    pub iterations: u64,
    pub converged: bool,
    pub status: String,
    pub method: SpeedMethod,
}
