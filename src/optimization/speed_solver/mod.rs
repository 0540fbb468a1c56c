//! speed_solver — argmin-powered search for the minimum convergence speed.
//!
//! Purpose
//! -------
//! Provide a pure, reusable routine that finds the smallest convergence speed
//! at which a caller-supplied feasibility margin becomes non-negative. The
//! cumulative per-capita convergence allocators use it to pick the gentlest
//! exponential approach that still lands every unit on its cumulative target.
//!
//! Key behaviors
//! -------------
//! - Bridge a plain closure `speed -> margin` into `argmin` via
//!   [`adapter::SpeedProblem`] and run `BrentRoot` through [`run::run_brent`].
//! - Short-circuit when the lower bound is already feasible and fail fast when
//!   the upper bound is not.
//! - Guarantee that the returned speed is on the feasible side of the root by
//!   a final bisection between the Brent iterate and the upper bound.
//!
//! Invariants & assumptions
//! ------------------------
//! - The margin is non-decreasing in the speed on the search interval; under
//!   that assumption the result is the minimum feasible speed up to `tol`.
//! - Bounds satisfy `0 <= lower < upper <= 1` and options are validated on
//!   construction ([`SpeedBounds::new`], [`SolverOptions::new`]).
//!
//! Conventions
//! -----------
//! - Errors bubble up as [`SolverResult<T>`](crate::optimization::errors::SolverResult);
//!   raw `argmin` errors never leak to callers.
//! - The solver never mutates global state. Logging of the outcome is left to
//!   the allocators; the optional slog observer only traces Brent iterations.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`api`] cover the lower-bound, root and infeasible branches,
//!   step-function refinement, and input validation.

pub mod adapter;
pub mod api;
pub mod run;
pub mod traits;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::solve_speed;
pub use self::traits::{
    DEFAULT_MAX_CONVERGENCE_SPEED, MIN_CONVERGENCE_SPEED, SolverOptions, SpeedBounds, SpeedMethod,
    SpeedSolution,
};

pub mod prelude {
    pub use super::api::solve_speed;
    pub use super::traits::{SolverOptions, SpeedBounds, SpeedSolution};
}
