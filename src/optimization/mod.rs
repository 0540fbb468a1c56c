//! optimization — convergence-speed solver, numerical helpers, error surface.
//!
//! Purpose
//! -------
//! Provide the numerical layer underneath the allocators: an Argmin-backed
//! root-finder for the minimum convergence speed, guarded transforms for
//! adjustment factors, and a single solver error type.
//!
//! Key behaviors
//! -------------
//! - Expose [`speed_solver::solve_speed`], a pure function from speed bounds
//!   and a feasibility margin to the smallest feasible speed.
//! - Supply shared numerical primitives (`numerical_stability`) for decay
//!   transforms and degeneracy guards.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::SolverError`) with a common result
//!   alias (`SolverResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Solver inputs are validated on construction; invalid states are reported
//!   as `SolverError`, not panics.
//! - Feasibility margins are non-decreasing in the speed.
//!
//! Downstream usage
//! ----------------
//! - `allocation::pathways::cumulative_convergence` builds a margin closure
//!   over the closed-form long-run shares and calls `solve_speed`.
//! - Adjustment code in `allocation::core` uses the decay transforms.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover solver branches, argmin error
//!   conversions, and the transform clamps.

pub mod errors;
pub mod numerical_stability;
pub mod speed_solver;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_fair_shares::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{SolverError, SolverResult};
    pub use super::numerical_stability::prelude::*;
    pub use super::speed_solver::prelude::*;
}
