//! pathways — multi-year share allocators.
//!
//! Purpose
//! -------
//! Allocate annual global emission levels across units, one share per unit
//! and year. Three families live here:
//!
//! - [`per_capita`]: each year computed independently from that year's
//!   population (optionally adjusted), with an optional historical-debt shift.
//! - [`per_capita_convergence`]: linear blend from current emission shares to
//!   population shares by a convergence year.
//! - [`cumulative_convergence`]: exponential convergence from current
//!   emission shares with the slowest speed that meets cumulative targets.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every output year sums to one within `1e-10`; results are validated on
//!   construction.
//! - Shares may be negative only after a historical-debt shift.

pub mod cumulative_convergence;
pub mod per_capita;
pub mod per_capita_convergence;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::cumulative_convergence::{
    ConvergenceProblem, ConvergenceSolution, cumulative_per_capita_convergence,
    cumulative_per_capita_convergence_adjusted, cumulative_per_capita_convergence_adjusted_gini,
    solve_convergence,
};
pub use self::per_capita::{
    HistoricalDebt, equal_per_capita, per_capita_adjusted, per_capita_adjusted_gini,
};
pub use self::per_capita_convergence::per_capita_convergence;
