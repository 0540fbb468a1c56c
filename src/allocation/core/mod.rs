//! core — shared building blocks of every allocation approach.
//!
//! Purpose
//! -------
//! Collect the pieces the budget and pathway allocators are assembled from:
//! adjustment weights and options, the responsibility/capability metrics and
//! their factors, the Gini subsistence correction, the deviation constraint,
//! the unit roster with its warnings, the approach enumeration and the
//! result value objects.
//!
//! Key behaviors
//! -------------
//! - Configuration lives in explicit structs ([`AdjustedOptions`],
//!   [`GiniOptions`], [`ConvergenceOptions`]) that are threaded through calls;
//!   there is no process-wide default state.
//! - [`Roster`] tracks which units take part in a computation and records a
//!   warning for every unit that is excluded or downgraded.
//! - [`combined_factors`] turns metrics into multiplicative factors and
//!   [`apply_deviation_constraint`] bounds the resulting shares.
//! - [`BudgetAllocationResult`] / [`PathwayAllocationResult`] check the
//!   sum-to-one invariant when constructed.
//!
//! Invariants & assumptions
//! ------------------------
//! - Input tables are immutable for the duration of a call; every function
//!   here borrows them.
//! - Zero weights, zero exponents and degenerate metrics all collapse to
//!   factors of exactly `1.0`, so the adjusted approaches reproduce equal per
//!   capita bit for bit.
//!
//! Conventions
//! -----------
//! - Unit order follows the population table; result rows appear in the same
//!   order, minus excluded units.
//! - Per-unit data gaps are warnings, global gaps are errors.
//!
//! Downstream usage
//! ----------------
//! - `allocation::budgets` and `allocation::pathways` compose these pieces.
//! - `allocation::manager` dispatches on [`Approach`] and collects
//!   [`AllocationResult`]s.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its own edge cases; the end-to-end
//!   properties (sum to one, zero-weight no-op, weight-ratio invariance) are
//!   covered by the integration tests under `tests/`.

pub mod adjustments;
pub mod approach;
pub mod deviation;
pub mod gini;
pub mod inputs;
pub mod options;
pub mod results;
pub mod shares;
pub mod weights;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::adjustments::{
    AdjustmentWindows, UnitMetric, adjustment_factors, capability_metric, combined_factors,
    responsibility_metric, roster_factors,
};
pub use self::approach::{Approach, ParameterSpec};
pub use self::deviation::apply_deviation_constraint;
pub use self::gini::{GiniAdjuster, validate_gini};
pub use self::inputs::AllocationInputs;
pub use self::options::{
    AdjustedOptions, CapabilityOptions, ConvergenceOptions, DEFAULT_HISTORICAL_RESPONSIBILITY_YEAR,
    DEFAULT_MAX_DEVIATION_SIGMA, DEFAULT_MAX_GINI_ADJUSTMENT, FunctionalForm, GiniOptions,
    ResponsibilityOptions,
};
pub use self::results::{
    AllocationResult, BudgetAllocationResult, ParameterValue, Parameters, PathwayAllocationResult,
};
pub use self::shares::{Roster, Warnings, normalize, shares_table, validate_sum_to_one};
pub use self::weights::AdjustmentWeights;

pub mod prelude {
    pub use super::approach::Approach;
    pub use super::inputs::AllocationInputs;
    pub use super::options::{
        AdjustedOptions, CapabilityOptions, ConvergenceOptions, FunctionalForm, GiniOptions,
        ResponsibilityOptions,
    };
    pub use super::results::{
        AllocationResult, BudgetAllocationResult, ParameterValue, Parameters,
        PathwayAllocationResult,
    };
    pub use super::shares::Warnings;
    pub use super::weights::AdjustmentWeights;
}
