//! allocation — fair-share allocators, their dispatch and parameter grids.
//!
//! Purpose
//! -------
//! Turn population, emissions, GDP and Gini tables into relative shares of a
//! global carbon budget (single year) or of a global emission pathway (one
//! share per unit and year), for ten named approaches.
//!
//! Key behaviors
//! -------------
//! - [`budgets`]: equal per capita and responsibility/capability-adjusted
//!   budget shares, with optional Gini correction.
//! - [`pathways`]: per-year per-capita shares (optionally with historical
//!   debt), linear per-capita convergence and cumulative per-capita
//!   convergence with a solved minimum speed.
//! - [`request`]: one typed [`AllocationRequest`] per approach, decoded from
//!   loose parameter maps and dispatched with an exhaustive `match`.
//! - [`manager`]: runs a single request or a whole parameter grid (in
//!   parallel with Rayon) and records a manifest row per grid cell.
//!
//! Invariants & assumptions
//! ------------------------
//! - Allocators are pure functions of their inputs and options; nothing is
//!   cached between calls.
//! - Every successful result sums to one per year within `1e-10`.
//! - Per-unit data gaps exclude the unit with a warning; global gaps fail
//!   the call with [`AllocationError`].
//!
//! Downstream usage
//! ----------------
//! - Rust callers either call the allocator functions directly or build an
//!   [`AllocationRequest`] and run it through [`AllocationManager`].
//! - The Python bindings in the crate root decode a JSON parameter map into a
//!   request and return the shares as plain dictionaries.
//!
//! Testing notes
//! -------------
//! - Allocator edge cases are unit-tested next to each allocator; end-to-end
//!   properties live in `tests/integration_allocation_pipeline.rs`.

pub mod budgets;
pub mod core;
pub mod errors;
pub mod manager;
pub mod pathways;
pub mod request;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::budgets::{
    equal_per_capita_budget, per_capita_adjusted_budget, per_capita_adjusted_gini_budget,
};
pub use self::errors::{AllocResult, AllocationError, ErrorKind};
pub use self::manager::{
    AllocationManager, GridCell, GridCellStatus, GridRun, ParameterGrid, expand_grid,
};
pub use self::pathways::{
    HistoricalDebt, cumulative_per_capita_convergence, cumulative_per_capita_convergence_adjusted,
    cumulative_per_capita_convergence_adjusted_gini, equal_per_capita, per_capita_adjusted,
    per_capita_adjusted_gini, per_capita_convergence,
};
pub use self::request::AllocationRequest;

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::errors::{AllocResult, AllocationError, ErrorKind};
    pub use super::manager::{AllocationManager, GridRun, ParameterGrid};
    pub use super::pathways::HistoricalDebt;
    pub use super::request::AllocationRequest;
}
