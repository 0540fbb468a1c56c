//! data — indicator tables shared by every allocation approach.
//!
//! Purpose
//! -------
//! Provide the single tabular container ([`IndicatorTable`]) used for inputs
//! (population, emissions, GDP, Gini, world pathways) and outputs (relative
//! shares), plus its error surface ([`TableError`]).
//!
//! Conventions
//! -----------
//! - Rows are keyed by `(unit_id, unit, category)`; columns are calendar years.
//! - Missing values are NaN in storage and `None` at the lookup API.
//! - The global aggregate row is identified by [`WORLD_ID`].

pub mod errors;
pub mod table;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{TableError, TableResult};
pub use self::table::{IndicatorTable, RowKey, SHARE_UNIT, ValueDomain, WORLD_ID, Year};

pub mod prelude {
    pub use super::errors::{TableError, TableResult};
    pub use super::table::{IndicatorTable, RowKey, ValueDomain, WORLD_ID, Year};
}
