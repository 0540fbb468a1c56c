//! Errors for indicator tables (shape checks, key uniqueness, value domains).
//!
//! [`TableError`] is raised while constructing or querying an
//! [`IndicatorTable`](crate::data::table::IndicatorTable). It converts into
//! [`AllocationError`](crate::allocation::errors::AllocationError) at the
//! allocation boundary and into a Python `ValueError` when the
//! `python-bindings` feature is enabled.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

use crate::data::table::Year;

/// Result alias for table construction and lookups.
pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    // ---- Shape ----
    /// A table needs at least one row.
    NoRows,

    /// A table needs at least one year column.
    NoYears,

    /// Value matrix does not match `(rows, years)`.
    ShapeMismatch { expected: (usize, usize), found: (usize, usize) },

    /// Year columns must be strictly increasing.
    YearsNotIncreasing { index: usize, previous: Year, found: Year },

    // ---- Keys ----
    /// Two rows share the same `(unit_id, category)` pair.
    DuplicateRow { unit_id: String, category: Option<String> },

    /// Unit identifiers must be non-empty.
    EmptyUnitId { row: usize },

    // ---- Values ----
    /// Values must be finite (missing values are stored as NaN).
    NonFiniteValue { unit_id: String, year: Year, value: f64 },

    /// Negative value in a table that only admits non-negative entries.
    NegativeValue { unit_id: String, year: Year, value: f64 },

    // ---- Lookups ----
    /// No world row was found and the table has more than one row.
    MissingWorldRow { rows: usize },

    /// The world row has no value for a year.
    MissingWorldValue { year: Year },

    /// No row exists for the unit.
    UnknownUnit { unit_id: String },

    /// A unit's row has a gap inside a queried window.
    MissingValue { unit_id: String, year: Year },
}

impl std::error::Error for TableError {}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shape ----
            TableError::NoRows => write!(f, "Indicator table has no rows"),
            TableError::NoYears => write!(f, "Indicator table has no year columns"),
            TableError::ShapeMismatch { expected, found } => {
                write!(f, "Value matrix shape mismatch: expected {expected:?}, found {found:?}")
            }
            TableError::YearsNotIncreasing { index, previous, found } => {
                write!(
                    f,
                    "Years must be strictly increasing: column {index} holds {found} after {previous}"
                )
            }

            // ---- Keys ----
            TableError::DuplicateRow { unit_id, category } => match category {
                Some(category) => {
                    write!(f, "Duplicate row for unit '{unit_id}' in category '{category}'")
                }
                None => write!(f, "Duplicate row for unit '{unit_id}'"),
            },
            TableError::EmptyUnitId { row } => write!(f, "Row {row} has an empty unit id"),

            // ---- Values ----
            TableError::NonFiniteValue { unit_id, year, value } => {
                write!(f, "Non-finite value {value} for unit '{unit_id}' in {year}")
            }
            TableError::NegativeValue { unit_id, year, value } => {
                write!(f, "Negative value {value} for unit '{unit_id}' in {year}")
            }

            // ---- Lookups ----
            TableError::MissingWorldRow { rows } => {
                write!(f, "No world row found among {rows} rows")
            }
            TableError::MissingWorldValue { year } => {
                write!(f, "World series has no value for {year}")
            }
            TableError::UnknownUnit { unit_id } => write!(f, "No row for unit '{unit_id}'"),
            TableError::MissingValue { unit_id, year } => {
                write!(f, "Unit '{unit_id}' has no value for {year}")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<TableError> for PyErr {
    fn from(err: TableError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
