//! Errors for allocation runs (parameter validation, missing data,
//! infeasible convergence, numerical degeneracy).
//!
//! [`AllocationError`] is the single error type returned by allocators, the
//! approach dispatcher and the manager. Each variant belongs to one
//! [`ErrorKind`], which the manager records in its manifest when a grid cell
//! fails. Per-unit data gaps are *not* errors: affected units are excluded
//! and reported through the result's warnings.
//!
//! ## Conventions
//! - Messages name the offending parameter, unit and year where applicable.
//! - Table and solver errors are wrapped, not flattened, so callers can match
//!   on the original variant.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    data::{errors::TableError, table::Year},
    optimization::errors::SolverError,
};

/// Crate-wide result alias for allocation operations.
pub type AllocResult<T> = Result<T, AllocationError>;

/// Coarse classification of allocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    MissingData,
    ConvergenceInfeasible,
    NumericDegeneracy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::MissingData => write!(f, "missing-data"),
            ErrorKind::ConvergenceInfeasible => write!(f, "convergence-infeasible"),
            ErrorKind::NumericDegeneracy => write!(f, "numeric-degeneracy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllocationError {
    // ---- Parameter validation ----
    /// Adjustment weights must be finite and in `[0, 1]`.
    InvalidWeight { name: &'static str, value: f64, reason: &'static str },

    /// Exponents must be finite and non-negative.
    InvalidExponent { name: &'static str, value: f64 },

    /// Gini coefficients must lie in `[0, 1)`.
    InvalidGini { unit_id: String, value: f64 },

    /// Income floor must be finite and non-negative.
    InvalidIncomeFloor { value: f64 },

    /// Maximum Gini reduction must lie in `[0, 1]`.
    InvalidMaxGiniAdjustment { value: f64 },

    /// Deviation bound must be finite and non-negative.
    InvalidDeviationSigma { value: f64 },

    /// Maximum convergence speed must lie in `(0.001, 1]`.
    InvalidConvergenceSpeed { value: f64, reason: &'static str },

    /// Two years do not form a usable range.
    InvalidYearRange { start: Year, end: Year, reason: &'static str },

    /// An indicator does not cover an accounting window.
    WindowNotCovered { indicator: &'static str, start: Year, end: Year },

    /// An approach needs an input table that was not supplied.
    MissingRequiredInput { indicator: &'static str, approach: String },

    /// A grid or Python parameter is unknown, missing or mistyped.
    InvalidParameter { approach: String, name: String, reason: String },

    /// No approach is registered under this name.
    UnknownApproach { name: String },

    /// Input or output table failed validation.
    Table(TableError),

    // ---- Missing data ----
    /// A global denominator is absent for a year.
    MissingGlobalTotal { indicator: &'static str, year: Year },

    /// A global total is zero, negative or not finite.
    DegenerateGlobalTotal { indicator: &'static str, value: f64 },

    /// Every unit was excluded for missing data.
    NoUnitsRemaining { indicator: &'static str },

    // ---- Convergence ----
    /// No speed in `[0.001, max]` keeps every long-run share in `[0, 1]`.
    ConvergenceInfeasible { unit_id: String, shortfall: f64, max_speed: f64 },

    /// Achieved cumulative share misses the target beyond tolerance.
    CumulativeTargetMissed { unit_id: String, target: f64, achieved: f64 },

    // ---- Numerics ----
    /// Relative shares of a year do not sum to one.
    SharesDoNotSumToOne { year: Year, sum: f64 },

    /// A computed quantity left the finite domain.
    NumericDegeneracy { context: &'static str, value: f64 },

    /// Convergence-speed solver failure.
    Solver(SolverError),
}

impl AllocationError {
    /// Classification recorded by the manager.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AllocationError::InvalidWeight { .. }
            | AllocationError::InvalidExponent { .. }
            | AllocationError::InvalidGini { .. }
            | AllocationError::InvalidIncomeFloor { .. }
            | AllocationError::InvalidMaxGiniAdjustment { .. }
            | AllocationError::InvalidDeviationSigma { .. }
            | AllocationError::InvalidConvergenceSpeed { .. }
            | AllocationError::InvalidYearRange { .. }
            | AllocationError::WindowNotCovered { .. }
            | AllocationError::MissingRequiredInput { .. }
            | AllocationError::InvalidParameter { .. }
            | AllocationError::UnknownApproach { .. }
            | AllocationError::Table(_) => ErrorKind::Validation,
            AllocationError::MissingGlobalTotal { .. }
            | AllocationError::DegenerateGlobalTotal { .. }
            | AllocationError::NoUnitsRemaining { .. } => ErrorKind::MissingData,
            AllocationError::ConvergenceInfeasible { .. }
            | AllocationError::CumulativeTargetMissed { .. } => ErrorKind::ConvergenceInfeasible,
            AllocationError::Solver(err) if err.is_configuration() => ErrorKind::Validation,
            AllocationError::Solver(SolverError::NoFeasibleSpeed { .. }) => {
                ErrorKind::ConvergenceInfeasible
            }
            AllocationError::SharesDoNotSumToOne { .. }
            | AllocationError::NumericDegeneracy { .. }
            | AllocationError::Solver(_) => ErrorKind::NumericDegeneracy,
        }
    }
}

impl std::error::Error for AllocationError {}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Parameter validation ----
            AllocationError::InvalidWeight { name, value, reason } => {
                write!(f, "Invalid weight '{name}' = {value}: {reason}")
            }
            AllocationError::InvalidExponent { name, value } => {
                write!(f, "Invalid exponent '{name}' = {value}, must be finite and >= 0")
            }
            AllocationError::InvalidGini { unit_id, value } => {
                write!(f, "Invalid Gini coefficient {value} for unit '{unit_id}', must be in [0, 1)")
            }
            AllocationError::InvalidIncomeFloor { value } => {
                write!(f, "Invalid income floor {value}, must be finite and >= 0")
            }
            AllocationError::InvalidMaxGiniAdjustment { value } => {
                write!(f, "Invalid max_gini_adjustment {value}, must be in [0, 1]")
            }
            AllocationError::InvalidDeviationSigma { value } => {
                write!(f, "Invalid max_deviation_sigma {value}, must be finite and >= 0")
            }
            AllocationError::InvalidConvergenceSpeed { value, reason } => {
                write!(f, "Invalid max_convergence_speed {value}: {reason}")
            }
            AllocationError::InvalidYearRange { start, end, reason } => {
                write!(f, "Invalid year range {start}..={end}: {reason}")
            }
            AllocationError::WindowNotCovered { indicator, start, end } => {
                write!(f, "{indicator} data do not cover the window {start}..={end}")
            }
            AllocationError::MissingRequiredInput { indicator, approach } => {
                write!(f, "Approach '{approach}' requires {indicator} data")
            }
            AllocationError::InvalidParameter { approach, name, reason } => {
                write!(f, "Invalid parameter '{name}' for approach '{approach}': {reason}")
            }
            AllocationError::UnknownApproach { name } => {
                write!(f, "Unknown allocation approach '{name}'")
            }
            AllocationError::Table(err) => write!(f, "Table error: {err}"),

            // ---- Missing data ----
            AllocationError::MissingGlobalTotal { indicator, year } => {
                write!(f, "Missing global {indicator} total for {year}")
            }
            AllocationError::DegenerateGlobalTotal { indicator, value } => {
                write!(f, "Degenerate global {indicator} total: {value}")
            }
            AllocationError::NoUnitsRemaining { indicator } => {
                write!(f, "No units remain after excluding those with missing {indicator} data")
            }

            // ---- Convergence ----
            AllocationError::ConvergenceInfeasible { unit_id, shortfall, max_speed } => {
                write!(
                    f,
                    "Convergence infeasible up to speed {max_speed}: unit '{unit_id}' misses the \
                     admissible long-run share range by {shortfall}"
                )
            }
            AllocationError::CumulativeTargetMissed { unit_id, target, achieved } => {
                write!(
                    f,
                    "Cumulative share of unit '{unit_id}' is {achieved}, target was {target}"
                )
            }

            // ---- Numerics ----
            AllocationError::SharesDoNotSumToOne { year, sum } => {
                write!(f, "Relative shares for {year} sum to {sum}, expected 1")
            }
            AllocationError::NumericDegeneracy { context, value } => {
                write!(f, "Numeric degeneracy in {context}: {value}")
            }
            AllocationError::Solver(err) => write!(f, "Solver error: {err}"),
        }
    }
}

impl From<TableError> for AllocationError {
    fn from(err: TableError) -> Self {
        AllocationError::Table(err)
    }
}

impl From<SolverError> for AllocationError {
    fn from(err: SolverError) -> Self {
        AllocationError::Solver(err)
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<AllocationError> for PyErr {
    fn from(err: AllocationError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify the error-kind classification used by the manager manifest.
    //
    // Given
    // -----
    // - One representative variant per category, plus solver errors of each
    //   flavour.
    //
    // Expect
    // ------
    // - Each variant reports the expected `ErrorKind`.
    fn kind_classifies_variants() {
        assert_eq!(
            AllocationError::InvalidExponent { name: "responsibility_exponent", value: -1.0 }
                .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AllocationError::MissingGlobalTotal { indicator: "population", year: 2020 }.kind(),
            ErrorKind::MissingData
        );
        assert_eq!(
            AllocationError::ConvergenceInfeasible {
                unit_id: "AAA".into(),
                shortfall: 0.1,
                max_speed: 0.9
            }
            .kind(),
            ErrorKind::ConvergenceInfeasible
        );
        assert_eq!(
            AllocationError::from(SolverError::InvalidTolerance { tol: 0.0, reason: "" }).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AllocationError::from(SolverError::NoFeasibleSpeed { upper: 0.9, margin: -0.1 })
                .kind(),
            ErrorKind::ConvergenceInfeasible
        );
        assert_eq!(
            AllocationError::from(SolverError::MissingRoot).kind(),
            ErrorKind::NumericDegeneracy
        );
    }

    #[test]
    // Purpose
    // -------
    // Ensure messages carry the offending unit and magnitude.
    //
    // Given
    // -----
    // - A `ConvergenceInfeasible` error for unit "BBB".
    //
    // Expect
    // ------
    // - The rendered message names the unit and the shortfall.
    fn display_names_unit_and_shortfall() {
        let err = AllocationError::ConvergenceInfeasible {
            unit_id: "BBB".into(),
            shortfall: 0.25,
            max_speed: 0.9,
        };
        let msg = err.to_string();
        assert!(msg.contains("'BBB'"));
        assert!(msg.contains("0.25"));
    }
}
