//! rust_fair_shares — equity-based fair-share allocations with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the allocation approaches to Python via the `_rust_fair_shares` extension
//! module. Given population, emissions, GDP and Gini data, the crate computes
//! each unit's relative share of a global carbon budget or of an annual global
//! emission pathway.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`data`, `allocation`, `optimization`) as
//!   the public crate surface.
//! - Define the `AllocationOutcome` `#[pyclass]`, the `run_allocation`
//!   `#[pyfunction]` and the `#[pymodule]` initializer for the
//!   `_rust_fair_shares` Python extension.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner Rust modules; this file performs
//!   only FFI glue, input conversion and error mapping.
//! - Every result handed to Python has already passed the sum-to-one check.
//!
//! Conventions
//! -----------
//! - Tables cross the boundary as `dict[str, dict[int, float]]`
//!   (`unit_id → year → value`); see [`utils`].
//! - Parameters cross the boundary as a JSON object, decoded into
//!   [`allocation::core::Parameters`] and validated against the approach's
//!   schema.
//! - Errors from core Rust code are converted to Python `ValueError`s at the
//!   PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`allocation`] directly and can ignore
//!   the items guarded by the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by the
//!   integration tests under `tests/`.

pub mod allocation;
pub mod data;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::collections::BTreeMap;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

#[cfg(feature = "python-bindings")]
use crate::{
    allocation::{
        core::{AllocationInputs, AllocationResult, Approach, Parameters},
        manager::AllocationManager,
    },
    data::table::{ValueDomain, WORLD_ID},
    utils::{NestedTable, table_from_nested, table_to_nested},
};

/// AllocationOutcome — Python-facing view of one allocation result.
///
/// Exposes the approach name, the relative shares as a nested dict, the
/// per-unit warnings and the recorded parameters (as JSON). The wrapped
/// [`AllocationResult`] is immutable.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_fair_shares.allocations", frozen)]
pub struct AllocationOutcome {
    inner: AllocationResult,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl AllocationOutcome {
    #[getter]
    pub fn approach(&self) -> String {
        self.inner.approach().name().to_string()
    }

    #[getter]
    pub fn is_budget(&self) -> bool {
        self.inner.is_budget()
    }

    /// Relative shares, `unit_id → year → share`.
    #[getter]
    pub fn shares(&self) -> NestedTable {
        table_to_nested(self.inner.relative_shares())
    }

    /// Excluded or downgraded units and the reason.
    #[getter]
    pub fn warnings(&self) -> BTreeMap<String, String> {
        self.inner.warnings().clone()
    }

    /// Parameters recorded by the allocator, as a JSON object.
    pub fn parameters_json(&self) -> PyResult<String> {
        serde_json::to_string(self.inner.parameters())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }
}

/// Run one allocation approach from Python.
///
/// - `approach`: kebab-case approach name, e.g. `"equal-per-capita-budget"`.
/// - `params_json`: JSON object of approach parameters (snake or kebab case).
/// - `population`, `emissions`, `gdp`, `gini`: `unit_id → year → value`.
/// - `world_pathway`: `{"World": {year: value}}`.
///
/// Raises `ValueError` for unknown approaches, invalid parameters, malformed
/// tables and allocation failures.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    signature = (
        approach,
        params_json,
        population,
        emissions = None,
        gdp = None,
        gini = None,
        world_pathway = None,
    ),
    text_signature = "(approach, params_json, population, /, emissions=None, gdp=None, \
                      gini=None, world_pathway=None)"
)]
pub fn run_allocation(
    approach: &str, params_json: &str, population: NestedTable, emissions: Option<NestedTable>,
    gdp: Option<NestedTable>, gini: Option<NestedTable>, world_pathway: Option<NestedTable>,
) -> PyResult<AllocationOutcome> {
    let approach: Approach = approach.parse()?;
    let params: Parameters = serde_json::from_str(params_json)
        .map_err(|e| PyValueError::new_err(format!("params_json is not a JSON object: {e}")))?;

    let population = table_from_nested(&population, "million", ValueDomain::NonNegative)?;
    let emissions = emissions
        .map(|rows| table_from_nested(&rows, "Mt CO2e", ValueDomain::Signed))
        .transpose()?;
    let gdp = gdp.map(|rows| table_from_nested(&rows, "USD", ValueDomain::NonNegative)).transpose()?;
    let gini = gini
        .map(|rows| table_from_nested(&rows, "dimensionless", ValueDomain::NonNegative))
        .transpose()?;
    let world = world_pathway
        .map(|rows| {
            if !rows.contains_key(WORLD_ID) {
                return Err(PyValueError::new_err(format!(
                    "world_pathway must contain a '{WORLD_ID}' row"
                )));
            }
            Ok(table_from_nested(&rows, "Mt CO2e", ValueDomain::Signed)?)
        })
        .transpose()?;

    let mut inputs = AllocationInputs::new(&population);
    if let Some(table) = &emissions {
        inputs = inputs.with_emissions(table);
    }
    if let Some(table) = &gdp {
        inputs = inputs.with_gdp(table);
    }
    if let Some(table) = &gini {
        inputs = inputs.with_gini(table);
    }
    if let Some(table) = &world {
        inputs = inputs.with_world_pathway(table);
    }

    let inner = AllocationManager::new(false).run_allocation(approach, &params, &inputs)?;
    Ok(AllocationOutcome { inner })
}

/// Names of every supported approach.
#[cfg(feature = "python-bindings")]
#[pyfunction]
pub fn approaches() -> Vec<&'static str> {
    Approach::ALL.iter().map(Approach::name).collect()
}

/// _rust_fair_shares — PyO3 module initializer for the Python extension.
///
/// Creates the `allocations` submodule, attaches it to the parent module and
/// registers it in `sys.modules` so `rust_fair_shares.allocations` imports
/// with dot notation.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_fair_shares<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let allocations_mod = PyModule::new(_py, "allocations")?;
    allocations(_py, m, &allocations_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_fair_shares.allocations", allocations_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn allocations<'py>(
    _py: Python, rust_fair_shares: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<AllocationOutcome>()?;
    m.add_function(wrap_pyfunction!(run_allocation, m)?)?;
    m.add_function(wrap_pyfunction!(approaches, m)?)?;
    rust_fair_shares.add_submodule(m)?;
    Ok(())
}
