//! Allocation manager — single runs, parameter grids and manifests.
//!
//! Purpose
//! -------
//! Map approach names and parameter combinations to allocator calls and
//! collect the outcomes into a manifest (one row per grid cell) and a
//! combined long-format share table for comparison and export.
//!
//! Key behaviors
//! -------------
//! - [`expand_grid`] turns `{name: [values...]}` into the cartesian product
//!   of parameter maps, in sorted key order.
//! - [`AllocationManager::run_grid`] evaluates every cell independently
//!   (with Rayon when `parallel` is set) over the same borrowed inputs. A
//!   failing cell is recorded as [`GridCellStatus::Failed`] and logged; it
//!   never aborts its siblings.
//! - Outcomes keep grid order regardless of parallel scheduling.
//!
//! Conventions
//! -----------
//! - Manifest rows carry the parameters that were requested; combined rows
//!   carry the parameters each allocator recorded (normalized weights,
//!   resolved defaults, solved speed).
use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    allocation::{
        core::{AllocationInputs, AllocationResult, Approach, ParameterValue, Parameters, Warnings},
        errors::{AllocResult, AllocationError, ErrorKind},
        request::AllocationRequest,
    },
    data::table::Year,
};

/// Parameter name → candidate values.
pub type ParameterGrid = BTreeMap<String, Vec<ParameterValue>>;

/// Cartesian product of the candidate values.
///
/// An empty grid yields one empty parameter map; a key with no candidates
/// yields no combinations at all.
pub fn expand_grid(grid: &ParameterGrid) -> Vec<Parameters> {
    grid.iter().fold(vec![Parameters::new()], |combos, (name, values)| {
        combos
            .iter()
            .flat_map(|combo| {
                values.iter().map(move |value| {
                    let mut next = combo.clone();
                    next.insert(name.clone(), value.clone());
                    next
                })
            })
            .collect()
    })
}

/// One approach/parameter combination of a grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub approach: Approach,
    pub parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GridCellStatus {
    Succeeded,
    Failed { kind: ErrorKind, message: String },
}

/// A grid cell together with its allocator outcome.
#[derive(Debug, Clone)]
pub struct GridOutcome {
    pub cell: GridCell,
    pub result: AllocResult<AllocationResult>,
}

impl GridOutcome {
    pub fn status(&self) -> GridCellStatus {
        match &self.result {
            Ok(_) => GridCellStatus::Succeeded,
            Err(err) => GridCellStatus::Failed { kind: err.kind(), message: err.to_string() },
        }
    }
}

/// Manifest entry: which cell ran, how it ended, what it warned about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestRow {
    pub approach: Approach,
    pub parameters: Parameters,
    pub status: GridCellStatus,
    pub warnings: Warnings,
}

/// One share of the combined long-format table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRow {
    pub approach: Approach,
    pub parameters: Parameters,
    pub unit_id: String,
    pub year: Year,
    pub share: f64,
    pub warning: Option<String>,
}

/// Outcomes of a grid run, in grid order.
#[derive(Debug, Clone, Default)]
pub struct GridRun {
    outcomes: Vec<GridOutcome>,
}

impl GridRun {
    pub fn outcomes(&self) -> &[GridOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &AllocationResult> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&GridCell, &AllocationError)> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err().map(|e| (&o.cell, e)))
    }

    pub fn manifest(&self) -> Vec<ManifestRow> {
        self.outcomes
            .iter()
            .map(|o| ManifestRow {
                approach: o.cell.approach,
                parameters: o.cell.parameters.clone(),
                status: o.status(),
                warnings: o.result.as_ref().map(|r| r.warnings().clone()).unwrap_or_default(),
            })
            .collect()
    }

    /// Long-format shares of every successful cell.
    pub fn combined_table(&self) -> Vec<CombinedRow> {
        let mut rows = Vec::new();
        for result in self.successes() {
            let table = result.relative_shares();
            let values = table.values();
            for (i, key) in table.keys().iter().enumerate() {
                let warning = result.warnings().get(&key.unit_id).cloned();
                for (j, &year) in table.years().iter().enumerate() {
                    rows.push(CombinedRow {
                        approach: result.approach(),
                        parameters: result.parameters().clone(),
                        unit_id: key.unit_id.clone(),
                        year,
                        share: values[[i, j]],
                        warning: warning.clone(),
                    });
                }
            }
        }
        rows
    }

    /// Manifest serialized as a JSON array.
    ///
    /// # Errors
    /// Non-finite parameter values cannot be represented in JSON.
    pub fn manifest_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.manifest())
    }
}

/// Dispatches requests and parameter grids to the allocators.
#[derive(Debug, Clone, Copy)]
pub struct AllocationManager {
    pub parallel: bool,
}

impl Default for AllocationManager {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl AllocationManager {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Decode `parameters` for `approach` and run the allocator.
    ///
    /// # Errors
    /// Parameter decoding errors and whatever the allocator returns.
    pub fn run_allocation(
        &self, approach: Approach, parameters: &Parameters, inputs: &AllocationInputs<'_>,
    ) -> AllocResult<AllocationResult> {
        AllocationRequest::from_parameters(approach, parameters)?.run(inputs)
    }

    /// Expand every grid of every approach and run all cells.
    ///
    /// Each approach maps to a list of grids; each grid is expanded
    /// independently, so mutually exclusive settings can live in separate
    /// grids of the same approach.
    pub fn run_grid(
        &self, grids: &BTreeMap<Approach, Vec<ParameterGrid>>, inputs: &AllocationInputs<'_>,
    ) -> GridRun {
        let cells: Vec<GridCell> = grids
            .iter()
            .flat_map(|(&approach, grids)| {
                grids
                    .iter()
                    .flat_map(expand_grid)
                    .map(move |parameters| GridCell { approach, parameters })
            })
            .collect();
        debug!(cells = cells.len(), parallel = self.parallel, "running allocation grid");

        let outcomes: Vec<GridOutcome> = if self.parallel {
            cells.into_par_iter().map(|cell| self.run_cell(cell, inputs)).collect()
        } else {
            cells.into_iter().map(|cell| self.run_cell(cell, inputs)).collect()
        };

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        debug!(total = outcomes.len(), failed, "allocation grid finished");
        GridRun { outcomes }
    }

    fn run_cell(&self, cell: GridCell, inputs: &AllocationInputs<'_>) -> GridOutcome {
        let result = self.run_allocation(cell.approach, &cell.parameters, inputs);
        if let Err(err) = &result {
            warn!(
                approach = cell.approach.name(),
                parameters = ?cell.parameters,
                kind = %err.kind(),
                "grid cell failed: {err}"
            );
        }
        GridOutcome { cell, result }
    }
}
