//! Indicator tables — validated (unit × year) matrices with NaN-coded gaps.
//!
//! Purpose
//! -------
//! Hold the tabular inputs and outputs of every allocation: population,
//! historical emissions, GDP, Gini coefficients, world pathways and the
//! relative shares produced by allocators. A table is a dense `Array2<f64>`
//! whose rows are keyed by [`RowKey`] and whose columns are calendar years.
//!
//! Key behaviors
//! -------------
//! - Validate shape, strictly increasing years, unique `(unit_id, category)`
//!   keys and the value domain at construction time.
//! - Expose lookups by unit and year that treat NaN as "missing" and return
//!   `None` rather than propagating NaN into arithmetic.
//! - Provide window sums and the world series used as global denominators.
//!
//! Invariants & assumptions
//! ------------------------
//! - `values.shape() == (keys.len(), years.len())` and both are non-empty.
//! - Stored values are either finite or NaN; infinities are rejected.
//! - Tables built with [`ValueDomain::NonNegative`] hold no negative values.
//!   Shares after historical-debt subtraction use [`ValueDomain::Signed`].
//!
//! Conventions
//! -----------
//! - [`WORLD_ID`] marks the global aggregate row. It is never treated as an
//!   allocation unit by [`IndicatorTable::unit_ids`].
//! - When a table carries several categories for one unit, unit lookups
//!   resolve to the first row; callers select a category with
//!   [`IndicatorTable::category`] beforehand.
use std::collections::{HashMap, HashSet};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::data::errors::{TableError, TableResult};

/// Calendar year used as a column label.
pub type Year = i32;

/// Identifier of the global aggregate row.
pub const WORLD_ID: &str = "World";

/// Physical unit attached to relative share rows.
pub const SHARE_UNIT: &str = "dimensionless";

/// Admissible value domain of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueDomain {
    NonNegative,
    Signed,
}

/// Row key: unit identifier, physical unit, optional emission category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub unit_id: String,
    pub unit: String,
    pub category: Option<String>,
}

impl RowKey {
    pub fn new(unit_id: impl Into<String>, unit: impl Into<String>) -> Self {
        Self { unit_id: unit_id.into(), unit: unit.into(), category: None }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Validated (unit × year) matrix.
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    keys: Vec<RowKey>,
    years: Vec<Year>,
    values: Array2<f64>,
    index: HashMap<String, usize>,
}

impl IndicatorTable {
    /// Build a table from row keys, year labels and a value matrix.
    ///
    /// # Errors
    /// - [`TableError::NoRows`] / [`TableError::NoYears`] for empty axes.
    /// - [`TableError::ShapeMismatch`] if `values` is not `(keys, years)`.
    /// - [`TableError::YearsNotIncreasing`] for unsorted or repeated years.
    /// - [`TableError::EmptyUnitId`] / [`TableError::DuplicateRow`] for bad keys.
    /// - [`TableError::NonFiniteValue`] for ±∞ and [`TableError::NegativeValue`]
    ///   for negative entries under [`ValueDomain::NonNegative`].
    pub fn new(
        keys: Vec<RowKey>, years: Vec<Year>, values: Array2<f64>, domain: ValueDomain,
    ) -> TableResult<Self> {
        if keys.is_empty() {
            return Err(TableError::NoRows);
        }
        if years.is_empty() {
            return Err(TableError::NoYears);
        }
        let expected = (keys.len(), years.len());
        if values.dim() != expected {
            return Err(TableError::ShapeMismatch { expected, found: values.dim() });
        }
        for (index, pair) in years.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(TableError::YearsNotIncreasing {
                    index: index + 1,
                    previous: pair[0],
                    found: pair[1],
                });
            }
        }

        let mut seen: HashMap<(&str, Option<&str>), usize> = HashMap::with_capacity(keys.len());
        let mut index = HashMap::with_capacity(keys.len());
        for (row, key) in keys.iter().enumerate() {
            if key.unit_id.is_empty() {
                return Err(TableError::EmptyUnitId { row });
            }
            if seen.insert((key.unit_id.as_str(), key.category.as_deref()), row).is_some() {
                return Err(TableError::DuplicateRow {
                    unit_id: key.unit_id.clone(),
                    category: key.category.clone(),
                });
            }
            index.entry(key.unit_id.clone()).or_insert(row);
        }

        for ((row, col), &value) in values.indexed_iter() {
            if value.is_nan() {
                continue;
            }
            if !value.is_finite() {
                return Err(TableError::NonFiniteValue {
                    unit_id: keys[row].unit_id.clone(),
                    year: years[col],
                    value,
                });
            }
            if domain == ValueDomain::NonNegative && value < 0.0 {
                return Err(TableError::NegativeValue {
                    unit_id: keys[row].unit_id.clone(),
                    year: years[col],
                    value,
                });
            }
        }

        Ok(Self { keys, years, values, index })
    }

    /// Convenience constructor for single-category tables sharing one unit.
    ///
    /// Each entry of `rows` is `(unit_id, values)` with `values.len() ==
    /// years.len()`; shorter or longer rows surface as a shape mismatch.
    pub fn from_rows(
        unit: &str, years: &[Year], rows: &[(&str, &[f64])], domain: ValueDomain,
    ) -> TableResult<Self> {
        let n_years = years.len();
        let mut values = Array2::from_elem((rows.len(), n_years), f64::NAN);
        let mut keys = Vec::with_capacity(rows.len());
        for (r, (unit_id, row)) in rows.iter().enumerate() {
            if row.len() != n_years {
                return Err(TableError::ShapeMismatch {
                    expected: (rows.len(), n_years),
                    found: (rows.len(), row.len()),
                });
            }
            values.row_mut(r).assign(&ArrayView1::from(*row));
            keys.push(RowKey::new(*unit_id, unit));
        }
        Self::new(keys, years.to_vec(), values, domain)
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_rows(&self) -> usize {
        self.keys.len()
    }

    pub fn first_year(&self) -> Year {
        self.years[0]
    }

    pub fn last_year(&self) -> Year {
        self.years[self.years.len() - 1]
    }

    pub fn year_index(&self, year: Year) -> Option<usize> {
        self.years.binary_search(&year).ok()
    }

    pub fn row_index(&self, unit_id: &str) -> Option<usize> {
        self.index.get(unit_id).copied()
    }

    pub fn has_unit(&self, unit_id: &str) -> bool {
        self.index.contains_key(unit_id)
    }

    /// Value for `unit_id` in `year`, or `None` when absent or NaN.
    pub fn value(&self, unit_id: &str, year: Year) -> Option<f64> {
        let row = self.row_index(unit_id)?;
        let col = self.year_index(year)?;
        let value = self.values[[row, col]];
        if value.is_nan() { None } else { Some(value) }
    }

    /// Full row for `unit_id`, NaN gaps included.
    pub fn row(&self, unit_id: &str) -> Option<ArrayView1<'_, f64>> {
        self.row_index(unit_id).map(|r| self.values.row(r))
    }

    /// Allocation units in row order, excluding [`WORLD_ID`].
    pub fn unit_ids(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.keys.len());
        let mut out: Vec<String> = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            if key.unit_id != WORLD_ID && seen.insert(key.unit_id.as_str()) {
                out.push(key.unit_id.clone());
            }
        }
        out
    }

    /// Years `>= start` present in the table.
    pub fn years_from(&self, start: Year) -> Vec<Year> {
        self.years.iter().copied().filter(|&y| y >= start).collect()
    }

    /// Years in the inclusive range `[start, end]` present in the table.
    pub fn years_between(&self, start: Year, end: Year) -> Vec<Year> {
        self.years.iter().copied().filter(|&y| y >= start && y <= end).collect()
    }

    /// True when the table's year axis spans the inclusive window `[start, end]`.
    pub fn covers(&self, start: Year, end: Year) -> bool {
        start <= end && self.first_year() <= start && self.last_year() >= end
    }

    /// Sum of the values of `unit_id` over `[start, end]`.
    ///
    /// Gaps are never skipped: an empty window sums to `0.0`, a window with a
    /// NaN cell is an error.
    ///
    /// # Errors
    /// - [`TableError::UnknownUnit`] if the table has no row for `unit_id`.
    /// - [`TableError::MissingValue`] for the first missing year in the window.
    pub fn window_sum(&self, unit_id: &str, start: Year, end: Year) -> TableResult<f64> {
        let row = self
            .row(unit_id)
            .ok_or_else(|| TableError::UnknownUnit { unit_id: unit_id.to_string() })?;
        let mut total = 0.0;
        for (col, &year) in self.years.iter().enumerate() {
            if year < start || year > end {
                continue;
            }
            let value = row[col];
            if value.is_nan() {
                return Err(TableError::MissingValue { unit_id: unit_id.to_string(), year });
            }
            total += value;
        }
        Ok(total)
    }

    /// Most recent non-missing value of `unit_id`.
    pub fn latest_value(&self, unit_id: &str) -> Option<f64> {
        let row = self.row(unit_id)?;
        row.iter().rev().copied().find(|v| !v.is_nan())
    }

    /// Global series aligned with [`IndicatorTable::years`].
    ///
    /// Uses the [`WORLD_ID`] row when present, otherwise the single row of a
    /// one-row table.
    ///
    /// # Errors
    /// - [`TableError::MissingWorldRow`] for multi-row tables without a world row.
    /// - [`TableError::MissingWorldValue`] when the series has a gap.
    pub fn world_series(&self) -> TableResult<Array1<f64>> {
        let row = match self.row_index(WORLD_ID) {
            Some(row) => row,
            None if self.keys.len() == 1 => 0,
            None => return Err(TableError::MissingWorldRow { rows: self.keys.len() }),
        };
        let series = self.values.row(row).to_owned();
        for (col, value) in series.iter().enumerate() {
            if value.is_nan() {
                return Err(TableError::MissingWorldValue { year: self.years[col] });
            }
        }
        Ok(series)
    }

    /// Sub-table restricted to rows of one emission category.
    ///
    /// # Errors
    /// [`TableError::NoRows`] if no row carries `category`.
    pub fn category(&self, category: &str) -> TableResult<IndicatorTable> {
        let rows: Vec<usize> = self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, k)| k.category.as_deref() == Some(category))
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            return Err(TableError::NoRows);
        }
        let keys = rows.iter().map(|&i| self.keys[i].clone()).collect();
        let values = self.values.select(Axis(0), &rows);
        Self::new(keys, self.years.clone(), values, ValueDomain::Signed)
    }
}
