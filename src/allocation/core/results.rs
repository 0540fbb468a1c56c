//! Allocation results — immutable value objects with provenance.
//!
//! Purpose
//! -------
//! Carry the relative shares produced by one allocator call together with the
//! approach identifier, the parameters that produced them and the per-unit
//! warnings raised along the way.
//!
//! Key behaviors
//! -------------
//! - [`BudgetAllocationResult`] holds exactly one year column;
//!   [`PathwayAllocationResult`] holds one or more.
//! - Both validate on construction that every year sums to one within
//!   `1e-10`.
//! - Both project relative shares onto absolute quantities
//!   ([`BudgetAllocationResult::absolute_budgets`],
//!   [`PathwayAllocationResult::absolute_emissions`]) without recomputation.
//!
//! Conventions
//! -----------
//! - Parameters are recorded as a sorted map of [`ParameterValue`]s so they
//!   serialize deterministically into manifests.
//! - Excluded units are absent from the share table and present in the
//!   warnings map.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    allocation::{
        core::{
            approach::Approach,
            shares::{Warnings, validate_sum_to_one},
        },
        errors::{AllocResult, AllocationError},
    },
    data::table::{IndicatorTable, RowKey, ValueDomain, Year},
};

/// Provenance map: parameter name → value.
pub type Parameters = BTreeMap<String, ParameterValue>;

/// Serde-friendly scalar used in provenance maps and parameter grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl ParameterValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integers are also accepted as floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(x) => Some(*x),
            ParameterValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integral floats (e.g. `2020.0`) are also accepted as integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(i) => Some(*i),
            ParameterValue::Float(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParameterValue::Null)
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Int(i) => write!(f, "{i}"),
            ParameterValue::Float(x) => write!(f, "{x}"),
            ParameterValue::Text(s) => write!(f, "{s}"),
            ParameterValue::Null => write!(f, "none"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<Year> for ParameterValue {
    fn from(value: Year) -> Self {
        ParameterValue::Int(value.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParameterValue::Null, Into::into)
    }
}

/// Single-year allocation of a cumulative budget.
#[derive(Debug, Clone)]
pub struct BudgetAllocationResult {
    approach: Approach,
    parameters: Parameters,
    relative_shares: IndicatorTable,
    warnings: Warnings,
}

impl BudgetAllocationResult {
    /// # Errors
    /// - [`AllocationError::InvalidYearRange`] unless `relative_shares` has
    ///   exactly one year column.
    /// - [`AllocationError::SharesDoNotSumToOne`] if the column does not sum to one.
    pub fn new(
        approach: Approach, parameters: Parameters, relative_shares: IndicatorTable,
        warnings: Warnings,
    ) -> AllocResult<Self> {
        if relative_shares.years().len() != 1 {
            return Err(AllocationError::InvalidYearRange {
                start: relative_shares.first_year(),
                end: relative_shares.last_year(),
                reason: "Budget results hold exactly one year column.",
            });
        }
        validate_sum_to_one(&relative_shares)?;
        Ok(Self { approach, parameters, relative_shares, warnings })
    }

    pub fn approach(&self) -> Approach {
        self.approach
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn relative_shares(&self) -> &IndicatorTable {
        &self.relative_shares
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn year(&self) -> Year {
        self.relative_shares.first_year()
    }

    pub fn share(&self, unit_id: &str) -> Option<f64> {
        self.relative_shares.value(unit_id, self.year())
    }

    /// Multiply relative shares by a global budget.
    ///
    /// # Errors
    /// [`AllocationError::NumericDegeneracy`] for a non-finite budget.
    pub fn absolute_budgets(&self, global_budget: f64, unit: &str) -> AllocResult<IndicatorTable> {
        if !global_budget.is_finite() {
            return Err(AllocationError::NumericDegeneracy {
                context: "global budget",
                value: global_budget,
            });
        }
        let values = self.relative_shares.values().mapv(|s| s * global_budget);
        project(&self.relative_shares, values, unit)
    }
}

/// Multi-year allocation of an annual pathway.
#[derive(Debug, Clone)]
pub struct PathwayAllocationResult {
    approach: Approach,
    parameters: Parameters,
    relative_shares: IndicatorTable,
    warnings: Warnings,
}

impl PathwayAllocationResult {
    /// # Errors
    /// [`AllocationError::SharesDoNotSumToOne`] if any year does not sum to one.
    pub fn new(
        approach: Approach, parameters: Parameters, relative_shares: IndicatorTable,
        warnings: Warnings,
    ) -> AllocResult<Self> {
        validate_sum_to_one(&relative_shares)?;
        Ok(Self { approach, parameters, relative_shares, warnings })
    }

    pub fn approach(&self) -> Approach {
        self.approach
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn relative_shares(&self) -> &IndicatorTable {
        &self.relative_shares
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn years(&self) -> &[Year] {
        self.relative_shares.years()
    }

    pub fn share(&self, unit_id: &str, year: Year) -> Option<f64> {
        self.relative_shares.value(unit_id, year)
    }

    /// Multiply each year's shares by the world pathway value of that year.
    ///
    /// The output unit is taken from the world row's key.
    ///
    /// # Errors
    /// - Table errors if `world` has no usable world series.
    /// - [`AllocationError::MissingGlobalTotal`] if a result year is absent
    ///   from `world`.
    pub fn absolute_emissions(&self, world: &IndicatorTable) -> AllocResult<IndicatorTable> {
        let series = world.world_series()?;
        let mut values = self.relative_shares.values().to_owned();
        for (col, &year) in self.relative_shares.years().iter().enumerate() {
            let w = world
                .year_index(year)
                .map(|i| series[i])
                .ok_or(AllocationError::MissingGlobalTotal { indicator: "world pathway", year })?;
            values.column_mut(col).mapv_inplace(|s| s * w);
        }
        let unit = world.keys()[0].unit.clone();
        project(&self.relative_shares, values, &unit)
    }
}

/// Result of one allocator call.
#[derive(Debug, Clone)]
pub enum AllocationResult {
    Budget(BudgetAllocationResult),
    Pathway(PathwayAllocationResult),
}

impl AllocationResult {
    pub fn approach(&self) -> Approach {
        match self {
            AllocationResult::Budget(r) => r.approach(),
            AllocationResult::Pathway(r) => r.approach(),
        }
    }

    pub fn parameters(&self) -> &Parameters {
        match self {
            AllocationResult::Budget(r) => r.parameters(),
            AllocationResult::Pathway(r) => r.parameters(),
        }
    }

    pub fn relative_shares(&self) -> &IndicatorTable {
        match self {
            AllocationResult::Budget(r) => r.relative_shares(),
            AllocationResult::Pathway(r) => r.relative_shares(),
        }
    }

    pub fn warnings(&self) -> &Warnings {
        match self {
            AllocationResult::Budget(r) => r.warnings(),
            AllocationResult::Pathway(r) => r.warnings(),
        }
    }

    pub fn is_budget(&self) -> bool {
        matches!(self, AllocationResult::Budget(_))
    }
}

impl From<BudgetAllocationResult> for AllocationResult {
    fn from(result: BudgetAllocationResult) -> Self {
        AllocationResult::Budget(result)
    }
}

impl From<PathwayAllocationResult> for AllocationResult {
    fn from(result: PathwayAllocationResult) -> Self {
        AllocationResult::Pathway(result)
    }
}

fn project(
    shares: &IndicatorTable, values: ndarray::Array2<f64>, unit: &str,
) -> AllocResult<IndicatorTable> {
    let keys = shares.keys().iter().map(|k| RowKey::new(k.unit_id.as_str(), unit)).collect();
    Ok(IndicatorTable::new(keys, shares.years().to_vec(), values, ValueDomain::Signed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{allocation::core::shares::shares_table, data::table::WORLD_ID};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn units() -> Vec<String> {
        vec!["AAA".to_string(), "BBB".to_string()]
    }

    #[test]
    // Purpose
    // -------
    // Verify that budget projections multiply shares by the global budget.
    //
    // Given
    // -----
    // - Shares {AAA: 0.25, BBB: 0.75} and a budget of 400.
    //
    // Expect
    // ------
    // - Absolute budgets {AAA: 100, BBB: 300} in the requested unit.
    fn absolute_budgets_scale_shares() {
        // Arrange
        let shares = shares_table(&units(), &[2020], array![[0.25], [0.75]]).expect("table");
        let result = BudgetAllocationResult::new(
            Approach::EqualPerCapitaBudget,
            Parameters::new(),
            shares,
            Warnings::new(),
        )
        .expect("valid result");

        // Act
        let absolute = result.absolute_budgets(400.0, "Gt CO2").expect("finite budget");

        // Assert
        assert_relative_eq!(absolute.value("AAA", 2020).unwrap(), 100.0);
        assert_relative_eq!(absolute.value("BBB", 2020).unwrap(), 300.0);
        assert_eq!(absolute.keys()[0].unit, "Gt CO2");
    }

    #[test]
    // Purpose
    // -------
    // Ensure budget results reject multi-year tables and bad sums.
    //
    // Given
    // -----
    // - A two-year table and a one-year table summing to 0.9.
    //
    // Expect
    // ------
    // - `InvalidYearRange` and `SharesDoNotSumToOne` respectively.
    fn budget_result_validates_shape_and_sum() {
        let two_years =
            shares_table(&units(), &[2020, 2021], array![[0.5, 0.5], [0.5, 0.5]]).expect("table");
        let err = BudgetAllocationResult::new(
            Approach::EqualPerCapitaBudget,
            Parameters::new(),
            two_years,
            Warnings::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidYearRange { .. }));

        let bad = shares_table(&units(), &[2020], array![[0.4], [0.5]]).expect("table");
        let err = BudgetAllocationResult::new(
            Approach::EqualPerCapitaBudget,
            Parameters::new(),
            bad,
            Warnings::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AllocationError::SharesDoNotSumToOne { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Verify pathway projections use the world value of each year and fail
    // when a year is missing.
    //
    // Given
    // -----
    // - Two-year shares and world pathways covering both or only one year.
    //
    // Expect
    // ------
    // - Per-year products; `MissingGlobalTotal` for the short pathway.
    fn absolute_emissions_follow_world_pathway() {
        // Arrange
        let shares =
            shares_table(&units(), &[2020, 2021], array![[0.5, 0.2], [0.5, 0.8]]).expect("table");
        let result = PathwayAllocationResult::new(
            Approach::EqualPerCapita,
            Parameters::new(),
            shares,
            Warnings::new(),
        )
        .expect("valid result");
        let world = IndicatorTable::from_rows(
            "Mt CO2",
            &[2020, 2021],
            &[(WORLD_ID, &[100.0, 50.0])],
            ValueDomain::Signed,
        )
        .expect("world");
        let short = IndicatorTable::from_rows(
            "Mt CO2",
            &[2020],
            &[(WORLD_ID, &[100.0])],
            ValueDomain::Signed,
        )
        .expect("world");

        // Act
        let absolute = result.absolute_emissions(&world).expect("covered");
        let err = result.absolute_emissions(&short).unwrap_err();

        // Assert
        assert_relative_eq!(absolute.value("AAA", 2021).unwrap(), 10.0);
        assert_relative_eq!(absolute.value("BBB", 2021).unwrap(), 40.0);
        assert!(matches!(err, AllocationError::MissingGlobalTotal { year: 2021, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Verify the untagged serde form of parameter values.
    //
    // Given
    // -----
    // - JSON scalars of each kind.
    //
    // Expect
    // ------
    // - They deserialize into the matching variant.
    fn parameter_values_deserialize_untagged() {
        let params: Parameters = serde_json::from_str(
            r#"{"a": true, "b": 2020, "c": 0.5, "d": "asinh", "e": null}"#,
        )
        .expect("valid json");
        assert_eq!(params["a"], ParameterValue::Bool(true));
        assert_eq!(params["b"], ParameterValue::Int(2020));
        assert_eq!(params["c"], ParameterValue::Float(0.5));
        assert_eq!(params["d"], ParameterValue::Text("asinh".into()));
        assert!(params["e"].is_null());
        assert_eq!(ParameterValue::from(Some(2.0)), ParameterValue::Float(2.0));
        assert_eq!(ParameterValue::from(None::<f64>), ParameterValue::Null);
    }
}
