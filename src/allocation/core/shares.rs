//! Share helpers: the unit roster with its exclusion warnings, share-table
//! construction and the sum-to-one check.
use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use tracing::warn;

use crate::{
    allocation::errors::{AllocResult, AllocationError},
    data::table::{IndicatorTable, RowKey, SHARE_UNIT, ValueDomain, Year},
    optimization::numerical_stability::{DEGENERACY_EPS, SHARE_SUM_TOL},
};

/// Per-unit warning messages attached to a result.
pub type Warnings = BTreeMap<String, String>;

/// Units taking part in an allocation, plus the warnings explaining every
/// exclusion or fallback.
///
/// Units are kept in population-table order so results are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    units: Vec<String>,
    warnings: Warnings,
}

impl Roster {
    /// Units of `population` with a value in every year of `years`.
    ///
    /// Units missing any of those years are excluded with a warning.
    pub fn from_population(population: &IndicatorTable, years: &[Year]) -> Self {
        let mut roster = Self::default();
        for unit in population.unit_ids() {
            match years.iter().find(|&&y| population.value(&unit, y).is_none()) {
                Some(year) => {
                    roster.record(&unit, format!("excluded: missing population data for {year}"))
                }
                None => roster.units.push(unit),
            }
        }
        roster
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn into_warnings(self) -> Warnings {
        self.warnings
    }

    /// Remove `unit` from the roster and record why.
    pub fn exclude(&mut self, unit: &str, reason: impl Into<String>) {
        self.units.retain(|u| u != unit);
        self.record(unit, format!("excluded: {}", reason.into()));
    }

    /// Attach a non-excluding warning to `unit`; repeated messages are kept once.
    pub fn warn(&mut self, unit: &str, message: impl Into<String>) {
        self.record(unit, message.into());
    }

    /// # Errors
    /// [`AllocationError::NoUnitsRemaining`] if every unit was excluded.
    pub fn ensure_non_empty(&self, indicator: &'static str) -> AllocResult<()> {
        if self.units.is_empty() {
            return Err(AllocationError::NoUnitsRemaining { indicator });
        }
        Ok(())
    }

    fn record(&mut self, unit: &str, message: String) {
        warn!(unit, %message, "allocation warning");
        match self.warnings.get_mut(unit) {
            Some(existing) if existing.split("; ").any(|m| m == message) => {}
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(&message);
            }
            None => {
                self.warnings.insert(unit.to_string(), message);
            }
        }
    }
}

/// Divide `values` by their sum.
///
/// # Errors
/// [`AllocationError::DegenerateGlobalTotal`] when the sum is not a positive,
/// finite number.
pub fn normalize(values: &Array1<f64>, indicator: &'static str) -> AllocResult<Array1<f64>> {
    let total = values.sum();
    if !total.is_finite() || total <= DEGENERACY_EPS {
        return Err(AllocationError::DegenerateGlobalTotal { indicator, value: total });
    }
    Ok(values / total)
}

/// Wrap a `(units × years)` share matrix into a signed indicator table.
pub fn shares_table(units: &[String], years: &[Year], values: Array2<f64>) -> AllocResult<IndicatorTable> {
    let keys = units.iter().map(|u| RowKey::new(u.as_str(), SHARE_UNIT)).collect();
    Ok(IndicatorTable::new(keys, years.to_vec(), values, ValueDomain::Signed)?)
}

/// Check that every year column of `shares` sums to one within
/// [`SHARE_SUM_TOL`].
///
/// # Errors
/// [`AllocationError::SharesDoNotSumToOne`] for the first offending year.
pub fn validate_sum_to_one(shares: &IndicatorTable) -> AllocResult<()> {
    let values = shares.values();
    for (col, &year) in shares.years().iter().enumerate() {
        let sum = values.column(col).sum();
        if !((sum - 1.0).abs() < SHARE_SUM_TOL) {
            return Err(AllocationError::SharesDoNotSumToOne { year, sum });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Verify that the roster excludes units lacking population data and
    // records a warning for each.
    //
    // Given
    // -----
    // - Unit "BBB" missing population in 2021.
    //
    // Expect
    // ------
    // - The roster keeps "AAA" only and warns about "BBB" naming the year.
    fn roster_excludes_units_with_population_gaps() {
        // Arrange
        let population = IndicatorTable::from_rows(
            "million",
            &[2020, 2021],
            &[("AAA", &[1.0, 1.0]), ("BBB", &[2.0, f64::NAN])],
            ValueDomain::NonNegative,
        )
        .expect("valid table");

        // Act
        let roster = Roster::from_population(&population, &[2020, 2021]);

        // Assert
        assert_eq!(roster.units(), &["AAA".to_string()]);
        assert!(roster.warnings()["BBB"].contains("2021"));
    }

    #[test]
    // Purpose
    // -------
    // Ensure repeated warnings are stored once and distinct ones are joined.
    //
    // Given
    // -----
    // - The same message twice, then a different message, for one unit.
    //
    // Expect
    // ------
    // - The stored text holds both messages exactly once.
    fn roster_deduplicates_warnings() {
        let mut roster = Roster::default();
        roster.warn("AAA", "missing Gini data");
        roster.warn("AAA", "missing Gini data");
        roster.warn("AAA", "strict=false:0.98");
        assert_eq!(roster.warnings()["AAA"], "missing Gini data; strict=false:0.98");
    }

    #[test]
    // Purpose
    // -------
    // Verify the sum-to-one check on share tables.
    //
    // Given
    // -----
    // - A table whose second year sums to 0.9.
    //
    // Expect
    // ------
    // - `SharesDoNotSumToOne` for that year; normalizing fixes it.
    fn validate_sum_to_one_flags_bad_years() {
        // Arrange
        let units = vec!["AAA".to_string(), "BBB".to_string()];
        let table = shares_table(&units, &[2020, 2021], array![[0.5, 0.4], [0.5, 0.5]])
            .expect("valid table");

        // Act
        let err = validate_sum_to_one(&table).unwrap_err();

        // Assert
        assert!(matches!(err, AllocationError::SharesDoNotSumToOne { year: 2021, .. }));
        let fixed = normalize(&array![0.4, 0.5], "shares").expect("positive total");
        assert!((fixed.sum() - 1.0).abs() < SHARE_SUM_TOL);
        assert!(normalize(&array![0.0, 0.0], "shares").is_err());
    }
}
