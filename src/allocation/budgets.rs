//! Budget allocators — one cumulative share per unit.
//!
//! Purpose
//! -------
//! Split a remaining global budget across units for a single allocation
//! year. All three approaches share one pipeline and differ only in which
//! adjustments are active:
//!
//! - `equal-per-capita-budget`: population shares.
//! - `per-capita-adjusted-budget`: population scaled by responsibility and
//!   capability factors, then bounded by the deviation constraint.
//! - `per-capita-adjusted-gini-budget`: as above with a Gini-corrected
//!   capability metric.
//!
//! Key behaviors
//! -------------
//! - With `preserve_allocation_year_shares` the population basis is the
//!   allocation year alone; otherwise it is cumulative population from the
//!   allocation year to the last year of the population table.
//! - Responsibility covers `[historical_responsibility_year, allocation_year)`
//!   and capability covers the population basis years.
//! - Units with missing population are excluded with a warning; a missing
//!   allocation-year column is fatal.
//!
//! Invariants & assumptions
//! ------------------------
//! - The output holds exactly one year column, the allocation year, summing
//!   to one within `1e-10`.
//! - Zero weights skip the adjustment and deviation steps entirely, so the
//!   adjusted approaches reproduce `equal-per-capita-budget` bit for bit.
use ndarray::{Array1, Axis};
use tracing::debug;

use crate::{
    allocation::{
        core::{
            AdjustedOptions, AllocationInputs, Approach, BudgetAllocationResult, GiniAdjuster,
            GiniOptions, Parameters, Roster,
            adjustments::{AdjustmentWindows, roster_factors},
            apply_deviation_constraint, normalize, shares_table,
        },
        errors::{AllocResult, AllocationError},
    },
    data::table::{IndicatorTable, Year},
};

/// Population shares in `allocation_year`.
///
/// # Errors
/// - [`AllocationError::MissingGlobalTotal`] if the population table has no
///   `allocation_year` column.
/// - [`AllocationError::NoUnitsRemaining`] if every unit lacks population.
pub fn equal_per_capita_budget(
    inputs: &AllocationInputs<'_>, allocation_year: Year, preserve_allocation_year_shares: bool,
) -> AllocResult<BudgetAllocationResult> {
    allocate(
        inputs,
        Approach::EqualPerCapitaBudget,
        allocation_year,
        preserve_allocation_year_shares,
        None,
        None,
    )
}

/// Population shares scaled by responsibility and capability factors.
///
/// # Errors
/// As [`equal_per_capita_budget`], plus option validation, missing
/// emissions/GDP inputs for active weights and uncovered windows.
pub fn per_capita_adjusted_budget(
    inputs: &AllocationInputs<'_>, allocation_year: Year, preserve_allocation_year_shares: bool,
    opts: &AdjustedOptions,
) -> AllocResult<BudgetAllocationResult> {
    opts.validate()?;
    allocate(
        inputs,
        Approach::PerCapitaAdjustedBudget,
        allocation_year,
        preserve_allocation_year_shares,
        Some(opts),
        None,
    )
}

/// [`per_capita_adjusted_budget`] with a Gini-corrected capability metric.
///
/// # Errors
/// As [`per_capita_adjusted_budget`], plus Gini option validation, a missing
/// Gini table when the capability weight is positive and out-of-range
/// coefficients.
pub fn per_capita_adjusted_gini_budget(
    inputs: &AllocationInputs<'_>, allocation_year: Year, preserve_allocation_year_shares: bool,
    opts: &AdjustedOptions, gini: &GiniOptions,
) -> AllocResult<BudgetAllocationResult> {
    opts.validate()?;
    gini.validate()?;
    allocate(
        inputs,
        Approach::PerCapitaAdjustedGiniBudget,
        allocation_year,
        preserve_allocation_year_shares,
        Some(opts),
        Some(gini),
    )
}

// ---- Helper Methods ----

fn allocate(
    inputs: &AllocationInputs<'_>, approach: Approach, allocation_year: Year, preserve: bool,
    adjusted: Option<&AdjustedOptions>, gini: Option<&GiniOptions>,
) -> AllocResult<BudgetAllocationResult> {
    let population = inputs.population;
    if population.year_index(allocation_year).is_none() {
        return Err(AllocationError::MissingGlobalTotal {
            indicator: "population",
            year: allocation_year,
        });
    }
    let years =
        if preserve { vec![allocation_year] } else { population.years_from(allocation_year) };
    let basis_end = years.last().copied().unwrap_or(allocation_year);

    let mut roster = Roster::from_population(population, &years);
    roster.ensure_non_empty("population")?;

    let active = adjusted.filter(|opts| !opts.weights.is_zero());
    let shares = match active {
        None => normalize(&population_sums(population, roster.units(), &years), "population")?,
        Some(opts) => {
            let adjuster = gini.map(|g| GiniAdjuster::new(*g)).transpose()?;
            let windows = AdjustmentWindows {
                responsibility_end: allocation_year - 1,
                capability: (allocation_year, basis_end),
            };
            let factors =
                roster_factors(&mut roster, inputs, approach, opts, adjuster.as_ref(), windows)?;
            let base = population_sums(population, roster.units(), &years);
            let shares = normalize(&(&base * &factors), "adjusted population")?;
            match opts.max_deviation_sigma {
                Some(sigma) => apply_deviation_constraint(&shares, &base, sigma)?,
                None => shares,
            }
        }
    };
    debug!(approach = %approach, units = roster.len(), allocation_year, "budget allocated");

    let mut params = Parameters::new();
    params.insert("allocation_year".into(), allocation_year.into());
    params.insert("preserve_allocation_year_shares".into(), preserve.into());
    if let Some(opts) = adjusted {
        opts.record(&mut params);
    }
    if let Some(g) = gini {
        g.record(&mut params);
    }

    let table = shares_table(roster.units(), &[allocation_year], shares.insert_axis(Axis(1)))?;
    BudgetAllocationResult::new(approach, params, table, roster.into_warnings())
}

/// Population of each unit summed over `years`; roster units carry every year.
pub(crate) fn population_sums(
    population: &IndicatorTable, units: &[String], years: &[Year],
) -> Array1<f64> {
    units
        .iter()
        .map(|u| years.iter().filter_map(|&y| population.value(u, y)).sum::<f64>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocation::core::{
            AdjustmentWeights, CapabilityOptions, FunctionalForm, ResponsibilityOptions,
        },
        data::table::ValueDomain,
    };
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Population shares and the preserve flag.
    // - Exclusion of units with missing population.
    // - Direction of the responsibility adjustment.
    //
    // They intentionally DO NOT cover:
    // - Property-style checks across approaches (see tests/).
    // -------------------------------------------------------------------------

    fn table(unit: &str, years: &[Year], rows: &[(&str, &[f64])]) -> IndicatorTable {
        IndicatorTable::from_rows(unit, years, rows, ValueDomain::NonNegative).expect("valid table")
    }

    #[test]
    // Purpose
    // -------
    // Verify population shares with and without the preserve flag.
    //
    // Given
    // -----
    // - A: 100 → 100, B: 300 → 500 over 2020–2021.
    //
    // Expect
    // ------
    // - Preserved: [0.25, 0.75] from 2020 alone.
    // - Cumulative: [200/1000, 800/1000]; both labelled 2020.
    fn equal_per_capita_preserve_flag() {
        // Arrange
        let pop = table("million", &[2020, 2021], &[("A", &[100.0, 100.0]), ("B", &[300.0, 500.0])]);
        let inputs = AllocationInputs::new(&pop);

        // Act
        let frozen = equal_per_capita_budget(&inputs, 2020, true).unwrap();
        let cumulative = equal_per_capita_budget(&inputs, 2020, false).unwrap();

        // Assert
        assert_eq!(frozen.year(), 2020);
        assert_relative_eq!(frozen.share("A").unwrap(), 0.25);
        assert_relative_eq!(frozen.share("B").unwrap(), 0.75);
        assert_eq!(cumulative.year(), 2020);
        assert_relative_eq!(cumulative.share("A").unwrap(), 0.2);
        assert_relative_eq!(cumulative.share("B").unwrap(), 0.8);
    }

    #[test]
    // Purpose
    // -------
    // Ensure a unit without population is excluded and a missing year column
    // is fatal.
    //
    // Given
    // -----
    // - C has NaN population in 2020.
    //
    // Expect
    // ------
    // - C is absent from the shares and present in the warnings.
    // - Requesting 2030 fails with `MissingGlobalTotal`.
    fn missing_population_excludes_unit() {
        let pop = table("million", &[2020], &[("A", &[1.0]), ("B", &[3.0]), ("C", &[f64::NAN])]);
        let inputs = AllocationInputs::new(&pop);

        let result = equal_per_capita_budget(&inputs, 2020, true).unwrap();

        assert_eq!(result.relative_shares().n_rows(), 2);
        assert!(result.share("C").is_none());
        assert!(result.warnings()["C"].starts_with("excluded"));
        assert!(matches!(
            equal_per_capita_budget(&inputs, 2030, true),
            Err(AllocationError::MissingGlobalTotal { year: 2030, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Verify that responsibility shifts budget away from the higher emitter
    // and that missing emissions input is reported.
    //
    // Given
    // -----
    // - A: pop 100, emissions 50; B: pop 300, emissions 10 (year 2019).
    // - Responsibility weight 1, capability weight 0, no deviation bound.
    //
    // Expect
    // ------
    // - A < 0.25, B > 0.75, sum 1.
    // - Without an emissions table: `MissingRequiredInput`.
    fn responsibility_reduces_high_emitter_share() {
        // Arrange
        let years = [2019, 2020];
        let pop = table("million", &years, &[("A", &[100.0, 100.0]), ("B", &[300.0, 300.0])]);
        let em = table("Mt", &years, &[("A", &[50.0, 50.0]), ("B", &[10.0, 10.0])]);
        let opts = AdjustedOptions::new(
            AdjustmentWeights::new(1.0, 0.0).unwrap(),
            ResponsibilityOptions::new(2019, true, 1.0, FunctionalForm::Asinh).unwrap(),
            CapabilityOptions::default(),
            None,
        )
        .unwrap();
        let inputs = AllocationInputs::new(&pop).with_emissions(&em);

        // Act
        let result = per_capita_adjusted_budget(&inputs, 2020, true, &opts).unwrap();

        // Assert
        let a = result.share("A").unwrap();
        let b = result.share("B").unwrap();
        assert!(a < 0.25);
        assert!(b > 0.75);
        assert_relative_eq!(a + b, 1.0, epsilon = 1e-12);
        assert!(matches!(
            per_capita_adjusted_budget(&AllocationInputs::new(&pop), 2020, true, &opts),
            Err(AllocationError::MissingRequiredInput { indicator: "emissions", .. })
        ));
    }
}
