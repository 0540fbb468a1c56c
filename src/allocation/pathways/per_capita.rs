//! Immediate pathway family: per-year (adjusted) population shares.
//!
//! Purpose
//! -------
//! Produce one share per unit and year, each year computed independently of
//! the others:
//!
//! - `equal-per-capita`: population shares of year `t`.
//! - `per-capita-adjusted`: population of `t` scaled by responsibility
//!   factors (window `[historical_responsibility_year, first_allocation_year)`)
//!   and capability factors (cumulative window `[first_allocation_year, t]`),
//!   then bounded by the deviation constraint.
//! - `per-capita-adjusted-gini`: as above with a Gini-corrected capability.
//!
//! Key behaviors
//! -------------
//! - `preserve_first_allocation_year_shares` freezes the first-year shares
//!   and repeats them over the horizon.
//! - Optional [`HistoricalDebt`]: shares from the current year onward are
//!   shifted by a constant per-unit offset so that, weighted by the world
//!   pathway, each unit's remaining entitlement equals its theoretical
//!   entitlement minus what it actually emitted since the first allocation
//!   year. Negative shares are valid output (carbon debt).
//!
//! Invariants & assumptions
//! ------------------------
//! - The horizon is every population year from `first_allocation_year`.
//! - Every output year sums to one, with or without debt.
//! - The unit set is the same for every year: a unit excluded for one year's
//!   window is removed from all years.
use ndarray::{Array1, Array2, Axis, s};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    allocation::{
        budgets::population_sums,
        core::{
            AdjustedOptions, AllocationInputs, Approach, GiniAdjuster, GiniOptions, Parameters,
            PathwayAllocationResult, Roster,
            adjustments::{AdjustmentWindows, roster_factors},
            apply_deviation_constraint, normalize, shares_table,
        },
        errors::{AllocResult, AllocationError},
    },
    data::table::{IndicatorTable, Year},
    optimization::numerical_stability::DEGENERACY_EPS,
};

/// Subtract emissions already released since the first allocation year.
///
/// `current_year` is the first year still to be allocated; it must lie
/// after the first allocation year and within the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalDebt {
    pub current_year: Year,
}

/// Population shares per year.
///
/// # Errors
/// - [`AllocationError::MissingGlobalTotal`] if population has no
///   `first_allocation_year` column.
/// - [`AllocationError::NoUnitsRemaining`] if every unit lacks population.
/// - Debt errors, see [`HistoricalDebt`].
pub fn equal_per_capita(
    inputs: &AllocationInputs<'_>, first_allocation_year: Year, preserve: bool,
    debt: Option<HistoricalDebt>,
) -> AllocResult<PathwayAllocationResult> {
    allocate(inputs, Approach::EqualPerCapita, first_allocation_year, preserve, None, None, debt)
}

/// Per-year population shares scaled by responsibility and capability.
///
/// # Errors
/// As [`equal_per_capita`], plus option validation and missing or
/// uncovered emissions/GDP inputs for active weights.
pub fn per_capita_adjusted(
    inputs: &AllocationInputs<'_>, first_allocation_year: Year, preserve: bool,
    opts: &AdjustedOptions, debt: Option<HistoricalDebt>,
) -> AllocResult<PathwayAllocationResult> {
    opts.validate()?;
    allocate(
        inputs,
        Approach::PerCapitaAdjusted,
        first_allocation_year,
        preserve,
        Some(opts),
        None,
        debt,
    )
}

/// [`per_capita_adjusted`] with a Gini-corrected capability metric.
///
/// # Errors
/// As [`per_capita_adjusted`], plus Gini validation errors.
pub fn per_capita_adjusted_gini(
    inputs: &AllocationInputs<'_>, first_allocation_year: Year, preserve: bool,
    opts: &AdjustedOptions, gini: &GiniOptions, debt: Option<HistoricalDebt>,
) -> AllocResult<PathwayAllocationResult> {
    opts.validate()?;
    gini.validate()?;
    allocate(
        inputs,
        Approach::PerCapitaAdjustedGini,
        first_allocation_year,
        preserve,
        Some(opts),
        Some(gini),
        debt,
    )
}

// ---- Helper Methods ----

fn allocate(
    inputs: &AllocationInputs<'_>, approach: Approach, first: Year, preserve: bool,
    adjusted: Option<&AdjustedOptions>, gini: Option<&GiniOptions>, debt: Option<HistoricalDebt>,
) -> AllocResult<PathwayAllocationResult> {
    let population = inputs.population;
    if population.year_index(first).is_none() {
        return Err(AllocationError::MissingGlobalTotal { indicator: "population", year: first });
    }
    let horizon = population.years_from(first);
    let roster_years = if preserve { vec![first] } else { horizon.clone() };
    let mut roster = Roster::from_population(population, &roster_years);

    let debt_inputs = match debt {
        Some(d) => Some(DebtInputs::prepare(inputs, approach, first, &horizon, d, &mut roster)?),
        None => None,
    };
    roster.ensure_non_empty("population")?;

    let active = adjusted.filter(|opts| !opts.weights.is_zero());
    let adjuster = match active {
        Some(_) => gini.map(|g| GiniAdjuster::new(*g)).transpose()?,
        None => None,
    };

    // Exclusions made while building a later year's metric invalidate the
    // columns already computed; repeat until the roster is stable.
    let mut shares = loop {
        let before = roster.len();
        let shares = year_shares(
            inputs,
            approach,
            &mut roster,
            first,
            &horizon,
            preserve,
            active,
            adjuster.as_ref(),
        )?;
        if roster.len() == before {
            break shares;
        }
        roster.ensure_non_empty("population")?;
    };

    let mut years = horizon.clone();
    if let Some(d) = &debt_inputs {
        let (debt_years, adjusted_shares) = d.apply(roster.units(), &horizon, &shares)?;
        years = debt_years;
        shares = adjusted_shares;
    }
    debug!(approach = %approach, units = roster.len(), years = years.len(), "pathway allocated");

    let mut params = Parameters::new();
    params.insert("first_allocation_year".into(), first.into());
    params.insert("preserve_first_allocation_year_shares".into(), preserve.into());
    params.insert(
        "historical_debt_current_year".into(),
        debt.map(|d| d.current_year).into(),
    );
    if let Some(opts) = adjusted {
        opts.record(&mut params);
    }
    if let Some(g) = gini {
        g.record(&mut params);
    }

    let table = shares_table(roster.units(), &years, shares)?;
    PathwayAllocationResult::new(approach, params, table, roster.into_warnings())
}

#[allow(clippy::too_many_arguments)]
fn year_shares(
    inputs: &AllocationInputs<'_>, approach: Approach, roster: &mut Roster, first: Year,
    horizon: &[Year], preserve: bool, active: Option<&AdjustedOptions>,
    adjuster: Option<&GiniAdjuster>,
) -> AllocResult<Array2<f64>> {
    let basis_years: &[Year] = if preserve { &horizon[..1] } else { horizon };
    let mut columns = Vec::with_capacity(basis_years.len());
    for &year in basis_years {
        let column = match active {
            None => normalize(
                &population_sums(inputs.population, roster.units(), &[year]),
                "population",
            )?,
            Some(opts) => {
                let windows =
                    AdjustmentWindows { responsibility_end: first - 1, capability: (first, year) };
                let factors = roster_factors(roster, inputs, approach, opts, adjuster, windows)?;
                let base = population_sums(inputs.population, roster.units(), &[year]);
                let shares = normalize(&(&base * &factors), "adjusted population")?;
                match opts.max_deviation_sigma {
                    Some(sigma) => apply_deviation_constraint(&shares, &base, sigma)?,
                    None => shares,
                }
            }
        };
        columns.push(column);
    }

    let n = roster.len();
    let mut out = Array2::zeros((n, horizon.len()));
    for (col, _) in horizon.iter().enumerate() {
        let column = if preserve { &columns[0] } else { &columns[col] };
        if column.len() != n {
            // Roster shrank after this column was built; the caller retries.
            continue;
        }
        out.column_mut(col).assign(column);
    }
    Ok(out)
}

/// Validated inputs of the historical-debt shift.
struct DebtInputs<'a> {
    current_year: Year,
    world: Array1<f64>,
    emissions: &'a IndicatorTable,
}

impl<'a> DebtInputs<'a> {
    fn prepare(
        inputs: &AllocationInputs<'a>, approach: Approach, first: Year, horizon: &[Year],
        debt: HistoricalDebt, roster: &mut Roster,
    ) -> AllocResult<Self> {
        let current_year = debt.current_year;
        let last = horizon.last().copied().unwrap_or(first);
        if current_year <= first || current_year > last {
            return Err(AllocationError::InvalidYearRange {
                start: first,
                end: current_year,
                reason: "Debt current year must lie after the first allocation year and within \
                         the horizon.",
            });
        }
        let world_table = inputs.require_world_pathway(approach.name())?;
        let emissions = inputs.require_emissions(approach.name())?;

        let series = world_table.world_series()?;
        let world = horizon
            .iter()
            .map(|&year| {
                world_table
                    .year_index(year)
                    .map(|i| series[i])
                    .ok_or(AllocationError::MissingGlobalTotal { indicator: "world pathway", year })
            })
            .collect::<AllocResult<Array1<f64>>>()?;

        let past_end = current_year - 1;
        if !emissions.covers(first, past_end) {
            return Err(AllocationError::WindowNotCovered {
                indicator: "emissions",
                start: first,
                end: past_end,
            });
        }
        let past_years = emissions.years_between(first, past_end);
        for unit in roster.units().to_vec() {
            if let Some(year) = past_years.iter().find(|&&y| emissions.value(&unit, y).is_none()) {
                roster.exclude(&unit, format!("missing emissions data for {year}"));
            }
        }
        Ok(Self { current_year, world, emissions })
    }

    /// Shift future shares by the per-unit debt offset.
    ///
    /// Returns the future years and their shares.
    fn apply(
        &self, units: &[String], horizon: &[Year], shares: &Array2<f64>,
    ) -> AllocResult<(Vec<Year>, Array2<f64>)> {
        let split = horizon.iter().position(|&y| y >= self.current_year).unwrap_or(horizon.len());
        let world_past = self.world.slice(s![..split]);
        let world_future = self.world.slice(s![split..]);
        let future_total = world_future.sum();
        if !future_total.is_finite() || future_total <= DEGENERACY_EPS {
            return Err(AllocationError::DegenerateGlobalTotal {
                indicator: "world pathway",
                value: future_total,
            });
        }

        let past_shares = shares.slice(s![.., ..split]);
        let future_shares = shares.slice(s![.., split..]);
        let entitled_past = past_shares.dot(&world_past);
        let entitled_future = future_shares.dot(&world_future);
        let used = units
            .iter()
            .map(|u| self.emissions.window_sum(u, horizon[0], self.current_year - 1))
            .collect::<Result<Array1<f64>, _>>()?;

        let remaining = &entitled_future + &entitled_past - &used;
        let gap = future_total - remaining.sum();
        let target = &remaining + &(&entitled_future * (gap / future_total));
        let offset = (&entitled_future - &target) / future_total;

        let mut out = future_shares.to_owned();
        out -= &offset.insert_axis(Axis(1));
        Ok((horizon[split..].to_vec(), out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::{ValueDomain, WORLD_ID};
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Per-year independence and the preserve flag.
    // - The historical-debt shift: per-year sums, cumulative entitlement and
    //   negative shares.
    // -------------------------------------------------------------------------

    fn table(unit: &str, years: &[Year], rows: &[(&str, &[f64])]) -> IndicatorTable {
        IndicatorTable::from_rows(unit, years, rows, ValueDomain::NonNegative).expect("valid table")
    }

    #[test]
    // Purpose
    // -------
    // Verify that each year follows that year's population unless shares are
    // preserved.
    //
    // Given
    // -----
    // - A: 1, 1; B: 1, 3 over 2020–2021.
    //
    // Expect
    // ------
    // - Independent: 2021 shares are [0.25, 0.75].
    // - Preserved: 2021 repeats 2020's [0.5, 0.5].
    fn per_year_shares_and_preserve() {
        let pop = table("million", &[2020, 2021], &[("A", &[1.0, 1.0]), ("B", &[1.0, 3.0])]);
        let inputs = AllocationInputs::new(&pop);

        let independent = equal_per_capita(&inputs, 2020, false, None).unwrap();
        let preserved = equal_per_capita(&inputs, 2020, true, None).unwrap();

        assert_eq!(independent.years(), &[2020, 2021]);
        assert_relative_eq!(independent.share("A", 2020).unwrap(), 0.5);
        assert_relative_eq!(independent.share("A", 2021).unwrap(), 0.25);
        assert_relative_eq!(preserved.share("A", 2021).unwrap(), 0.5);
        assert_relative_eq!(preserved.share("B", 2021).unwrap(), 0.5);
    }

    #[test]
    // Purpose
    // -------
    // Verify the debt shift keeps yearly sums at one and hands each unit its
    // remaining entitlement, allowing negative shares.
    //
    // Given
    // -----
    // - Equal populations, world pathway 10 per year over 2020–2022.
    // - In 2020 A emitted 9 and B emitted 1; current year 2021.
    //
    // Expect
    // ------
    // - Output years are 2021–2022, each summing to 1.
    // - A's remaining entitlement is 15 - 9 = 6 of the 20 left, B's is 14.
    // - A heavier past emitter can be driven below zero.
    fn historical_debt_shifts_future_shares() {
        // Arrange
        let years = [2020, 2021, 2022];
        let pop = table("million", &years, &[("A", &[1.0; 3]), ("B", &[1.0; 3])]);
        let world = table("Mt", &years, &[(WORLD_ID, &[10.0; 3])]);
        let em = table("Mt", &years, &[("A", &[9.0, 0.0, 0.0]), ("B", &[1.0, 0.0, 0.0])]);
        let inputs = AllocationInputs::new(&pop).with_emissions(&em).with_world_pathway(&world);
        let debt = Some(HistoricalDebt { current_year: 2021 });

        // Act
        let result = equal_per_capita(&inputs, 2020, false, debt).unwrap();

        // Assert
        assert_eq!(result.years(), &[2021, 2022]);
        let a: f64 = result.years().iter().map(|&y| result.share("A", y).unwrap() * 10.0).sum();
        let b: f64 = result.years().iter().map(|&y| result.share("B", y).unwrap() * 10.0).sum();
        assert_relative_eq!(a, 6.0, epsilon = 1e-12);
        assert_relative_eq!(b, 14.0, epsilon = 1e-12);

        let heavy = table("Mt", &years, &[("A", &[25.0, 0.0, 0.0]), ("B", &[0.0, 0.0, 0.0])]);
        let inputs = AllocationInputs::new(&pop).with_emissions(&heavy).with_world_pathway(&world);
        let result = equal_per_capita(&inputs, 2020, false, debt).unwrap();
        assert!(result.share("A", 2021).unwrap() < 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Ensure debt settings are validated.
    //
    // Given
    // -----
    // - A current year equal to the first allocation year, and a debt request
    //   without a world pathway.
    //
    // Expect
    // ------
    // - `InvalidYearRange` and `MissingRequiredInput` respectively.
    fn historical_debt_validation() {
        let years = [2020, 2021];
        let pop = table("million", &years, &[("A", &[1.0, 1.0])]);
        let em = table("Mt", &years, &[("A", &[1.0, 1.0])]);
        let inputs = AllocationInputs::new(&pop).with_emissions(&em);
        assert!(matches!(
            equal_per_capita(&inputs, 2020, false, Some(HistoricalDebt { current_year: 2020 })),
            Err(AllocationError::InvalidYearRange { .. })
        ));
        assert!(matches!(
            equal_per_capita(&inputs, 2020, false, Some(HistoricalDebt { current_year: 2021 })),
            Err(AllocationError::MissingRequiredInput { indicator: "world pathway", .. })
        ));
    }
}
