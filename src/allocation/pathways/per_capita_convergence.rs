//! `per-capita-convergence`: linear blend from emission shares to population
//! shares.
//!
//! At `first_allocation_year` every unit holds its current emission share;
//! by `convergence_year` it holds its population share. In between the
//! blend weight grows linearly, `M(t) = (t − first) / (convergence − first)`,
//! clamped to `[0, 1]`, and each year is renormalized.
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::{
    allocation::{
        budgets::population_sums,
        core::{
            AllocationInputs, Approach, Parameters, PathwayAllocationResult, Roster, normalize,
            shares_table,
        },
        errors::{AllocResult, AllocationError},
    },
    data::table::Year,
};

/// Blend current emission shares into population shares over
/// `[first_allocation_year, convergence_year]`.
///
/// # Errors
/// - [`AllocationError::InvalidYearRange`] unless `convergence_year >
///   first_allocation_year`.
/// - [`AllocationError::MissingRequiredInput`] without an emissions table.
/// - [`AllocationError::MissingGlobalTotal`] if population or emissions lack
///   the first allocation year.
/// - [`AllocationError::DegenerateGlobalTotal`] if first-year emissions sum
///   to zero.
pub fn per_capita_convergence(
    inputs: &AllocationInputs<'_>, first_allocation_year: Year, convergence_year: Year,
) -> AllocResult<PathwayAllocationResult> {
    let approach = Approach::PerCapitaConvergence;
    let first = first_allocation_year;
    if convergence_year <= first {
        return Err(AllocationError::InvalidYearRange {
            start: first,
            end: convergence_year,
            reason: "Convergence year must come after the first allocation year.",
        });
    }
    let emissions = inputs.require_emissions(approach.name())?;
    let population = inputs.population;
    if population.year_index(first).is_none() {
        return Err(AllocationError::MissingGlobalTotal { indicator: "population", year: first });
    }
    if emissions.year_index(first).is_none() {
        return Err(AllocationError::MissingGlobalTotal { indicator: "emissions", year: first });
    }

    let horizon = population.years_from(first);
    let mut roster = Roster::from_population(population, &horizon);
    for unit in roster.units().to_vec() {
        if emissions.value(&unit, first).is_none() {
            roster.exclude(&unit, format!("missing emissions data for {first}"));
        }
    }
    roster.ensure_non_empty("emissions")?;

    let current: Array1<f64> = roster
        .units()
        .iter()
        .map(|u| emissions.value(u, first).unwrap_or(0.0))
        .collect();
    let current = normalize(&current, "emissions")?;

    let span = f64::from(convergence_year - first);
    let mut shares = Array2::zeros((roster.len(), horizon.len()));
    for (col, &year) in horizon.iter().enumerate() {
        let equal = normalize(&population_sums(population, roster.units(), &[year]), "population")?;
        let m = (f64::from(year - first) / span).clamp(0.0, 1.0);
        let blended = &current * (1.0 - m) + &equal * m;
        shares.column_mut(col).assign(&normalize(&blended, "blended shares")?);
    }
    debug!(units = roster.len(), first, convergence_year, "per-capita convergence allocated");

    let mut params = Parameters::new();
    params.insert("first_allocation_year".into(), first.into());
    params.insert("convergence_year".into(), convergence_year.into());

    let table = shares_table(roster.units(), &horizon, shares)?;
    PathwayAllocationResult::new(approach, params, table, roster.into_warnings())
}
