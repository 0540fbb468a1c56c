//! Responsibility and capability adjustments.
//!
//! Purpose
//! -------
//! Turn raw per-unit indicators into multiplicative factors applied to
//! population before shares are normalized. Higher historical emissions
//! (responsibility) or higher economic capacity (capability) yield a factor
//! below one.
//!
//! Key behaviors
//! -------------
//! - [`responsibility_metric`] sums a unit's emissions over an accounting
//!   window, optionally per capita.
//! - [`capability_metric`] sums a unit's GDP over a window, optionally
//!   Gini-corrected per year and optionally per capita.
//! - [`adjustment_factors`] rescales a metric by its cross-unit mean absolute
//!   value and applies the selected functional form.
//! - [`combined_factors`] multiplies both factors using normalized weights.
//! - [`roster_factors`] wires the metrics to an [`AllocationInputs`] bundle
//!   for one allocator call.
//!
//! Invariants & assumptions
//! ------------------------
//! - A weight or exponent of zero yields factors of exactly `1.0`.
//! - A metric whose mean absolute value is zero (all units equal to zero)
//!   yields factors of exactly `1.0`; nothing is divided by zero.
//! - Units lacking data for a metric are removed from the [`Roster`] with a
//!   warning. A missing Gini coefficient only downgrades to the uncorrected
//!   capability metric, also with a warning.
use std::collections::HashMap;

use ndarray::Array1;

use crate::{
    allocation::{
        core::{
            approach::Approach,
            gini::{GiniAdjuster, validate_gini},
            inputs::AllocationInputs,
            options::{AdjustedOptions, FunctionalForm, verify_exponent},
            shares::Roster,
        },
        errors::{AllocResult, AllocationError},
    },
    data::{
        errors::TableError,
        table::{IndicatorTable, Year},
    },
    optimization::numerical_stability::{DEGENERACY_EPS, asinh_decay, linear_decay, power_decay},
};

/// Per-unit metric values keyed by unit id.
pub type UnitMetric = HashMap<String, f64>;

/// Multiplicative factors for `metric` under one weight and functional form.
///
/// The metric is divided by its mean absolute value across units before the
/// form is applied, with effective rate `weight · exponent`.
///
/// # Errors
/// - [`AllocationError::InvalidWeight`] for weights outside `[0, 1]`.
/// - [`AllocationError::InvalidExponent`] for negative or non-finite exponents.
pub fn adjustment_factors(
    metric: &Array1<f64>, weight: f64, exponent: f64, form: FunctionalForm,
) -> AllocResult<Array1<f64>> {
    if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
        return Err(AllocationError::InvalidWeight {
            name: "adjustment_weight",
            value: weight,
            reason: "Weight must lie in [0, 1].",
        });
    }
    verify_exponent("adjustment_exponent", exponent)?;

    let n = metric.len();
    let rate = weight * exponent;
    if rate == 0.0 || n == 0 {
        return Ok(Array1::ones(n));
    }
    let mean_abs = metric.mapv(f64::abs).sum() / n as f64;
    if !mean_abs.is_finite() || mean_abs <= DEGENERACY_EPS {
        return Ok(Array1::ones(n));
    }
    let factors = metric.mapv(|m| {
        let x = m / mean_abs;
        match form {
            FunctionalForm::Asinh => asinh_decay(x, rate),
            FunctionalForm::Linear => linear_decay(x, rate),
            FunctionalForm::Power => power_decay(x, rate),
        }
    });
    Ok(factors)
}

/// Cumulative emissions of each roster unit over `[start, end]`.
///
/// With `per_capita`, each sum is divided by the unit's cumulative population
/// over the same window.
///
/// # Errors
/// - [`AllocationError::InvalidYearRange`] if `start > end`.
/// - [`AllocationError::WindowNotCovered`] if emissions (or population, when
///   per capita) do not span the window.
pub fn responsibility_metric(
    roster: &mut Roster, emissions: &IndicatorTable, population: &IndicatorTable, start: Year,
    end: Year, per_capita: bool,
) -> AllocResult<UnitMetric> {
    if start > end {
        return Err(AllocationError::InvalidYearRange {
            start,
            end,
            reason: "Historical responsibility window must end after it starts.",
        });
    }
    if !emissions.covers(start, end) {
        return Err(AllocationError::WindowNotCovered { indicator: "emissions", start, end });
    }
    if per_capita && !population.covers(start, end) {
        return Err(AllocationError::WindowNotCovered { indicator: "population", start, end });
    }

    let mut metric = UnitMetric::with_capacity(roster.len());
    for unit in roster.units().to_vec() {
        let total = match emissions.window_sum(&unit, start, end) {
            Ok(total) => total,
            Err(err) => {
                roster.exclude(&unit, gap_reason("emissions", &err, start, end));
                continue;
            }
        };
        if !per_capita {
            metric.insert(unit, total);
            continue;
        }
        match population.window_sum(&unit, start, end) {
            Ok(pop) if pop > 0.0 => {
                metric.insert(unit, total / pop);
            }
            Ok(_) => roster.exclude(&unit, format!("zero population for {start}..={end}")),
            Err(err) => roster.exclude(&unit, gap_reason("population", &err, start, end)),
        }
    }
    Ok(metric)
}

/// Cumulative GDP of each roster unit over `[start, end]`.
///
/// When `gini` is supplied, each year's GDP is first replaced by its
/// subsistence-corrected value using that year's population. With
/// `per_capita`, the sum is divided by cumulative population over the
/// window. A gap in GDP (or in population, when needed) excludes the unit.
///
/// # Errors
/// - [`AllocationError::InvalidYearRange`] if `start > end`.
/// - [`AllocationError::WindowNotCovered`] if GDP does not span the window.
/// - [`AllocationError::InvalidGini`] for coefficients outside `[0, 1)`.
pub fn capability_metric(
    roster: &mut Roster, gdp: &IndicatorTable, population: &IndicatorTable,
    gini: Option<(&IndicatorTable, &GiniAdjuster)>, start: Year, end: Year, per_capita: bool,
) -> AllocResult<UnitMetric> {
    if start > end {
        return Err(AllocationError::InvalidYearRange {
            start,
            end,
            reason: "Capability window must end after it starts.",
        });
    }
    if !gdp.covers(start, end) {
        return Err(AllocationError::WindowNotCovered { indicator: "GDP", start, end });
    }

    let years = gdp.years_between(start, end);
    let mut metric = UnitMetric::with_capacity(roster.len());
    'units: for unit in roster.units().to_vec() {
        let coefficient = match gini {
            Some((table, adjuster)) => match table.latest_value(&unit) {
                Some(g) => {
                    validate_gini(&unit, g)?;
                    Some((g, adjuster))
                }
                None => {
                    roster.warn(&unit, "missing Gini data, capability left unadjusted");
                    None
                }
            },
            None => None,
        };

        let mut total_gdp = 0.0;
        let mut total_pop = 0.0;
        let mut any = false;
        for &year in &years {
            let Some(value) = gdp.value(&unit, year) else {
                roster.exclude(&unit, format!("missing GDP data for {year}"));
                continue 'units;
            };
            let needs_population = per_capita || coefficient.is_some();
            let pop = if needs_population {
                match population.value(&unit, year) {
                    Some(p) => p,
                    None => {
                        roster.exclude(&unit, format!("missing population data for {year}"));
                        continue 'units;
                    }
                }
            } else {
                0.0
            };
            total_gdp += match coefficient {
                Some((g, adjuster)) => adjuster.adjust(value, pop, g),
                None => value,
            };
            total_pop += pop;
            any = true;
        }
        if !any {
            roster.exclude(&unit, format!("missing GDP data for {start}..={end}"));
            continue;
        }
        if !per_capita {
            metric.insert(unit, total_gdp);
        } else if total_pop > 0.0 {
            metric.insert(unit, total_gdp / total_pop);
        } else {
            roster.exclude(&unit, format!("zero population for {start}..={end}"));
        }
    }
    Ok(metric)
}

/// Warning text for a unit dropped over a window gap.
fn gap_reason(indicator: &str, err: &TableError, start: Year, end: Year) -> String {
    match err {
        TableError::MissingValue { year, .. } => format!("missing {indicator} data for {year}"),
        _ => format!("missing {indicator} data for {start}..={end}"),
    }
}

/// Product of responsibility and capability factors for `units`.
///
/// Weights are normalized by their sum first. A metric of `None` (weight of
/// zero) contributes factors of one.
///
/// # Errors
/// Propagates [`adjustment_factors`] errors, and
/// [`AllocationError::NumericDegeneracy`] if a unit is missing from a metric
/// map (roster and metrics out of sync).
pub fn combined_factors(
    units: &[String], responsibility: Option<&UnitMetric>, capability: Option<&UnitMetric>,
    opts: &AdjustedOptions,
) -> AllocResult<Array1<f64>> {
    let (w_resp, w_cap) = opts.weights.normalized();
    let mut factors = Array1::ones(units.len());
    if let Some(metric) = responsibility {
        let values = align(units, metric)?;
        factors *= &adjustment_factors(
            &values,
            w_resp,
            opts.responsibility.exponent,
            opts.responsibility.functional_form,
        )?;
    }
    if let Some(metric) = capability {
        let values = align(units, metric)?;
        factors *= &adjustment_factors(
            &values,
            w_cap,
            opts.capability.exponent,
            opts.capability.functional_form,
        )?;
    }
    Ok(factors)
}

/// Accounting windows of one adjusted allocation (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentWindows {
    pub responsibility_end: Year,
    pub capability: (Year, Year),
}

/// Combined factors for the current roster units.
///
/// Only metrics with a positive normalized weight are computed, and only
/// their inputs are required. Units excluded while building a metric leave
/// the roster; the returned factors align with `roster.units()` afterwards.
/// The responsibility window starts at `opts.responsibility`'s historical
/// year; a Gini table is required when `gini` is supplied.
///
/// # Errors
/// - [`AllocationError::MissingRequiredInput`] for an absent input table.
/// - [`AllocationError::NoUnitsRemaining`] if every unit was excluded.
/// - Metric and factor errors.
pub fn roster_factors(
    roster: &mut Roster, inputs: &AllocationInputs<'_>, approach: Approach, opts: &AdjustedOptions,
    gini: Option<&GiniAdjuster>, windows: AdjustmentWindows,
) -> AllocResult<Array1<f64>> {
    let (w_resp, w_cap) = opts.weights.normalized();
    let name = approach.name();

    let responsibility = if w_resp > 0.0 {
        let emissions = inputs.require_emissions(name)?;
        let metric = responsibility_metric(
            roster,
            emissions,
            inputs.population,
            opts.responsibility.historical_responsibility_year,
            windows.responsibility_end,
            opts.responsibility.per_capita,
        )?;
        roster.ensure_non_empty("emissions")?;
        Some(metric)
    } else {
        None
    };

    let capability = if w_cap > 0.0 {
        let gdp = inputs.require_gdp(name)?;
        let correction = match gini {
            Some(adjuster) => Some((inputs.require_gini(name)?, adjuster)),
            None => None,
        };
        let (start, end) = windows.capability;
        let metric = capability_metric(
            roster,
            gdp,
            inputs.population,
            correction,
            start,
            end,
            opts.capability.per_capita,
        )?;
        roster.ensure_non_empty("GDP")?;
        Some(metric)
    } else {
        None
    };

    combined_factors(roster.units(), responsibility.as_ref(), capability.as_ref(), opts)
}

fn align(units: &[String], metric: &UnitMetric) -> AllocResult<Array1<f64>> {
    units
        .iter()
        .map(|u| {
            metric
                .get(u)
                .copied()
                .ok_or(AllocationError::NumericDegeneracy { context: "metric alignment", value: f64::NAN })
        })
        .collect()
}
