//! Cumulative per-capita convergence pathways.
//!
//! Purpose
//! -------
//! Build annual share pathways that start at each unit's current emission
//! share, approach a long-run share exponentially with one shared speed, and
//! add up (weighted by the world pathway) to each unit's cumulative target
//! share exactly. The slowest speed that keeps every long-run share inside
//! `[0, 1]` is chosen.
//!
//! Key behaviors
//! -------------
//! - Year `k` of the horizon carries `L + (1 − s)^k (I − L)`, where `I` is
//!   the initial share, `s` the speed and `L` the long-run share.
//! - With year weights `f_k = W_k / ΣW` and `w(s) = Σ f_k (1 − s)^k`, the
//!   cumulative constraint `Σ f_k share_k = T` has the closed form
//!   `L = T + (T − I)·w / (1 − w)`.
//! - `w / (1 − w)` decreases in `s`, so each `L` moves monotonically toward
//!   `T` as the speed grows. Feasibility reduces to `w / (1 − w) <= r*`, with
//!   `r*` the tightest per-unit bound; [`ConvergenceProblem::feasibility_margin`]
//!   returns `r* − w / (1 − w)` and the speed solver finds its root.
//! - Strict mode fails with [`AllocationError::ConvergenceInfeasible`] when
//!   no speed up to `max_convergence_speed` is feasible. Permissive mode
//!   clips long-run shares at the maximum speed, redistributes the remainder
//!   and warns `strict=false:<ratio>` for every unit whose achieved/target
//!   ratio is not `1.00`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every year sums to one because `ΣI = ΣT = 1` implies `ΣL = 1`.
//! - Units whose initial share equals their target share keep that share in
//!   every year; if every unit does, no speed is computed.
//! - A one-year horizon returns the target shares directly.
//! - Net-negative world years are clipped to zero weight (with a warning on
//!   the world row); at least one year after the first must carry weight.
//!
//! Conventions
//! -----------
//! - The horizon is every world-pathway year from `first_allocation_year`.
//! - Target shares use cumulative population over the horizon. Adjusted
//!   variants scale it by responsibility factors over
//!   `[historical_responsibility_year, first_allocation_year]` and capability
//!   factors over the horizon; the initial shares stay unadjusted.
use ndarray::{Array1, Array2, Axis, s};
use tracing::{debug, warn};

use crate::{
    allocation::{
        budgets::population_sums,
        core::{
            AdjustedOptions, AllocationInputs, Approach, ConvergenceOptions, GiniAdjuster,
            GiniOptions, Parameters, PathwayAllocationResult, Roster,
            adjustments::{AdjustmentWindows, roster_factors},
            apply_deviation_constraint, normalize, shares_table,
        },
        errors::{AllocResult, AllocationError},
    },
    data::table::{WORLD_ID, Year},
    optimization::{
        errors::SolverError,
        numerical_stability::{CUMULATIVE_REL_TOL, DEGENERACY_EPS, guarded_ratio},
        speed_solver::{MIN_CONVERGENCE_SPEED, SpeedBounds, SpeedSolution, solve_speed},
    },
};

/// Smallest target magnitude used to scale the cumulative tolerance.
const TARGET_SCALE_FLOOR: f64 = 1e-6;

/// Initial shares, target shares and year weights of one convergence run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceProblem {
    initial: Array1<f64>,
    target: Array1<f64>,
    year_weights: Array1<f64>,
    max_ratio: f64,
}

impl ConvergenceProblem {
    /// Build a problem from share vectors and the world pathway over the
    /// horizon.
    ///
    /// # Errors
    /// - [`AllocationError::NumericDegeneracy`] for mismatched lengths, an
    ///   empty horizon, or negative/non-finite world values.
    /// - [`AllocationError::DegenerateGlobalTotal`] if the world pathway sums
    ///   to zero, or carries no weight after the first year of a multi-year
    ///   horizon.
    pub fn new(initial: Array1<f64>, target: Array1<f64>, world: &Array1<f64>) -> AllocResult<Self> {
        if initial.len() != target.len() {
            return Err(AllocationError::NumericDegeneracy {
                context: "initial/target length mismatch",
                value: target.len() as f64,
            });
        }
        if world.is_empty() {
            return Err(AllocationError::NumericDegeneracy { context: "empty horizon", value: 0.0 });
        }
        if let Some(&bad) = world.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(AllocationError::NumericDegeneracy {
                context: "world pathway value",
                value: bad,
            });
        }
        let total = world.sum();
        if total <= DEGENERACY_EPS {
            return Err(AllocationError::DegenerateGlobalTotal {
                indicator: "world pathway",
                value: total,
            });
        }
        let year_weights = world / total;
        let later = year_weights.sum() - year_weights[0];
        if year_weights.len() > 1 && later <= DEGENERACY_EPS {
            return Err(AllocationError::DegenerateGlobalTotal {
                indicator: "world pathway after the first year",
                value: later,
            });
        }

        let max_ratio = initial
            .iter()
            .zip(target.iter())
            .filter_map(|(&i, &t)| {
                if i > t {
                    guarded_ratio(t, i - t)
                } else if t > i {
                    guarded_ratio(1.0 - t, t - i)
                } else {
                    None
                }
            })
            .fold(f64::INFINITY, f64::min);

        Ok(Self { initial, target, year_weights, max_ratio })
    }

    pub fn initial(&self) -> &Array1<f64> {
        &self.initial
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn horizon(&self) -> usize {
        self.year_weights.len()
    }

    /// True when no unit constrains the speed (initial equals target).
    pub fn is_unconstrained(&self) -> bool {
        self.max_ratio.is_infinite()
    }

    /// `w(s) = Σ_k f_k (1 − s)^k`: weight still carried by the initial shares.
    pub fn initial_weight(&self, speed: f64) -> f64 {
        let retain = 1.0 - speed;
        let mut decay = 1.0;
        let mut weight = 0.0;
        for &f in &self.year_weights {
            weight += f * decay;
            decay *= retain;
        }
        weight
    }

    fn ratio(&self, speed: f64) -> f64 {
        let w = self.initial_weight(speed);
        w / (1.0 - w)
    }

    /// Long-run shares that meet every cumulative target exactly at `speed`.
    pub fn long_run_shares(&self, speed: f64) -> Array1<f64> {
        let r = self.ratio(speed);
        &self.target + &((&self.target - &self.initial) * r)
    }

    /// `r* − w/(1 − w)`: non-negative exactly when every long-run share lies
    /// in `[0, 1]`; non-decreasing in the speed.
    pub fn feasibility_margin(&self, speed: f64) -> f64 {
        self.max_ratio - self.ratio(speed)
    }

    /// `(units × years)` pathway for a speed and long-run shares.
    pub fn pathway(&self, speed: f64, long_run: &Array1<f64>) -> Array2<f64> {
        let gap = &self.initial - long_run;
        let mut out = Array2::zeros((long_run.len(), self.horizon()));
        let mut decay = 1.0;
        for mut column in out.columns_mut() {
            column.assign(&(long_run + &(&gap * decay)));
            decay *= 1.0 - speed;
        }
        out
    }

    /// World-weighted cumulative share of each pathway row.
    pub fn cumulative_shares(&self, pathway: &Array2<f64>) -> Array1<f64> {
        pathway.dot(&self.year_weights)
    }

    /// Unit index and distance outside `[0, 1]` of the worst long-run share.
    fn worst_violation(long_run: &Array1<f64>) -> Option<(usize, f64)> {
        long_run
            .iter()
            .map(|&l| (-l).max(l - 1.0))
            .enumerate()
            .filter(|(_, v)| *v > 0.0)
            .fold(None, |best, (i, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((i, v)),
            })
    }
}

/// Pathway and the speed that produced it.
///
/// `speed` is `None` for a one-year horizon or an unconstrained problem.
/// `fallback` is set when the permissive path was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceSolution {
    pub pathway: Array2<f64>,
    pub speed: Option<SpeedSolution>,
    pub fallback: bool,
}

/// Solve `problem` for the slowest feasible speed.
///
/// `units` labels the rows for errors and warnings; permissive-mode warnings
/// are recorded on `roster`.
///
/// # Errors
/// - [`AllocationError::ConvergenceInfeasible`] in strict mode when no speed
///   up to `opts.max_convergence_speed` is feasible.
/// - [`AllocationError::CumulativeTargetMissed`] if a feasible pathway misses
///   a target beyond the relative tolerance.
/// - Option validation and solver errors.
pub fn solve_convergence(
    problem: &ConvergenceProblem, opts: &ConvergenceOptions, units: &[String], roster: &mut Roster,
) -> AllocResult<ConvergenceSolution> {
    opts.validate()?;
    if problem.horizon() == 1 {
        let pathway = problem.target.clone().insert_axis(Axis(1));
        return Ok(ConvergenceSolution { pathway, speed: None, fallback: false });
    }
    let max_speed = opts.max_convergence_speed;
    if problem.is_unconstrained() {
        let pathway = problem.pathway(max_speed, &problem.target);
        return Ok(ConvergenceSolution { pathway, speed: None, fallback: false });
    }

    let bounds = SpeedBounds::new(MIN_CONVERGENCE_SPEED, max_speed)?;
    match solve_speed(bounds, &opts.solver, |s| problem.feasibility_margin(s)) {
        Ok(solution) => {
            let long_run = problem.long_run_shares(solution.speed);
            let pathway = problem.pathway(solution.speed, &long_run);
            verify_cumulative(problem, &pathway, units)?;
            debug!(
                speed = solution.speed,
                iterations = solution.iterations,
                method = ?solution.method,
                "convergence speed found"
            );
            Ok(ConvergenceSolution { pathway, speed: Some(solution), fallback: false })
        }
        Err(SolverError::NoFeasibleSpeed { .. }) if opts.strict => {
            let long_run = problem.long_run_shares(max_speed);
            let (index, shortfall) =
                ConvergenceProblem::worst_violation(&long_run).unwrap_or((0, 0.0));
            Err(AllocationError::ConvergenceInfeasible {
                unit_id: units.get(index).cloned().unwrap_or_default(),
                shortfall,
                max_speed,
            })
        }
        Err(SolverError::NoFeasibleSpeed { .. }) => {
            let pathway = permissive_pathway(problem, max_speed)?;
            let achieved = problem.cumulative_shares(&pathway);
            let mut flagged = 0usize;
            for (i, unit) in units.iter().enumerate() {
                let label = match guarded_ratio(achieved[i], problem.target[i]) {
                    Some(ratio) => format!("{ratio:.2}"),
                    None if achieved[i].abs() <= DEGENERACY_EPS => continue,
                    None => "inf".to_string(),
                };
                if label != "1.00" {
                    roster.warn(unit, format!("strict=false:{label}"));
                    flagged += 1;
                }
            }
            warn!(max_speed, flagged, "no feasible convergence speed, permissive fallback used");
            Ok(ConvergenceSolution { pathway, speed: None, fallback: true })
        }
        Err(err) => Err(err.into()),
    }
}

/// Cumulative per-capita convergence toward cumulative population shares.
///
/// # Errors
/// - [`AllocationError::MissingRequiredInput`] without emissions or a world
///   pathway.
/// - [`AllocationError::MissingGlobalTotal`] if the world pathway,
///   population or emissions lack a required year.
/// - Convergence errors, see [`solve_convergence`].
pub fn cumulative_per_capita_convergence(
    inputs: &AllocationInputs<'_>, first_allocation_year: Year, opts: &ConvergenceOptions,
) -> AllocResult<PathwayAllocationResult> {
    allocate(
        inputs,
        Approach::CumulativePerCapitaConvergence,
        first_allocation_year,
        opts,
        None,
        None,
    )
}

/// [`cumulative_per_capita_convergence`] with a responsibility/capability
/// adjusted target.
///
/// # Errors
/// As [`cumulative_per_capita_convergence`], plus adjustment errors.
pub fn cumulative_per_capita_convergence_adjusted(
    inputs: &AllocationInputs<'_>, first_allocation_year: Year, opts: &ConvergenceOptions,
    adjusted: &AdjustedOptions,
) -> AllocResult<PathwayAllocationResult> {
    adjusted.validate()?;
    allocate(
        inputs,
        Approach::CumulativePerCapitaConvergenceAdjusted,
        first_allocation_year,
        opts,
        Some(adjusted),
        None,
    )
}

/// [`cumulative_per_capita_convergence_adjusted`] with a Gini-corrected
/// capability metric.
///
/// # Errors
/// As [`cumulative_per_capita_convergence_adjusted`], plus Gini errors.
pub fn cumulative_per_capita_convergence_adjusted_gini(
    inputs: &AllocationInputs<'_>, first_allocation_year: Year, opts: &ConvergenceOptions,
    adjusted: &AdjustedOptions, gini: &GiniOptions,
) -> AllocResult<PathwayAllocationResult> {
    adjusted.validate()?;
    gini.validate()?;
    allocate(
        inputs,
        Approach::CumulativePerCapitaConvergenceAdjustedGini,
        first_allocation_year,
        opts,
        Some(adjusted),
        Some(gini),
    )
}

// ---- Helper Methods ----

fn allocate(
    inputs: &AllocationInputs<'_>, approach: Approach, first: Year, opts: &ConvergenceOptions,
    adjusted: Option<&AdjustedOptions>, gini: Option<&GiniOptions>,
) -> AllocResult<PathwayAllocationResult> {
    opts.validate()?;
    let world_table = inputs.require_world_pathway(approach.name())?;
    let emissions = inputs.require_emissions(approach.name())?;
    let population = inputs.population;

    if world_table.year_index(first).is_none() {
        return Err(AllocationError::MissingGlobalTotal { indicator: "world pathway", year: first });
    }
    let horizon = world_table.years_from(first);
    if let Some(&year) = horizon.iter().find(|&&y| population.year_index(y).is_none()) {
        return Err(AllocationError::MissingGlobalTotal { indicator: "population", year });
    }
    if emissions.year_index(first).is_none() {
        return Err(AllocationError::MissingGlobalTotal { indicator: "emissions", year: first });
    }
    let series = world_table.world_series()?;
    let offset = series.len() - horizon.len();
    let mut world = series.slice(s![offset..]).to_owned();

    let mut roster = Roster::from_population(population, &horizon);
    let net_negative: Vec<Year> =
        horizon.iter().zip(world.iter()).filter(|&(_, &w)| w < 0.0).map(|(&y, _)| y).collect();
    if !net_negative.is_empty() {
        world.mapv_inplace(|w| w.max(0.0));
        roster.warn(
            WORLD_ID,
            format!("net-negative world emissions in {net_negative:?} carry no cumulative weight"),
        );
    }
    for unit in roster.units().to_vec() {
        if emissions.value(&unit, first).is_none() {
            roster.exclude(&unit, format!("missing emissions data for {first}"));
        }
    }
    roster.ensure_non_empty("emissions")?;

    let last = horizon.last().copied().unwrap_or(first);
    let active = adjusted.filter(|a| !a.weights.is_zero());
    let target = match active {
        None => normalize(&population_sums(population, roster.units(), &horizon), "population")?,
        Some(adj) => {
            let adjuster = gini.map(|g| GiniAdjuster::new(*g)).transpose()?;
            let windows =
                AdjustmentWindows { responsibility_end: first, capability: (first, last) };
            let factors =
                roster_factors(&mut roster, inputs, approach, adj, adjuster.as_ref(), windows)?;
            let base = population_sums(population, roster.units(), &horizon);
            let target = normalize(&(&base * &factors), "adjusted population")?;
            match adj.max_deviation_sigma {
                Some(sigma) => apply_deviation_constraint(&target, &base, sigma)?,
                None => target,
            }
        }
    };
    let initial: Array1<f64> =
        roster.units().iter().map(|u| emissions.value(u, first).unwrap_or(0.0)).collect();
    let initial = normalize(&initial, "emissions")?;

    let units = roster.units().to_vec();
    let problem = ConvergenceProblem::new(initial, target, &world)?;
    let solution = solve_convergence(&problem, opts, &units, &mut roster)?;

    let mut params = Parameters::new();
    params.insert("first_allocation_year".into(), first.into());
    opts.record(&mut params);
    params.insert(
        "convergence_speed".into(),
        solution.speed.as_ref().map(|s| s.speed).into(),
    );
    if let Some(adj) = adjusted {
        adj.record(&mut params);
    }
    if let Some(g) = gini {
        g.record(&mut params);
    }

    let table = shares_table(&units, &horizon, solution.pathway)?;
    PathwayAllocationResult::new(approach, params, table, roster.into_warnings())
}

fn verify_cumulative(
    problem: &ConvergenceProblem, pathway: &Array2<f64>, units: &[String],
) -> AllocResult<()> {
    let achieved = problem.cumulative_shares(pathway);
    for (i, (&got, &want)) in achieved.iter().zip(problem.target.iter()).enumerate() {
        let tol = CUMULATIVE_REL_TOL * want.abs().max(TARGET_SCALE_FLOOR);
        if (got - want).abs() > tol {
            return Err(AllocationError::CumulativeTargetMissed {
                unit_id: units.get(i).cloned().unwrap_or_default(),
                target: want,
                achieved: got,
            });
        }
    }
    Ok(())
}

/// Pathway at `speed` with long-run shares clipped to `[0, 1]`.
///
/// Clipped units keep the cumulative share they reach; the remainder is
/// shared among the others in proportion to their targets, repeating until
/// no further unit is clipped.
fn permissive_pathway(problem: &ConvergenceProblem, speed: f64) -> AllocResult<Array2<f64>> {
    let n = problem.target.len();
    let w = problem.initial_weight(speed);
    let denom = 1.0 - w;
    if denom <= DEGENERACY_EPS {
        return Err(AllocationError::NumericDegeneracy { context: "convergence weight", value: w });
    }
    let initial = &problem.initial;
    let mut targets = problem.target.clone();
    let mut long_run = Array1::zeros(n);
    let mut fixed = vec![false; n];

    for _ in 0..=n {
        for i in (0..n).filter(|&i| !fixed[i]) {
            long_run[i] = (targets[i] - initial[i] * w) / denom;
        }
        let mut clipped = false;
        for i in 0..n {
            if fixed[i] {
                continue;
            }
            if long_run[i] < 0.0 || long_run[i] > 1.0 {
                long_run[i] = long_run[i].clamp(0.0, 1.0);
                fixed[i] = true;
                clipped = true;
            }
        }
        if !clipped {
            break;
        }
        let locked: f64 =
            (0..n).filter(|&i| fixed[i]).map(|i| long_run[i] * denom + initial[i] * w).sum();
        let free_target: f64 = (0..n).filter(|&i| !fixed[i]).map(|i| problem.target[i]).sum();
        if free_target <= DEGENERACY_EPS {
            break;
        }
        let scale = (1.0 - locked) / free_target;
        for i in (0..n).filter(|&i| !fixed[i]) {
            targets[i] = problem.target[i] * scale;
        }
    }

    let mut pathway = problem.pathway(speed, &long_run);
    for mut column in pathway.columns_mut() {
        let total = column.sum();
        if total.is_finite() && total > DEGENERACY_EPS {
            column /= total;
        }
    }
    Ok(pathway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::speed_solver::{SolverOptions, SpeedMethod};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Closed-form long-run shares and cumulative exactness.
    // - Monotonicity of the margin and of the approach rate in the speed.
    // - Degenerate horizons, flat pathways, strict and permissive failures.
    // -------------------------------------------------------------------------

    fn units(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("U{i}")).collect()
    }

    fn strict() -> ConvergenceOptions {
        ConvergenceOptions::default()
    }

    fn permissive(max_speed: f64) -> ConvergenceOptions {
        ConvergenceOptions::new(false, max_speed, SolverOptions::default()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Verify that a solved pathway starts at the initial shares, sums to one
    // every year and meets every cumulative target.
    //
    // Given
    // -----
    // - Initial [0.6, 0.4], target [0.4, 0.6], flat world pathway over 10 years.
    //
    // Expect
    // ------
    // - Year 0 equals the initial shares.
    // - Column sums are 1 within 1e-12.
    // - Cumulative shares equal the targets within 1e-6 relative.
    fn solved_pathway_meets_cumulative_targets() {
        // Arrange
        let world = Array1::from_elem(10, 5.0);
        let problem = ConvergenceProblem::new(array![0.6, 0.4], array![0.4, 0.6], &world).unwrap();
        let mut roster = Roster::default();

        // Act
        let solution = solve_convergence(&problem, &strict(), &units(2), &mut roster).unwrap();

        // Assert
        let pathway = &solution.pathway;
        assert_relative_eq!(pathway[[0, 0]], 0.6, epsilon = 1e-15);
        assert_relative_eq!(pathway[[1, 0]], 0.4, epsilon = 1e-15);
        for column in pathway.columns() {
            assert_relative_eq!(column.sum(), 1.0, epsilon = 1e-12);
        }
        let achieved = problem.cumulative_shares(pathway);
        assert_relative_eq!(achieved[0], 0.4, max_relative = 1e-6);
        assert_relative_eq!(achieved[1], 0.6, max_relative = 1e-6);
        assert!(solution.speed.is_some());
        assert!(roster.warnings().is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Verify that the chosen speed is the slowest feasible one.
    //
    // Given
    // -----
    // - A target far from the initial shares over a short horizon, so the
    //   lower bound is infeasible.
    //
    // Expect
    // ------
    // - The solver runs Brent (`SpeedMethod::Root`).
    // - The margin is non-negative at the speed and negative slightly below.
    fn chosen_speed_is_minimal() {
        let world = Array1::from_elem(5, 1.0);
        let problem = ConvergenceProblem::new(array![0.9, 0.1], array![0.3, 0.7], &world).unwrap();
        let solution =
            solve_convergence(&problem, &strict(), &units(2), &mut Roster::default()).unwrap();
        let speed = solution.speed.expect("solver ran");

        assert_eq!(speed.method, SpeedMethod::Root);
        assert!(problem.feasibility_margin(speed.speed) >= 0.0);
        assert!(problem.feasibility_margin(speed.speed - 1e-6) < 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify monotonicity in the speed.
    //
    // Given
    // -----
    // - Speeds sampled over [0.001, 0.9].
    //
    // Expect
    // ------
    // - The feasibility margin never decreases.
    // - The weight left on the initial shares never grows.
    // - Each long-run share moves toward its target.
    fn margin_and_approach_are_monotone() {
        let problem = ConvergenceProblem::new(
            array![0.7, 0.3],
            array![0.2, 0.8],
            &Array1::from_elem(20, 1.0),
        )
        .unwrap();
        let speeds: Vec<f64> = (0..=50).map(|k| 0.001 + k as f64 * (0.899 / 50.0)).collect();
        for pair in speeds.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(problem.feasibility_margin(b) >= problem.feasibility_margin(a));
            assert!(problem.initial_weight(b) <= problem.initial_weight(a));
            let la = problem.long_run_shares(a);
            let lb = problem.long_run_shares(b);
            assert!((lb[0] - 0.2).abs() <= (la[0] - 0.2).abs() + 1e-15);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the degenerate cases that bypass the solver.
    //
    // Given
    // -----
    // - A one-year horizon, and a multi-year problem with initial == target.
    //
    // Expect
    // ------
    // - One year: the pathway is exactly the target.
    // - Equal shares: every year equals the initial shares exactly.
    // - No speed is reported in either case.
    fn degenerate_cases_skip_solver() {
        let single =
            ConvergenceProblem::new(array![0.9, 0.1], array![0.3, 0.7], &array![40.0]).unwrap();
        let one = solve_convergence(&single, &strict(), &units(2), &mut Roster::default()).unwrap();
        assert_eq!(one.pathway.column(0).to_owned(), array![0.3, 0.7]);
        assert!(one.speed.is_none());

        let world = Array1::from_elem(6, 2.0);
        let flat = ConvergenceProblem::new(array![0.25, 0.75], array![0.25, 0.75], &world).unwrap();
        let out = solve_convergence(&flat, &strict(), &units(2), &mut Roster::default()).unwrap();
        for column in out.pathway.columns() {
            assert_eq!(column.to_owned(), array![0.25, 0.75]);
        }
        assert!(out.speed.is_none());
    }

    #[test]
    // Purpose
    // -------
    // Verify that a zero initial share is handled without NaN.
    //
    // Given
    // -----
    // - A new entrant with initial share 0 and target 0.2.
    //
    // Expect
    // ------
    // - A finite pathway starting at 0 that meets the target.
    fn zero_initial_share_is_finite() {
        let problem = ConvergenceProblem::new(
            array![0.0, 1.0],
            array![0.2, 0.8],
            &Array1::from_elem(30, 1.0),
        )
        .unwrap();
        let out = solve_convergence(&problem, &strict(), &units(2), &mut Roster::default()).unwrap();
        assert!(out.pathway.iter().all(|v| v.is_finite()));
        assert_eq!(out.pathway[[0, 0]], 0.0);
        let achieved = problem.cumulative_shares(&out.pathway);
        assert_relative_eq!(achieved[0], 0.2, max_relative = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Verify strict failure and the permissive fallback on an infeasible
    // problem.
    //
    // Given
    // -----
    // - Initial [0.98, 0.01, 0.01], target [0.02, 0.49, 0.49] over 3 years
    //   with the speed capped at 0.1.
    //
    // Expect
    // ------
    // - Strict: `ConvergenceInfeasible` naming U0 with a positive shortfall.
    // - Permissive: a pathway summing to one per year and `strict=false:`
    //   warnings.
    fn infeasible_problem_strict_and_permissive() {
        let problem = ConvergenceProblem::new(
            array![0.98, 0.01, 0.01],
            array![0.02, 0.49, 0.49],
            &Array1::from_elem(3, 1.0),
        )
        .unwrap();
        let capped = ConvergenceOptions::new(true, 0.1, SolverOptions::default()).unwrap();

        match solve_convergence(&problem, &capped, &units(3), &mut Roster::default()) {
            Err(AllocationError::ConvergenceInfeasible { unit_id, shortfall, max_speed }) => {
                assert_eq!(unit_id, "U0");
                assert!(shortfall > 0.0);
                assert_eq!(max_speed, 0.1);
            }
            other => panic!("expected ConvergenceInfeasible, got {other:?}"),
        }

        let mut roster = Roster::default();
        let out = solve_convergence(&problem, &permissive(0.1), &units(3), &mut roster).unwrap();
        assert!(out.fallback);
        for column in out.pathway.columns() {
            assert_relative_eq!(column.sum(), 1.0, epsilon = 1e-12);
        }
        assert!(roster.warnings().values().any(|w| w.starts_with("strict=false:")));
    }

    #[test]
    // Purpose
    // -------
    // Ensure net-negative world years are accepted with zero cumulative
    // weight instead of failing the allocation.
    //
    // Given
    // -----
    // - A world pathway [100, 60, 20, -10] over 2020..2023.
    // - Emission shares [0.375, 0.625], population shares [0.25, 0.75].
    //
    // Expect
    // ------
    // - A four-year pathway whose years each sum to one.
    // - A world-row warning naming 2023.
    // - Cumulative shares over the non-negative years meet the targets.
    fn net_negative_world_years_carry_no_weight() {
        // Arrange
        use crate::data::table::{IndicatorTable, ValueDomain};
        let years = [2020, 2021, 2022, 2023];
        let pop = IndicatorTable::from_rows(
            "million",
            &years,
            &[("A", &[100.0; 4]), ("B", &[300.0; 4])],
            ValueDomain::NonNegative,
        )
        .unwrap();
        let em = IndicatorTable::from_rows(
            "Mt",
            &years,
            &[("A", &[150.0; 4]), ("B", &[250.0; 4])],
            ValueDomain::Signed,
        )
        .unwrap();
        let world = IndicatorTable::from_rows(
            "Mt",
            &years,
            &[(WORLD_ID, &[100.0, 60.0, 20.0, -10.0])],
            ValueDomain::Signed,
        )
        .unwrap();
        let inputs = AllocationInputs::new(&pop).with_emissions(&em).with_world_pathway(&world);

        // Act
        let result = cumulative_per_capita_convergence(&inputs, 2020, &strict()).unwrap();

        // Assert
        assert_eq!(result.years(), &years);
        for column in result.relative_shares().values().columns() {
            assert_relative_eq!(column.sum(), 1.0, epsilon = 1e-10);
        }
        assert!(result.warnings()[WORLD_ID].contains("2023"));
        let cumulative: f64 = [100.0, 60.0, 20.0]
            .iter()
            .zip(years)
            .map(|(w, y)| w * result.share("A", y).unwrap())
            .sum::<f64>()
            / 180.0;
        assert_relative_eq!(cumulative, 0.25, max_relative = 1e-6);
    }
}
