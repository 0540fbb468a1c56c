//! User-facing entrypoint: smallest feasible convergence speed.
use crate::optimization::{
    errors::{SolverError, SolverResult},
    speed_solver::{
        SolverOptions, SpeedBounds,
        adapter::SpeedProblem,
        run::run_brent,
        traits::{SpeedMethod, SpeedSolution},
        validation::validate_target,
    },
};

/// Find the smallest speed in `bounds` at which `target_fn` is non-negative.
///
/// `target_fn` is a feasibility margin: negative means "infeasible at this
/// speed", non-negative means feasible. The margin is expected to increase
/// with the speed, so the feasible set is an interval `[s*, upper]`.
///
/// Steps:
/// 1. If the margin at `bounds.lower()` is already non-negative, return the
///    lower bound without running the solver.
/// 2. If the margin at `bounds.upper()` is negative, fail with
///    [`SolverError::NoFeasibleSpeed`].
/// 3. Otherwise bracket the sign change with Brent's method.
/// 4. If the Brent iterate sits on the infeasible side (margin < 0 by
///    round-off), bisect between it and the upper bound until the width drops
///    below `opts.tol`, returning the feasible end.
///
/// # Errors
/// - [`SolverError::NonFiniteTarget`] if an evaluation is NaN/±∞.
/// - [`SolverError::NoFeasibleSpeed`] as described above.
/// - Option validation errors and wrapped `argmin` failures.
pub fn solve_speed<F>(
    bounds: SpeedBounds, opts: &SolverOptions, target_fn: F,
) -> SolverResult<SpeedSolution>
where
    F: Fn(f64) -> f64,
{
    opts.validate()?;
    let lower = bounds.lower();
    let upper = bounds.upper();

    let f_lower = validate_target(lower, target_fn(lower))?;
    if f_lower >= 0.0 {
        return Ok(SpeedSolution {
            speed: lower,
            margin: f_lower,
            iterations: 0,
            converged: true,
            status: "FeasibleAtLowerBound".to_string(),
            method: SpeedMethod::LowerBound,
        });
    }
    let f_upper = validate_target(upper, target_fn(upper))?;
    if f_upper < 0.0 {
        return Err(SolverError::NoFeasibleSpeed { upper, margin: f_upper });
    }

    let root = run_brent(bounds, opts, SpeedProblem::new(&target_fn))?;
    let candidate = root.speed.clamp(lower, upper);
    let (speed, margin, steps) = refine_feasible(candidate, upper, f_upper, opts, &target_fn)?;

    Ok(SpeedSolution {
        speed,
        margin,
        iterations: root.iterations + steps,
        converged: root.converged,
        status: root.status,
        method: SpeedMethod::Root,
    })
}

// ---- Helper Methods ----

fn refine_feasible<F>(
    candidate: f64, upper: f64, f_upper: f64, opts: &SolverOptions, target_fn: &F,
) -> SolverResult<(f64, f64, u64)>
where
    F: Fn(f64) -> f64,
{
    let f_candidate = validate_target(candidate, target_fn(candidate))?;
    if f_candidate >= 0.0 {
        return Ok((candidate, f_candidate, 0));
    }
    let (mut lo, mut hi, mut f_hi) = (candidate, upper, f_upper);
    let mut steps = 0;
    while hi - lo > opts.tol && steps < opts.max_iter {
        let mid = 0.5 * (lo + hi);
        let f_mid = validate_target(mid, target_fn(mid))?;
        if f_mid >= 0.0 {
            hi = mid;
            f_hi = f_mid;
        } else {
            lo = mid;
        }
        steps += 1;
    }
    Ok((hi, f_hi, steps))
}
