//! Execution helper that runs `argmin`'s Brent root-finder on a speed target
//! and returns a crate-friendly [`RootOutcome`].
use argmin::{
    core::{Executor, State, TerminationReason, TerminationStatus},
    solver::brent::BrentRoot,
};

use crate::optimization::{
    errors::{SolverError, SolverResult},
    speed_solver::{SolverOptions, SpeedBounds, adapter::SpeedProblem},
};

/// Raw result of a Brent run before the feasibility refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct RootOutcome {
    pub speed: f64,
    pub iterations: u64,
    pub converged: bool,
    pub status: String,
}

/// Run Brent's method on `problem` over `bounds`.
///
/// Wires up the adapter, the `BrentRoot` solver, the iteration cap and, behind
/// the `obs_slog` feature, a terminal observer when `opts.verbose` is set.
///
/// # Returns
/// The last iterate reported by the solver. `get_param` is used rather than
/// the best parameter because argmin tracks "best" as the lowest cost, which
/// for a signed target is not the root.
///
/// # Errors
/// - Propagates `argmin` runtime errors (e.g. a bracket without a sign change)
///   via `From<argmin::core::Error>`.
/// - [`SolverError::MissingRoot`] if the final state carries no parameter.
pub fn run_brent<F>(
    bounds: SpeedBounds, opts: &SolverOptions, problem: SpeedProblem<'_, F>,
) -> SolverResult<RootOutcome>
where
    F: Fn(f64) -> f64,
{
    let solver = BrentRoot::new(bounds.lower(), bounds.upper(), opts.tol);
    let mut executor = Executor::new(problem, solver);
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        executor = executor.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    let max_iter = opts.max_iter;
    executor = executor.configure(|state| state.max_iters(max_iter));

    let result = executor.run()?;
    let state = result.state();
    let speed = state.get_param().copied().ok_or(SolverError::MissingRoot)?;
    let iterations = state.get_iter();
    let status = state.get_termination_status();
    let converged =
        matches!(status, TerminationStatus::Terminated(TerminationReason::SolverConverged));
    let status = format!("{status:?}");
    Ok(RootOutcome { speed, iterations, converged, status })
}
