//! Adapter that exposes a scalar target function as an `argmin` problem.
//!
//! Brent's method only needs function values, so the adapter implements
//! `CostFunction` and nothing else. The "cost" is the signed target value
//! whose root the solver brackets.
use argmin::core::{CostFunction, Error};

use crate::optimization::speed_solver::validation::validate_target;

/// Bridges a closure `speed -> margin` to `argmin`'s `CostFunction`.
pub struct SpeedProblem<'a, F>
where
    F: Fn(f64) -> f64,
{
    pub target_fn: &'a F,
}

impl<'a, F> SpeedProblem<'a, F>
where
    F: Fn(f64) -> f64,
{
    pub fn new(target_fn: &'a F) -> Self {
        Self { target_fn }
    }
}

impl<F> CostFunction for SpeedProblem<'_, F>
where
    F: Fn(f64) -> f64,
{
    type Param = f64;
    type Output = f64;

    /// Evaluate the target at `speed`.
    ///
    /// # Errors
    /// Returns `SolverError::NonFiniteTarget` (wrapped) for NaN/±∞ values.
    fn cost(&self, speed: &Self::Param) -> Result<Self::Output, Error> {
        let value = (self.target_fn)(*speed);
        Ok(validate_target(*speed, value)?)
    }
}
