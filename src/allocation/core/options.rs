//! Configuration structs threaded through the allocators.
//!
//! - [`FunctionalForm`]: shape of the adjustment factor.
//! - [`ResponsibilityOptions`] / [`CapabilityOptions`]: metric construction and
//!   exponent for each adjustment.
//! - [`AdjustedOptions`]: weights plus both metric options and the deviation
//!   bound shared by every adjusted approach.
//! - [`GiniOptions`]: subsistence floor and cap of the Gini correction.
//! - [`ConvergenceOptions`]: strictness, speed bound and solver settings.
//!
//! Every struct has a validating `new` and a documented `Default`; nothing in
//! the crate reads process-wide defaults.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    allocation::{
        core::{results::Parameters, weights::AdjustmentWeights},
        errors::{AllocResult, AllocationError},
    },
    data::table::Year,
    optimization::speed_solver::{
        DEFAULT_MAX_CONVERGENCE_SPEED, MIN_CONVERGENCE_SPEED, SolverOptions,
    },
};

/// Default start of the historical responsibility window.
pub const DEFAULT_HISTORICAL_RESPONSIBILITY_YEAR: Year = 1990;

/// Default bound of the deviation constraint, in standard deviations.
pub const DEFAULT_MAX_DEVIATION_SIGMA: f64 = 2.0;

/// Default cap on the Gini-driven reduction of GDP.
pub const DEFAULT_MAX_GINI_ADJUSTMENT: f64 = 0.8;

/// Shape of the adjustment factor applied to a normalized metric `x`.
///
/// - `Asinh`: `exp(-w·e·asinh(x))`
/// - `Linear`: `max(1 - w·e·x, ε)`
/// - `Power`: `x^(-w·e)`, with non-positive `x` mapped to a factor of 1
///
/// Parsing is case-insensitive (`"asinh"`, `"linear"`, `"power"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionalForm {
    Asinh,
    Linear,
    Power,
}

impl FunctionalForm {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionalForm::Asinh => "asinh",
            FunctionalForm::Linear => "linear",
            FunctionalForm::Power => "power",
        }
    }
}

impl FromStr for FunctionalForm {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asinh" => Ok(FunctionalForm::Asinh),
            "linear" => Ok(FunctionalForm::Linear),
            "power" => Ok(FunctionalForm::Power),
            _ => Err(AllocationError::InvalidParameter {
                approach: String::new(),
                name: "functional_form".to_string(),
                reason: format!("'{s}' is not one of 'asinh', 'linear', 'power'"),
            }),
        }
    }
}

/// Historical-responsibility metric settings.
///
/// Default: window start 1990, per capita, exponent 1.0, `Asinh`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponsibilityOptions {
    pub historical_responsibility_year: Year,
    pub per_capita: bool,
    pub exponent: f64,
    pub functional_form: FunctionalForm,
}

impl ResponsibilityOptions {
    /// # Errors
    /// [`AllocationError::InvalidExponent`] for negative or non-finite exponents.
    pub fn new(
        historical_responsibility_year: Year, per_capita: bool, exponent: f64,
        functional_form: FunctionalForm,
    ) -> AllocResult<Self> {
        verify_exponent("responsibility_exponent", exponent)?;
        Ok(Self { historical_responsibility_year, per_capita, exponent, functional_form })
    }
}

impl Default for ResponsibilityOptions {
    fn default() -> Self {
        Self {
            historical_responsibility_year: DEFAULT_HISTORICAL_RESPONSIBILITY_YEAR,
            per_capita: true,
            exponent: 1.0,
            functional_form: FunctionalForm::Asinh,
        }
    }
}

/// Economic-capability metric settings.
///
/// Default: per capita, exponent 1.0, `Asinh`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOptions {
    pub per_capita: bool,
    pub exponent: f64,
    pub functional_form: FunctionalForm,
}

impl CapabilityOptions {
    /// # Errors
    /// [`AllocationError::InvalidExponent`] for negative or non-finite exponents.
    pub fn new(per_capita: bool, exponent: f64, functional_form: FunctionalForm) -> AllocResult<Self> {
        verify_exponent("capability_exponent", exponent)?;
        Ok(Self { per_capita, exponent, functional_form })
    }
}

impl Default for CapabilityOptions {
    fn default() -> Self {
        Self { per_capita: true, exponent: 1.0, functional_form: FunctionalForm::Asinh }
    }
}

/// Subsistence-protection settings for the Gini correction.
///
/// - `income_floor`: per-capita income exempt from capability, in GDP units.
/// - `max_gini_adjustment`: largest admissible relative reduction of GDP.
///
/// Default: floor 0.0 (no correction), cap 0.8.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GiniOptions {
    pub income_floor: f64,
    pub max_gini_adjustment: f64,
}

impl GiniOptions {
    /// # Errors
    /// - [`AllocationError::InvalidIncomeFloor`] for negative or non-finite floors.
    /// - [`AllocationError::InvalidMaxGiniAdjustment`] outside `[0, 1]`.
    pub fn new(income_floor: f64, max_gini_adjustment: f64) -> AllocResult<Self> {
        let opts = Self { income_floor, max_gini_adjustment };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> AllocResult<()> {
        if !self.income_floor.is_finite() || self.income_floor < 0.0 {
            return Err(AllocationError::InvalidIncomeFloor { value: self.income_floor });
        }
        if !(0.0..=1.0).contains(&self.max_gini_adjustment) {
            return Err(AllocationError::InvalidMaxGiniAdjustment {
                value: self.max_gini_adjustment,
            });
        }
        Ok(())
    }

    pub(crate) fn record(&self, params: &mut Parameters) {
        params.insert("income_floor".into(), self.income_floor.into());
        params.insert("max_gini_adjustment".into(), self.max_gini_adjustment.into());
    }
}

impl Default for GiniOptions {
    fn default() -> Self {
        Self { income_floor: 0.0, max_gini_adjustment: DEFAULT_MAX_GINI_ADJUSTMENT }
    }
}

/// Settings shared by every responsibility/capability-adjusted approach.
///
/// `max_deviation_sigma = None` disables the deviation constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedOptions {
    pub weights: AdjustmentWeights,
    pub responsibility: ResponsibilityOptions,
    pub capability: CapabilityOptions,
    pub max_deviation_sigma: Option<f64>,
}

impl AdjustedOptions {
    /// # Errors
    /// Propagates weight/exponent errors and
    /// [`AllocationError::InvalidDeviationSigma`] for negative or non-finite bounds.
    pub fn new(
        weights: AdjustmentWeights, responsibility: ResponsibilityOptions,
        capability: CapabilityOptions, max_deviation_sigma: Option<f64>,
    ) -> AllocResult<Self> {
        let opts = Self { weights, responsibility, capability, max_deviation_sigma };
        opts.validate()?;
        Ok(opts)
    }

    /// Re-run the constructor checks, e.g. after deserialization.
    pub fn validate(&self) -> AllocResult<()> {
        self.weights.validate()?;
        verify_exponent("responsibility_exponent", self.responsibility.exponent)?;
        verify_exponent("capability_exponent", self.capability.exponent)?;
        if let Some(sigma) = self.max_deviation_sigma {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(AllocationError::InvalidDeviationSigma { value: sigma });
            }
        }
        Ok(())
    }

    /// Provenance entries; weights are stored normalized.
    pub(crate) fn record(&self, params: &mut Parameters) {
        let (w_resp, w_cap) = self.weights.normalized();
        let resp = &self.responsibility;
        let cap = &self.capability;
        params.insert("responsibility_weight".into(), w_resp.into());
        params.insert("capability_weight".into(), w_cap.into());
        params.insert(
            "historical_responsibility_year".into(),
            resp.historical_responsibility_year.into(),
        );
        params.insert("responsibility_per_capita".into(), resp.per_capita.into());
        params.insert("responsibility_exponent".into(), resp.exponent.into());
        params.insert("responsibility_functional_form".into(), resp.functional_form.name().into());
        params.insert("capability_per_capita".into(), cap.per_capita.into());
        params.insert("capability_exponent".into(), cap.exponent.into());
        params.insert("capability_functional_form".into(), cap.functional_form.name().into());
        params.insert("max_deviation_sigma".into(), self.max_deviation_sigma.into());
    }
}

impl Default for AdjustedOptions {
    fn default() -> Self {
        Self {
            weights: AdjustmentWeights::zero(),
            responsibility: ResponsibilityOptions::default(),
            capability: CapabilityOptions::default(),
            max_deviation_sigma: Some(DEFAULT_MAX_DEVIATION_SIGMA),
        }
    }
}

/// Settings of the cumulative per-capita convergence solver.
///
/// - `strict`: fail with `ConvergenceInfeasible` instead of falling back.
/// - `max_convergence_speed`: upper bound of the speed search, in
///   `(MIN_CONVERGENCE_SPEED, 1]`.
/// - `solver`: Brent tolerance, iteration cap and verbosity.
///
/// Default: strict, max speed 0.9, `SolverOptions::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceOptions {
    pub strict: bool,
    pub max_convergence_speed: f64,
    pub solver: SolverOptions,
}

impl ConvergenceOptions {
    /// # Errors
    /// [`AllocationError::InvalidConvergenceSpeed`] for bounds outside
    /// `(0.001, 1]`; solver option errors are wrapped.
    pub fn new(strict: bool, max_convergence_speed: f64, solver: SolverOptions) -> AllocResult<Self> {
        let opts = Self { strict, max_convergence_speed, solver };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> AllocResult<()> {
        let value = self.max_convergence_speed;
        if !value.is_finite() {
            return Err(AllocationError::InvalidConvergenceSpeed {
                value,
                reason: "Speed must be finite.",
            });
        }
        if value <= MIN_CONVERGENCE_SPEED || value > 1.0 {
            return Err(AllocationError::InvalidConvergenceSpeed {
                value,
                reason: "Speed must lie in (0.001, 1].",
            });
        }
        self.solver.validate()?;
        Ok(())
    }

    pub(crate) fn record(&self, params: &mut Parameters) {
        params.insert("strict".into(), self.strict.into());
        params.insert("max_convergence_speed".into(), self.max_convergence_speed.into());
        params.insert("solver_tolerance".into(), self.solver.tol.into());
        params.insert("solver_max_iter".into(), (self.solver.max_iter as i64).into());
    }
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            strict: true,
            max_convergence_speed: DEFAULT_MAX_CONVERGENCE_SPEED,
            solver: SolverOptions::default(),
        }
    }
}

// ---- Helper Methods ----

pub(crate) fn verify_exponent(name: &'static str, value: f64) -> AllocResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AllocationError::InvalidExponent { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Ensure the option constructors reject out-of-range settings.
    //
    // Given
    // -----
    // - A negative exponent, a negative floor, a cap above 1, a negative
    //   sigma and a speed bound at the lower limit.
    //
    // Expect
    // ------
    // - The matching `AllocationError` variant for each case.
    fn constructors_reject_invalid_settings() {
        assert!(matches!(
            CapabilityOptions::new(true, -0.5, FunctionalForm::Asinh),
            Err(AllocationError::InvalidExponent { name: "capability_exponent", .. })
        ));
        assert!(matches!(
            GiniOptions::new(-1.0, 0.8),
            Err(AllocationError::InvalidIncomeFloor { .. })
        ));
        assert!(matches!(
            GiniOptions::new(0.0, 1.2),
            Err(AllocationError::InvalidMaxGiniAdjustment { .. })
        ));
        assert!(matches!(
            AdjustedOptions::new(
                AdjustmentWeights::zero(),
                ResponsibilityOptions::default(),
                CapabilityOptions::default(),
                Some(-1.0)
            ),
            Err(AllocationError::InvalidDeviationSigma { .. })
        ));
        assert!(matches!(
            ConvergenceOptions::new(true, MIN_CONVERGENCE_SPEED, SolverOptions::default()),
            Err(AllocationError::InvalidConvergenceSpeed { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Verify case-insensitive parsing of functional forms.
    //
    // Given
    // -----
    // - "ASINH", "Linear", "power" and "log".
    //
    // Expect
    // ------
    // - The first three parse; "log" is rejected.
    fn functional_form_parses_case_insensitively() {
        assert_eq!("ASINH".parse::<FunctionalForm>().ok(), Some(FunctionalForm::Asinh));
        assert_eq!("Linear".parse::<FunctionalForm>().ok(), Some(FunctionalForm::Linear));
        assert_eq!("power".parse::<FunctionalForm>().ok(), Some(FunctionalForm::Power));
        assert!("log".parse::<FunctionalForm>().is_err());
    }
}
