//! Typed allocation requests and their dispatch.
//!
//! Purpose
//! -------
//! Pair every [`Approach`] with the typed options its allocator needs, build
//! those options from a loose [`Parameters`] map (as found in a parameter
//! grid or a Python call), and dispatch to the allocator with an exhaustive
//! `match`.
//!
//! Key behaviors
//! -------------
//! - [`AllocationRequest::from_parameters`] rejects keys outside the
//!   approach's schema and reports missing required keys before any option
//!   is built.
//! - Absent optional keys take the option structs' `Default` values. A
//!   `null` value means "disabled" for `max_deviation_sigma` and
//!   `historical_debt_current_year`, and "default" elsewhere.
//! - Integral floats (`2020.0`) are accepted where years or counts are
//!   expected, and kebab-case keys are read as their snake-case form.
use crate::{
    allocation::{
        budgets::{equal_per_capita_budget, per_capita_adjusted_budget, per_capita_adjusted_gini_budget},
        core::{
            AdjustedOptions, AdjustmentWeights, AllocationInputs, AllocationResult, Approach,
            CapabilityOptions, ConvergenceOptions, FunctionalForm, GiniOptions, ParameterValue,
            Parameters, ResponsibilityOptions,
        },
        errors::{AllocResult, AllocationError},
        pathways::{
            HistoricalDebt, cumulative_per_capita_convergence,
            cumulative_per_capita_convergence_adjusted,
            cumulative_per_capita_convergence_adjusted_gini, equal_per_capita, per_capita_adjusted,
            per_capita_adjusted_gini, per_capita_convergence,
        },
    },
    data::table::Year,
    optimization::speed_solver::SolverOptions,
};

/// One fully specified allocator call.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationRequest {
    EqualPerCapitaBudget {
        allocation_year: Year,
        preserve: bool,
    },
    PerCapitaAdjustedBudget {
        allocation_year: Year,
        preserve: bool,
        adjusted: AdjustedOptions,
    },
    PerCapitaAdjustedGiniBudget {
        allocation_year: Year,
        preserve: bool,
        adjusted: AdjustedOptions,
        gini: GiniOptions,
    },
    EqualPerCapita {
        first_allocation_year: Year,
        preserve: bool,
        debt: Option<HistoricalDebt>,
    },
    PerCapitaAdjusted {
        first_allocation_year: Year,
        preserve: bool,
        adjusted: AdjustedOptions,
        debt: Option<HistoricalDebt>,
    },
    PerCapitaAdjustedGini {
        first_allocation_year: Year,
        preserve: bool,
        adjusted: AdjustedOptions,
        gini: GiniOptions,
        debt: Option<HistoricalDebt>,
    },
    PerCapitaConvergence {
        first_allocation_year: Year,
        convergence_year: Year,
    },
    CumulativePerCapitaConvergence {
        first_allocation_year: Year,
        convergence: ConvergenceOptions,
    },
    CumulativePerCapitaConvergenceAdjusted {
        first_allocation_year: Year,
        convergence: ConvergenceOptions,
        adjusted: AdjustedOptions,
    },
    CumulativePerCapitaConvergenceAdjustedGini {
        first_allocation_year: Year,
        convergence: ConvergenceOptions,
        adjusted: AdjustedOptions,
        gini: GiniOptions,
    },
}

impl AllocationRequest {
    pub fn approach(&self) -> Approach {
        match self {
            AllocationRequest::EqualPerCapitaBudget { .. } => Approach::EqualPerCapitaBudget,
            AllocationRequest::PerCapitaAdjustedBudget { .. } => Approach::PerCapitaAdjustedBudget,
            AllocationRequest::PerCapitaAdjustedGiniBudget { .. } => {
                Approach::PerCapitaAdjustedGiniBudget
            }
            AllocationRequest::EqualPerCapita { .. } => Approach::EqualPerCapita,
            AllocationRequest::PerCapitaAdjusted { .. } => Approach::PerCapitaAdjusted,
            AllocationRequest::PerCapitaAdjustedGini { .. } => Approach::PerCapitaAdjustedGini,
            AllocationRequest::PerCapitaConvergence { .. } => Approach::PerCapitaConvergence,
            AllocationRequest::CumulativePerCapitaConvergence { .. } => {
                Approach::CumulativePerCapitaConvergence
            }
            AllocationRequest::CumulativePerCapitaConvergenceAdjusted { .. } => {
                Approach::CumulativePerCapitaConvergenceAdjusted
            }
            AllocationRequest::CumulativePerCapitaConvergenceAdjustedGini { .. } => {
                Approach::CumulativePerCapitaConvergenceAdjustedGini
            }
        }
    }

    /// Run the allocator for this request.
    ///
    /// # Errors
    /// Whatever the allocator returns.
    pub fn run(&self, inputs: &AllocationInputs<'_>) -> AllocResult<AllocationResult> {
        let result: AllocationResult = match self {
            AllocationRequest::EqualPerCapitaBudget { allocation_year, preserve } => {
                equal_per_capita_budget(inputs, *allocation_year, *preserve)?.into()
            }
            AllocationRequest::PerCapitaAdjustedBudget { allocation_year, preserve, adjusted } => {
                per_capita_adjusted_budget(inputs, *allocation_year, *preserve, adjusted)?.into()
            }
            AllocationRequest::PerCapitaAdjustedGiniBudget {
                allocation_year,
                preserve,
                adjusted,
                gini,
            } => per_capita_adjusted_gini_budget(inputs, *allocation_year, *preserve, adjusted, gini)?
                .into(),
            AllocationRequest::EqualPerCapita { first_allocation_year, preserve, debt } => {
                equal_per_capita(inputs, *first_allocation_year, *preserve, *debt)?.into()
            }
            AllocationRequest::PerCapitaAdjusted {
                first_allocation_year,
                preserve,
                adjusted,
                debt,
            } => per_capita_adjusted(inputs, *first_allocation_year, *preserve, adjusted, *debt)?
                .into(),
            AllocationRequest::PerCapitaAdjustedGini {
                first_allocation_year,
                preserve,
                adjusted,
                gini,
                debt,
            } => per_capita_adjusted_gini(
                inputs,
                *first_allocation_year,
                *preserve,
                adjusted,
                gini,
                *debt,
            )?
            .into(),
            AllocationRequest::PerCapitaConvergence { first_allocation_year, convergence_year } => {
                per_capita_convergence(inputs, *first_allocation_year, *convergence_year)?.into()
            }
            AllocationRequest::CumulativePerCapitaConvergence {
                first_allocation_year,
                convergence,
            } => cumulative_per_capita_convergence(inputs, *first_allocation_year, convergence)?
                .into(),
            AllocationRequest::CumulativePerCapitaConvergenceAdjusted {
                first_allocation_year,
                convergence,
                adjusted,
            } => cumulative_per_capita_convergence_adjusted(
                inputs,
                *first_allocation_year,
                convergence,
                adjusted,
            )?
            .into(),
            AllocationRequest::CumulativePerCapitaConvergenceAdjustedGini {
                first_allocation_year,
                convergence,
                adjusted,
                gini,
            } => cumulative_per_capita_convergence_adjusted_gini(
                inputs,
                *first_allocation_year,
                convergence,
                adjusted,
                gini,
            )?
            .into(),
        };
        Ok(result)
    }

    /// Build a request for `approach` from a loose parameter map.
    ///
    /// # Errors
    /// - [`AllocationError::InvalidParameter`] for unknown, missing or
    ///   mistyped keys.
    /// - Option validation errors for out-of-range values.
    pub fn from_parameters(approach: Approach, params: &Parameters) -> AllocResult<Self> {
        let params = snake_case_keys(params);
        let reader = ParamReader::new(approach, &params)?;
        let request = match approach {
            Approach::EqualPerCapitaBudget => AllocationRequest::EqualPerCapitaBudget {
                allocation_year: reader.year("allocation_year")?,
                preserve: reader.bool_or("preserve_allocation_year_shares", false)?,
            },
            Approach::PerCapitaAdjustedBudget => AllocationRequest::PerCapitaAdjustedBudget {
                allocation_year: reader.year("allocation_year")?,
                preserve: reader.bool_or("preserve_allocation_year_shares", false)?,
                adjusted: reader.adjusted()?,
            },
            Approach::PerCapitaAdjustedGiniBudget => AllocationRequest::PerCapitaAdjustedGiniBudget {
                allocation_year: reader.year("allocation_year")?,
                preserve: reader.bool_or("preserve_allocation_year_shares", false)?,
                adjusted: reader.adjusted()?,
                gini: reader.gini()?,
            },
            Approach::EqualPerCapita => AllocationRequest::EqualPerCapita {
                first_allocation_year: reader.year("first_allocation_year")?,
                preserve: reader.bool_or("preserve_first_allocation_year_shares", false)?,
                debt: reader.debt()?,
            },
            Approach::PerCapitaAdjusted => AllocationRequest::PerCapitaAdjusted {
                first_allocation_year: reader.year("first_allocation_year")?,
                preserve: reader.bool_or("preserve_first_allocation_year_shares", false)?,
                adjusted: reader.adjusted()?,
                debt: reader.debt()?,
            },
            Approach::PerCapitaAdjustedGini => AllocationRequest::PerCapitaAdjustedGini {
                first_allocation_year: reader.year("first_allocation_year")?,
                preserve: reader.bool_or("preserve_first_allocation_year_shares", false)?,
                adjusted: reader.adjusted()?,
                gini: reader.gini()?,
                debt: reader.debt()?,
            },
            Approach::PerCapitaConvergence => AllocationRequest::PerCapitaConvergence {
                first_allocation_year: reader.year("first_allocation_year")?,
                convergence_year: reader.year("convergence_year")?,
            },
            Approach::CumulativePerCapitaConvergence => {
                AllocationRequest::CumulativePerCapitaConvergence {
                    first_allocation_year: reader.year("first_allocation_year")?,
                    convergence: reader.convergence()?,
                }
            }
            Approach::CumulativePerCapitaConvergenceAdjusted => {
                AllocationRequest::CumulativePerCapitaConvergenceAdjusted {
                    first_allocation_year: reader.year("first_allocation_year")?,
                    convergence: reader.convergence()?,
                    adjusted: reader.adjusted()?,
                }
            }
            Approach::CumulativePerCapitaConvergenceAdjustedGini => {
                AllocationRequest::CumulativePerCapitaConvergenceAdjustedGini {
                    first_allocation_year: reader.year("first_allocation_year")?,
                    convergence: reader.convergence()?,
                    adjusted: reader.adjusted()?,
                    gini: reader.gini()?,
                }
            }
        };
        Ok(request)
    }
}

// ---- Parameter decoding ----

/// Config files spell keys in kebab case (`allocation-year`).
fn snake_case_keys(params: &Parameters) -> Parameters {
    params.iter().map(|(k, v)| (k.replace('-', "_"), v.clone())).collect()
}

struct ParamReader<'p> {
    approach: Approach,
    params: &'p Parameters,
}

impl<'p> ParamReader<'p> {
    fn new(approach: Approach, params: &'p Parameters) -> AllocResult<Self> {
        let reader = Self { approach, params };
        let schema = approach.parameter_schema();
        if let Some(unknown) = params.keys().find(|k| !schema.iter().any(|p| p.name == k.as_str())) {
            return Err(reader.invalid(unknown, "parameter is not accepted by this approach"));
        }
        if let Some(spec) = schema.iter().find(|p| p.required && reader.get(p.name).is_none()) {
            return Err(reader.invalid(spec.name, "required parameter is missing"));
        }
        Ok(reader)
    }

    fn invalid(&self, name: &str, reason: impl Into<String>) -> AllocationError {
        AllocationError::InvalidParameter {
            approach: self.approach.name().to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Non-null value of `name`.
    fn get(&self, name: &str) -> Option<&'p ParameterValue> {
        self.params.get(name).filter(|v| !v.is_null())
    }

    fn year(&self, name: &str) -> AllocResult<Year> {
        match self.get(name) {
            Some(value) => self.to_year(name, value),
            None => Err(self.invalid(name, "required parameter is missing")),
        }
    }

    fn to_year(&self, name: &str, value: &ParameterValue) -> AllocResult<Year> {
        value
            .as_i64()
            .and_then(|i| Year::try_from(i).ok())
            .ok_or_else(|| self.invalid(name, format!("expected a year, got '{value}'")))
    }

    fn year_or(&self, name: &str, default: Year) -> AllocResult<Year> {
        self.get(name).map_or(Ok(default), |v| self.to_year(name, v))
    }

    fn bool_or(&self, name: &str, default: bool) -> AllocResult<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => {
                v.as_bool().ok_or_else(|| self.invalid(name, format!("expected a bool, got '{v}'")))
            }
        }
    }

    fn f64_or(&self, name: &str, default: f64) -> AllocResult<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => {
                v.as_f64().ok_or_else(|| self.invalid(name, format!("expected a number, got '{v}'")))
            }
        }
    }

    fn u64_or(&self, name: &str, default: u64) -> AllocResult<u64> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v.as_i64().and_then(|i| u64::try_from(i).ok()).ok_or_else(|| {
                self.invalid(name, format!("expected a non-negative integer, got '{v}'"))
            }),
        }
    }

    fn form_or(&self, name: &str, default: FunctionalForm) -> AllocResult<FunctionalForm> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => {
                let text = v
                    .as_str()
                    .ok_or_else(|| self.invalid(name, format!("expected a string, got '{v}'")))?;
                text.parse().map_err(|_| {
                    self.invalid(name, format!("'{text}' is not one of 'asinh', 'linear', 'power'"))
                })
            }
        }
    }

    fn adjusted(&self) -> AllocResult<AdjustedOptions> {
        let d = AdjustedOptions::default();
        let weights = AdjustmentWeights::new(
            self.f64_or("responsibility_weight", d.weights.responsibility())?,
            self.f64_or("capability_weight", d.weights.capability())?,
        )?;
        let responsibility = ResponsibilityOptions::new(
            self.year_or(
                "historical_responsibility_year",
                d.responsibility.historical_responsibility_year,
            )?,
            self.bool_or("responsibility_per_capita", d.responsibility.per_capita)?,
            self.f64_or("responsibility_exponent", d.responsibility.exponent)?,
            self.form_or("responsibility_functional_form", d.responsibility.functional_form)?,
        )?;
        let capability = CapabilityOptions::new(
            self.bool_or("capability_per_capita", d.capability.per_capita)?,
            self.f64_or("capability_exponent", d.capability.exponent)?,
            self.form_or("capability_functional_form", d.capability.functional_form)?,
        )?;
        let max_deviation_sigma = match self.params.get("max_deviation_sigma") {
            None => d.max_deviation_sigma,
            Some(ParameterValue::Null) => None,
            Some(_) => Some(self.f64_or("max_deviation_sigma", 0.0)?),
        };
        AdjustedOptions::new(weights, responsibility, capability, max_deviation_sigma)
    }

    fn gini(&self) -> AllocResult<GiniOptions> {
        let d = GiniOptions::default();
        GiniOptions::new(
            self.f64_or("income_floor", d.income_floor)?,
            self.f64_or("max_gini_adjustment", d.max_gini_adjustment)?,
        )
    }

    fn convergence(&self) -> AllocResult<ConvergenceOptions> {
        let d = ConvergenceOptions::default();
        let solver = SolverOptions::new(
            self.f64_or("solver_tolerance", d.solver.tol)?,
            self.u64_or("solver_max_iter", d.solver.max_iter)?,
            d.solver.verbose,
        )?;
        ConvergenceOptions::new(
            self.bool_or("strict", d.strict)?,
            self.f64_or("max_convergence_speed", d.max_convergence_speed)?,
            solver,
        )
    }

    fn debt(&self) -> AllocResult<Option<HistoricalDebt>> {
        self.get("historical_debt_current_year")
            .map(|v| self.to_year("historical_debt_current_year", v))
            .transpose()
            .map(|year| year.map(|current_year| HistoricalDebt { current_year }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, ParameterValue)]) -> Parameters {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    // Purpose
    // -------
    // Verify that grid parameters decode into typed options with defaults.
    //
    // Given
    // -----
    // - Adjusted-budget parameters with weights, a float-typed year and a
    //   null deviation bound.
    //
    // Expect
    // ------
    // - The request carries the year, the weights, default exponents and no
    //   deviation bound.
    fn decodes_adjusted_budget_parameters() {
        let p = params(&[
            ("allocation-year", ParameterValue::Float(2020.0)),
            ("responsibility_weight", 0.3.into()),
            ("capability_weight", 0.7.into()),
            ("capability_functional_form", "Linear".into()),
            ("max_deviation_sigma", ParameterValue::Null),
        ]);

        let request = AllocationRequest::from_parameters(Approach::PerCapitaAdjustedBudget, &p)
            .expect("valid parameters");

        match request {
            AllocationRequest::PerCapitaAdjustedBudget { allocation_year, preserve, adjusted } => {
                assert_eq!(allocation_year, 2020);
                assert!(!preserve);
                assert_eq!(adjusted.weights.responsibility(), 0.3);
                assert_eq!(adjusted.capability.functional_form, FunctionalForm::Linear);
                assert_eq!(adjusted.responsibility.exponent, 1.0);
                assert_eq!(adjusted.max_deviation_sigma, None);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure unknown, missing and mistyped parameters are rejected with the
    // offending name.
    //
    // Given
    // -----
    // - An unknown key, a missing required year and a text exponent.
    //
    // Expect
    // ------
    // - `InvalidParameter` naming each key.
    fn rejects_bad_parameters() {
        let unknown = params(&[("allocation_year", ParameterValue::Int(2020)), ("speed", 0.5.into())]);
        let missing = params(&[]);
        let mistyped = params(&[
            ("first_allocation_year", ParameterValue::Int(2020)),
            ("capability_exponent", "high".into()),
        ]);

        let name_of = |err: AllocationError| match err {
            AllocationError::InvalidParameter { name, .. } => name,
            other => panic!("expected InvalidParameter, got {other:?}"),
        };
        assert_eq!(
            name_of(
                AllocationRequest::from_parameters(Approach::EqualPerCapitaBudget, &unknown)
                    .unwrap_err()
            ),
            "speed"
        );
        assert_eq!(
            name_of(
                AllocationRequest::from_parameters(Approach::EqualPerCapitaBudget, &missing)
                    .unwrap_err()
            ),
            "allocation_year"
        );
        assert_eq!(
            name_of(
                AllocationRequest::from_parameters(Approach::PerCapitaAdjusted, &mistyped)
                    .unwrap_err()
            ),
            "capability_exponent"
        );
    }
}
