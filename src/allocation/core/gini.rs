//! Gini / subsistence correction of GDP.
//!
//! Income within a unit is modelled as log-normal with the unit's Gini
//! coefficient `g`. With `σ = 2·erf⁻¹(g)` and mean income `m = GDP / pop`,
//! the underlying normal has `μ = ln m − σ²/2`. The population share below
//! the income floor `z` is `F = Φ((ln z − μ)/σ)` and the income share held by
//! that group is `Φ(Φ⁻¹(F) − σ)` (log-normal Lorenz curve). Effective GDP
//! removes that income share, but never by more than `max_gini_adjustment`.
use statrs::{
    distribution::{ContinuousCDF, Normal},
    function::erf::erf_inv,
};

use crate::allocation::{
    core::options::GiniOptions,
    errors::{AllocResult, AllocationError},
};

/// Validate a Gini coefficient for `unit_id`.
///
/// # Errors
/// [`AllocationError::InvalidGini`] unless `0 <= gini < 1`.
pub fn validate_gini(unit_id: &str, gini: f64) -> AllocResult<()> {
    if !(0.0..1.0).contains(&gini) {
        return Err(AllocationError::InvalidGini { unit_id: unit_id.to_string(), value: gini });
    }
    Ok(())
}

/// Applies the subsistence correction with fixed [`GiniOptions`].
#[derive(Debug, Clone)]
pub struct GiniAdjuster {
    opts: GiniOptions,
    normal: Normal,
}

impl GiniAdjuster {
    /// # Errors
    /// Option validation errors; [`AllocationError::NumericDegeneracy`] if the
    /// standard normal cannot be constructed.
    pub fn new(opts: GiniOptions) -> AllocResult<Self> {
        opts.validate()?;
        let normal = Normal::new(0.0, 1.0)
            .map_err(|_| AllocationError::NumericDegeneracy { context: "standard normal", value: 1.0 })?;
        Ok(Self { opts, normal })
    }

    pub fn options(&self) -> &GiniOptions {
        &self.opts
    }

    /// Effective GDP of a unit with the given Gini coefficient.
    ///
    /// Returns `gdp` unchanged when the floor or the cap is zero, or when GDP or
    /// population is not positive. With `gini == 0` everyone earns the mean:
    /// the result is `gdp` if the mean exceeds the floor, otherwise the capped
    /// value.
    ///
    /// Callers validate `gini` with [`validate_gini`] first.
    pub fn adjust(&self, gdp: f64, population: f64, gini: f64) -> f64 {
        let floor = self.opts.income_floor;
        let max_adj = self.opts.max_gini_adjustment;
        if floor == 0.0 || max_adj == 0.0 || gdp <= 0.0 || population <= 0.0 {
            return gdp;
        }
        let capped = gdp * (1.0 - max_adj);
        let mean = gdp / population;
        if gini == 0.0 {
            return if mean > floor { gdp } else { capped };
        }

        let sigma = 2.0 * erf_inv(gini);
        let mu = mean.ln() - 0.5 * sigma * sigma;
        let below = self.normal.cdf((floor.ln() - mu) / sigma);
        let income_share_below = if below <= 0.0 {
            0.0
        } else if below >= 1.0 {
            1.0
        } else {
            self.normal.cdf(self.normal.inverse_cdf(below) - sigma)
        };
        (gdp * (1.0 - income_share_below)).max(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - No-op cases (zero floor, zero cap, zero Gini above the floor).
    // - Monotonicity in the Gini coefficient and the cap.
    // - Gini validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that the correction is the identity in its documented no-op cases.
    //
    // Given
    // -----
    // - Floor 0, cap 0, and Gini 0 with a mean above the floor.
    //
    // Expect
    // ------
    // - GDP is returned bit-identically in all three cases.
    fn adjust_is_identity_in_no_op_cases() {
        let gdp = 1_000.0;
        let pop = 10.0;
        let no_floor = GiniAdjuster::new(GiniOptions::new(0.0, 0.8).unwrap()).unwrap();
        let no_cap = GiniAdjuster::new(GiniOptions::new(5.0, 0.0).unwrap()).unwrap();
        let equal = GiniAdjuster::new(GiniOptions::new(5.0, 0.8).unwrap()).unwrap();
        assert_eq!(no_floor.adjust(gdp, pop, 0.4), gdp);
        assert_eq!(no_cap.adjust(gdp, pop, 0.4), gdp);
        assert_eq!(equal.adjust(gdp, pop, 0.0), gdp);
    }

    #[test]
    // Purpose
    // -------
    // Ensure more inequality removes more income below the floor, bounded by
    // the cap.
    //
    // Given
    // -----
    // - Mean income 100, floor 50, Gini 0.2 and 0.6, cap 0.8.
    //
    // Expect
    // ------
    // - Both adjusted values lie in `[0.2·GDP, GDP)`.
    // - The Gini 0.6 value is strictly smaller.
    fn adjust_decreases_with_inequality() {
        let adj = GiniAdjuster::new(GiniOptions::new(50.0, 0.8).unwrap()).unwrap();
        let gdp = 10_000.0;
        let low = adj.adjust(gdp, 100.0, 0.2);
        let high = adj.adjust(gdp, 100.0, 0.6);
        assert!(low < gdp && low >= 0.2 * gdp);
        assert!(high < low && high >= 0.2 * gdp);
    }

    #[test]
    // Purpose
    // -------
    // Verify that a floor far above the mean hits the cap.
    //
    // Given
    // -----
    // - Mean income 1, floor 1e6, cap 0.3.
    //
    // Expect
    // ------
    // - Adjusted GDP equals `0.7·GDP`, with and without inequality.
    fn adjust_respects_cap() {
        let adj = GiniAdjuster::new(GiniOptions::new(1e6, 0.3).unwrap()).unwrap();
        assert_relative_eq!(adj.adjust(100.0, 100.0, 0.5), 70.0, epsilon = 1e-9);
        assert_relative_eq!(adj.adjust(100.0, 100.0, 0.0), 70.0);
    }

    #[test]
    // Purpose
    // -------
    // Ensure Gini coefficients outside [0, 1) are rejected.
    //
    // Given
    // -----
    // - Values -0.1, 1.0 and NaN.
    //
    // Expect
    // ------
    // - `AllocationError::InvalidGini` naming the unit.
    fn validate_gini_rejects_out_of_range() {
        for g in [-0.1, 1.0, f64::NAN] {
            match validate_gini("AAA", g).unwrap_err() {
                AllocationError::InvalidGini { unit_id, .. } => assert_eq!(unit_id, "AAA"),
                other => panic!("expected InvalidGini, got {other:?}"),
            }
        }
        assert!(validate_gini("AAA", 0.0).is_ok());
    }
}
