//! Responsibility and capability weights.
//!
//! Both weights are validated to `[0, 1]` on construction. When their sum is
//! positive they are normalized to sum to one before use, so `(0.3, 0.3)`
//! and `(0.5, 0.5)` produce the same allocation. Weights `(0, 0)` switch the
//! adjusted allocators back to plain equal per capita.
use serde::{Deserialize, Serialize};

use crate::allocation::errors::{AllocResult, AllocationError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentWeights {
    responsibility: f64,
    capability: f64,
}

impl AdjustmentWeights {
    /// # Errors
    /// [`AllocationError::InvalidWeight`] for non-finite values or values
    /// outside `[0, 1]`.
    pub fn new(responsibility: f64, capability: f64) -> AllocResult<Self> {
        verify_weight("responsibility_weight", responsibility)?;
        verify_weight("capability_weight", capability)?;
        Ok(Self { responsibility, capability })
    }

    pub fn zero() -> Self {
        Self { responsibility: 0.0, capability: 0.0 }
    }

    pub fn responsibility(&self) -> f64 {
        self.responsibility
    }

    pub fn capability(&self) -> f64 {
        self.capability
    }

    pub fn is_zero(&self) -> bool {
        self.responsibility == 0.0 && self.capability == 0.0
    }

    /// `(responsibility, capability)` divided by their sum, or `(0, 0)`.
    pub fn normalized(&self) -> (f64, f64) {
        let total = self.responsibility + self.capability;
        if total > 0.0 {
            (self.responsibility / total, self.capability / total)
        } else {
            (0.0, 0.0)
        }
    }

    /// Re-run the constructor checks, e.g. after deserialization.
    pub fn validate(&self) -> AllocResult<()> {
        verify_weight("responsibility_weight", self.responsibility)?;
        verify_weight("capability_weight", self.capability)
    }
}

impl Default for AdjustmentWeights {
    fn default() -> Self {
        Self::zero()
    }
}

fn verify_weight(name: &'static str, value: f64) -> AllocResult<()> {
    if !value.is_finite() {
        return Err(AllocationError::InvalidWeight { name, value, reason: "Weight must be finite." });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(AllocationError::InvalidWeight {
            name,
            value,
            reason: "Weight must lie in [0, 1].",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // Verify that weights are normalized by their sum.
    //
    // Given
    // -----
    // - Weights (0.3, 0.3) and (0.5, 0.5).
    //
    // Expect
    // ------
    // - Both normalize to (0.5, 0.5).
    fn weights_normalize_by_sum() {
        let a = AdjustmentWeights::new(0.3, 0.3).expect("valid");
        let b = AdjustmentWeights::new(0.5, 0.5).expect("valid");
        let (ra, ca) = a.normalized();
        let (rb, cb) = b.normalized();
        assert_relative_eq!(ra, rb);
        assert_relative_eq!(ca, cb);
        assert_relative_eq!(ra, 0.5);
        assert_eq!(AdjustmentWeights::zero().normalized(), (0.0, 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Ensure out-of-range weights are rejected.
    //
    // Given
    // -----
    // - Weights -0.1, 1.5 and NaN.
    //
    // Expect
    // ------
    // - `AllocationError::InvalidWeight` naming the parameter.
    fn weights_reject_out_of_range_values() {
        for (r, c) in [(-0.1, 0.0), (0.0, 1.5), (f64::NAN, 0.0)] {
            match AdjustmentWeights::new(r, c).unwrap_err() {
                AllocationError::InvalidWeight { .. } => {}
                other => panic!("expected InvalidWeight, got {other:?}"),
            }
        }
    }
}
