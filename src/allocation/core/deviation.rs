//! Deviation constraint on adjusted shares.
//!
//! Each unit's per-capita share is kept within `baseline ± k·σ`, where the
//! baseline is the equal-per-capita share `1 / Σ population` and `σ` is the
//! population-weighted standard deviation of per-capita shares. Clipped
//! excess or deficit is redistributed proportionally among the units that are
//! still unconstrained; redistribution repeats until no further unit crosses
//! a bound, so the group sum stays exactly one.
use ndarray::Array1;
use tracing::debug;

use crate::{
    allocation::errors::{AllocResult, AllocationError},
    optimization::numerical_stability::DEGENERACY_EPS,
};

/// Clip `shares` to the deviation band and redistribute.
///
/// `population` is the population basis the shares were derived from (the
/// same vector the equal-per-capita baseline uses).
///
/// Returns a copy of `shares` when the dispersion is negligible or fewer than
/// two units remain.
///
/// # Errors
/// [`AllocationError::InvalidDeviationSigma`] for negative or non-finite `k`.
pub fn apply_deviation_constraint(
    shares: &Array1<f64>, population: &Array1<f64>, max_deviation_sigma: f64,
) -> AllocResult<Array1<f64>> {
    if !max_deviation_sigma.is_finite() || max_deviation_sigma < 0.0 {
        return Err(AllocationError::InvalidDeviationSigma { value: max_deviation_sigma });
    }
    let n = shares.len();
    let total_pop = population.sum();
    if n < 2 || !total_pop.is_finite() || total_pop <= DEGENERACY_EPS {
        return Ok(shares.clone());
    }

    let baseline = 1.0 / total_pop;
    let variance = shares
        .iter()
        .zip(population.iter())
        .filter(|(_, p)| **p > 0.0)
        .map(|(s, p)| p * (s / p - baseline).powi(2))
        .sum::<f64>()
        / total_pop;
    let sigma = variance.sqrt();
    if sigma <= DEGENERACY_EPS * baseline {
        return Ok(shares.clone());
    }

    let upper = population.mapv(|p| (baseline + max_deviation_sigma * sigma) * p);
    let lower = population.mapv(|p| (baseline - max_deviation_sigma * sigma).max(0.0) * p);

    let mut out = shares.clone();
    let mut fixed = vec![false; n];
    for _ in 0..=n {
        let mut clipped = false;
        for i in 0..n {
            if fixed[i] {
                continue;
            }
            if out[i] > upper[i] {
                out[i] = upper[i];
                fixed[i] = true;
                clipped = true;
            } else if out[i] < lower[i] {
                out[i] = lower[i];
                fixed[i] = true;
                clipped = true;
            }
        }
        if !clipped {
            break;
        }
        let fixed_sum: f64 = (0..n).filter(|&i| fixed[i]).map(|i| out[i]).sum();
        let free_sum: f64 = (0..n).filter(|&i| !fixed[i]).map(|i| out[i]).sum();
        if free_sum <= DEGENERACY_EPS {
            break;
        }
        let scale = (1.0 - fixed_sum) / free_sum;
        for i in (0..n).filter(|&i| !fixed[i]) {
            out[i] *= scale;
        }
    }

    let n_fixed = fixed.iter().filter(|f| **f).count();
    debug!(n_fixed, sigma, max_deviation_sigma, "deviation constraint applied");

    let total = out.sum();
    if total.is_finite() && total > DEGENERACY_EPS {
        out /= total;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Verify clipping of an outlier and proportional redistribution.
    //
    // Given
    // -----
    // - Shares [0.7, 0.1, 0.1, 0.1], equal populations, k = 1.
    //
    // Expect
    // ------
    // - The outlier is clipped to `0.25 + σ` (σ = sqrt(0.0675)).
    // - The other three shares stay equal and everything sums to 1.
    fn clips_outlier_and_redistributes() {
        // Arrange
        let shares = array![0.7, 0.1, 0.1, 0.1];
        let pop = array![1.0, 1.0, 1.0, 1.0];

        // Act
        let out = apply_deviation_constraint(&shares, &pop, 1.0).unwrap();

        // Assert
        let sigma = 0.0675f64.sqrt();
        assert_relative_eq!(out[0], 0.25 + sigma, epsilon = 1e-12);
        assert_relative_eq!(out[1], out[2], epsilon = 1e-15);
        assert_relative_eq!(out[2], out[3], epsilon = 1e-15);
        assert_relative_eq!(out.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Ensure equal-per-capita shares pass through untouched.
    //
    // Given
    // -----
    // - Shares proportional to population.
    //
    // Expect
    // ------
    // - Output is bit-identical to the input.
    fn equal_per_capita_is_unchanged() {
        let pop = array![100.0, 300.0];
        let shares = array![0.25, 0.75];
        let out = apply_deviation_constraint(&shares, &pop, 2.0).unwrap();
        assert_eq!(out, shares);
    }

    #[test]
    // Purpose
    // -------
    // Verify that k = 0 forces equal per capita and negative k is rejected.
    //
    // Given
    // -----
    // - Skewed shares with populations [1, 3].
    //
    // Expect
    // ------
    // - k = 0 yields [0.25, 0.75]; k = -1 yields `InvalidDeviationSigma`.
    fn zero_sigma_forces_equal_per_capita() {
        let pop = array![1.0, 3.0];
        let shares = array![0.6, 0.4];
        let out = apply_deviation_constraint(&shares, &pop, 0.0).unwrap();
        assert_relative_eq!(out[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.75, epsilon = 1e-12);
        assert!(matches!(
            apply_deviation_constraint(&shares, &pop, -1.0),
            Err(AllocationError::InvalidDeviationSigma { .. })
        ));
    }
}
