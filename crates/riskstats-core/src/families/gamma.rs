// =============================================================================
// Gamma Family
// =============================================================================
//
// For strictly positive, right-skewed amounts such as loss ratios.
//
//     V(μ)     = μ²                      (constant coefficient of variation)
//     d(y, μ)  = 2 × [(y − μ)/μ − ln(y/μ)]
//
// FOR ACTUARIES:
// --------------
// Because the standard deviation grows in proportion to the mean, a policy
// with twice the expected loss ratio is allowed twice the spread. Paired with
// a log link, coefficients are multiplicative relativities.
//
// Loss ratios of exactly 0 (no claims) are outside the Gamma support. They are
// still admissible responses: the deviance floors y at `MU_MIN_POSITIVE`.
//
// =============================================================================

use ndarray::{Array1, Zip};

use super::Family;
use crate::constants::MU_MIN_POSITIVE;

/// Gamma distribution family.
#[derive(Debug, Clone, Copy, Default)]
pub struct GammaFamily;

impl Family for GammaFamily {
    fn name(&self) -> &str {
        "Gamma"
    }

    fn variance(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| m * m)
    }

    fn unit_deviance(&self, y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64> {
        Zip::from(y).and(mu).map_collect(|&yi, &mui| {
            let yi = yi.max(MU_MIN_POSITIVE);
            let mui = mui.max(MU_MIN_POSITIVE);
            2.0 * ((yi - mui) / mui - (yi / mui).ln())
        })
    }

    fn initialize_mu(&self, y: &Array1<f64>) -> Array1<f64> {
        // Halfway between each observation and the mean keeps zeros off the boundary
        let y_mean = y.mean().unwrap_or(1.0);
        y.mapv(|yi| ((yi + y_mean) / 2.0).max(MU_MIN_POSITIVE))
    }

    fn is_valid_mu(&self, mu: &Array1<f64>) -> bool {
        mu.iter().all(|&m| m.is_finite() && m > 0.0)
    }

    fn clamp_mu(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| if m.is_nan() { MU_MIN_POSITIVE } else { m.max(MU_MIN_POSITIVE) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_variance_is_mu_squared() {
        let v = GammaFamily.variance(&array![0.5, 2.0, 3.0]);
        assert_abs_diff_eq!(v, array![0.25, 4.0, 9.0], epsilon = 1e-12);
    }

    #[test]
    fn test_deviance_zero_at_perfect_fit() {
        let y = array![0.3, 1.0, 4.0];
        assert_abs_diff_eq!(GammaFamily.deviance(&y, &y, None), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_deviance_known_value() {
        // y = 2, μ = 1: 2 × (1 − ln 2)
        let d = GammaFamily.unit_deviance(&array![2.0], &array![1.0]);
        assert_abs_diff_eq!(d[0], 2.0 * (1.0 - 2.0f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_response_is_finite() {
        let d = GammaFamily.unit_deviance(&array![0.0], &array![0.5]);
        assert!(d[0].is_finite() && d[0] > 0.0);
    }

    #[test]
    fn test_weighted_deviance() {
        let y = array![2.0, 2.0];
        let mu = array![1.0, 1.0];
        let unweighted = GammaFamily.deviance(&y, &mu, None);
        let weighted = GammaFamily.deviance(&y, &mu, Some(&array![2.0, 0.0]));
        assert_abs_diff_eq!(weighted, unweighted, epsilon = 1e-12);
    }

    #[test]
    fn test_initial_mu_is_valid_with_zero_responses() {
        let mu = GammaFamily.initialize_mu(&array![0.0, 0.0, 3.0]);
        assert!(GammaFamily.is_valid_mu(&mu));
        assert!(!GammaFamily.is_valid_mu(&array![1.0, 0.0]));
        assert!(GammaFamily.is_valid_mu(&GammaFamily.clamp_mu(&array![-1.0, f64::NAN])));
    }
}
