//! Dispersion (scale) estimation.
//!
//! The Gamma family has an unknown scale φ with Var(Y) = φ μ². It is
//! estimated from the Pearson statistic, as statsmodels does by default.

use ndarray::Array1;

use super::residuals::resid_pearson;
use crate::families::Family;

/// Pearson χ² = Σ (y − μ)² / V(μ).
pub fn pearson_chi2(y: &Array1<f64>, mu: &Array1<f64>, family: &dyn Family) -> f64 {
    resid_pearson(y, mu, family).mapv(|r| r * r).sum()
}

/// φ̂ = Pearson χ² / (n − p).
///
/// Returns NaN when there are no residual degrees of freedom.
pub fn estimate_dispersion_pearson(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    family: &dyn Family,
    n_params: usize,
) -> f64 {
    let df_resid = y.len() as f64 - n_params as f64;
    if df_resid <= 0.0 {
        return f64::NAN;
    }
    pearson_chi2(y, mu, family) / df_resid
}
