//! Residuals of a fitted GLM.

use ndarray::{Array1, Zip};

use crate::families::Family;

/// Raw residuals y − μ.
pub fn resid_response(y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64> {
    y - mu
}

/// Pearson residuals (y − μ) / sqrt(V(μ)).
///
/// For the Gamma family this is the relative error (y − μ) / μ.
pub fn resid_pearson(y: &Array1<f64>, mu: &Array1<f64>, family: &dyn Family) -> Array1<f64> {
    let variance = family.variance(mu);
    Zip::from(y)
        .and(mu)
        .and(&variance)
        .map_collect(|&yi, &mui, &v| (yi - mui) / v.sqrt())
}
