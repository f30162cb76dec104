//! Deviance-based fit measures.

use ndarray::Array1;

use crate::families::Family;

/// Deviance of the intercept-only model, whose fitted mean is ȳ.
pub fn null_deviance(y: &Array1<f64>, family: &dyn Family) -> f64 {
    let y_mean = y.mean().unwrap_or(0.0);
    let mu = family.clamp_mu(&Array1::from_elem(y.len(), y_mean));
    family.deviance(y, &mu, None)
}

/// Share of the null deviance explained by the model: 1 − D / D₀.
pub fn deviance_explained(deviance: f64, null_deviance: f64) -> f64 {
    if null_deviance > 0.0 {
        1.0 - deviance / null_deviance
    } else {
        f64::NAN
    }
}
