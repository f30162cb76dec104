// =============================================================================
// Link Functions
// =============================================================================
//
// The link g connects the mean to the linear predictor: η = g(μ) = Xβ.
// IRLS needs g, its inverse, and its derivative g′(μ) for the working
// response z = η + (y − μ) g′(μ).
//
// =============================================================================

use ndarray::Array1;

/// A GLM link function.
pub trait Link: Send + Sync {
    fn name(&self) -> &str;

    /// η = g(μ)
    fn link(&self, mu: &Array1<f64>) -> Array1<f64>;

    /// μ = g⁻¹(η)
    fn inverse(&self, eta: &Array1<f64>) -> Array1<f64>;

    /// g′(μ)
    fn derivative(&self, mu: &Array1<f64>) -> Array1<f64>;
}

/// Linear predictors above this are capped before exponentiating.
const MAX_ETA: f64 = 700.0;

/// Log link: η = ln(μ). Coefficients act multiplicatively on the mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLink;

impl Link for LogLink {
    fn name(&self) -> &str {
        "log"
    }

    fn link(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(f64::ln)
    }

    fn inverse(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.mapv(|e| e.min(MAX_ETA).exp())
    }

    fn derivative(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| 1.0 / m)
    }
}
