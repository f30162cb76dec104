// =============================================================================
// Distribution Families
// =============================================================================
//
// A family describes how the variance of the response depends on its mean,
// and how far a fitted mean is from an observation (the unit deviance).
//
// IRLS only ever talks to the `Family` trait, so the solver does not need to
// know which distribution it is fitting.
//
// =============================================================================

mod gamma;

pub use gamma::GammaFamily;

use ndarray::Array1;

/// Variance function, deviance and valid mean range of a GLM family.
pub trait Family: Send + Sync {
    /// Human-readable name, used in logs and summaries.
    fn name(&self) -> &str;

    /// Variance function V(μ): Var(Y) = φ × V(μ).
    fn variance(&self, mu: &Array1<f64>) -> Array1<f64>;

    /// Unit deviance d(y, μ) for each observation.
    fn unit_deviance(&self, y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64>;

    /// Total deviance: Σ w_i × d(y_i, μ_i).
    fn deviance(&self, y: &Array1<f64>, mu: &Array1<f64>, weights: Option<&Array1<f64>>) -> f64 {
        let unit = self.unit_deviance(y, mu);
        match weights {
            Some(w) => unit.iter().zip(w.iter()).map(|(&d, &wi)| d * wi).sum(),
            None => unit.sum(),
        }
    }

    /// Starting values for μ.
    fn initialize_mu(&self, y: &Array1<f64>) -> Array1<f64>;

    /// Is every μ inside the family's domain?
    fn is_valid_mu(&self, mu: &Array1<f64>) -> bool;

    /// Pull μ back inside the family's domain.
    fn clamp_mu(&self, mu: &Array1<f64>) -> Array1<f64>;
}
