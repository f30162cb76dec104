// =============================================================================
// Model Diagnostics
// =============================================================================
//
// Goodness-of-fit quantities reported next to the fitted loss-ratio model:
//
// - RESIDUALS: response and Pearson residuals
// - DISPERSION: the Gamma scale parameter φ, which scales standard errors
// - MODEL FIT: null deviance, the baseline the fitted deviance is judged against
//
// Method names and calculations follow statsmodels conventions, so numbers
// can be checked against a GLM summary produced there.
//
// =============================================================================

mod dispersion;
mod model_fit;
mod residuals;

pub use residuals::{resid_pearson, resid_response};

pub use dispersion::{estimate_dispersion_pearson, pearson_chi2};

pub use model_fit::{deviance_explained, null_deviance};
