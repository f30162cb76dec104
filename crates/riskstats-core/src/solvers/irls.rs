// =============================================================================
// IRLS: Iteratively Reweighted Least Squares
// =============================================================================
//
// The fitting loop behind the loss-ratio model.
//
// THE BIG PICTURE
// ---------------
// We want the β that minimizes the family deviance. There is no closed form,
// so we iterate:
//
//     Start with μ⁰ from the family's initializer
//     Repeat:
//         1. Compute "working weights" W from the variance and the link
//         2. Compute the "working response" z (linearized problem)
//         3. Solve weighted least squares: (X'WX)β = X'Wz
//         4. Update η = Xβ and μ = g⁻¹(η)
//         5. Stop once deviance or β has settled
//
// THE WORKING RESPONSE
// --------------------
//     z = η + (y − μ) × g′(μ)
//
// For the log link g′(μ) = 1/μ, so z = ln μ + (y − μ)/μ.
//
// THE WORKING WEIGHTS
// -------------------
//     w = 1 / (V(μ) × g′(μ)²)
//
// For Gamma with a log link V(μ) = μ² and g′(μ)² = 1/μ², so every weight is 1:
// the relative error is what matters, whatever the size of μ.
//
// CONVERGENCE
// -----------
// We stop when the relative change in deviance OR the largest absolute
// coefficient step falls below the tolerance. Running out of iterations first
// is an error, not a silently returned half-fit.
//
// =============================================================================

use ndarray::{Array1, Array2, Axis, Zip};

use crate::convert::{cholesky_solve_and_invert, least_squares_pinv, to_dmatrix, to_dvector};
use crate::error::{Result, RiskStatsError};
use crate::families::Family;
use crate::links::Link;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration options for the IRLS algorithm.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IRLSConfig {
    /// Maximum number of iterations before giving up.
    /// Default: 100
    pub max_iterations: usize,

    /// Convergence tolerance, applied to the relative deviance change and to
    /// the largest coefficient step.
    /// Default: 1e-6
    pub tolerance: f64,

    /// Minimum value for weights to avoid numerical issues.
    /// Default: 1e-10
    pub min_weight: f64,
}

impl Default for IRLSConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            min_weight: 1e-10,
        }
    }
}

// =============================================================================
// Result Structure
// =============================================================================

/// Results from fitting a GLM using IRLS.
#[derive(Debug, Clone)]
pub struct IRLSResult {
    /// The fitted coefficients β, one per design column.
    pub coefficients: Array1<f64>,

    /// Fitted values μ = g⁻¹(Xβ).
    pub fitted_values: Array1<f64>,

    /// Linear predictor η = Xβ.
    pub linear_predictor: Array1<f64>,

    /// Final deviance.
    pub deviance: f64,

    /// Number of iterations until convergence.
    pub iterations: usize,

    /// The (X'WX)⁻¹ matrix (a pseudo-inverse when X is rank deficient).
    /// Var(β̂) = φ × (X'WX)⁻¹
    pub covariance_unscaled: Array2<f64>,

    /// Final IRLS weights.
    pub irls_weights: Array1<f64>,
}

// =============================================================================
// Main Fitting Function
// =============================================================================

/// Fit a GLM using Iteratively Reweighted Least Squares.
///
/// # Arguments
/// * `y` - Response variable (n × 1)
/// * `x` - Design matrix (n × p), including the intercept column if wanted
/// * `family` - Distribution family
/// * `link` - Link function
/// * `config` - Algorithm configuration options
///
/// # Errors
/// * `DimensionMismatch` / `EmptyInput` for malformed inputs
/// * `InvalidValue` if the family cannot produce a starting μ from `y`
/// * `LinearAlgebraError` if the weighted system is not finite
/// * `NonConvergence` if `max_iterations` pass without meeting the tolerance
pub fn fit_glm(
    y: &Array1<f64>,
    x: &Array2<f64>,
    family: &dyn Family,
    link: &dyn Link,
    config: &IRLSConfig,
) -> Result<IRLSResult> {
    // -------------------------------------------------------------------------
    // Step 0: Validate inputs
    // -------------------------------------------------------------------------
    let n = y.len();
    let p = x.ncols();

    if x.nrows() != n {
        return Err(RiskStatsError::DimensionMismatch(format!(
            "X has {} rows but y has {} elements",
            x.nrows(),
            n
        )));
    }

    if n == 0 {
        return Err(RiskStatsError::EmptyInput("y is empty".to_string()));
    }

    if p == 0 {
        return Err(RiskStatsError::EmptyInput("X has no columns".to_string()));
    }

    // -------------------------------------------------------------------------
    // Step 1: Initialize μ and η
    // -------------------------------------------------------------------------
    let mut mu = family.initialize_mu(y);
    if !family.is_valid_mu(&mu) {
        return Err(RiskStatsError::InvalidValue(format!(
            "{} family cannot start from this response (non-finite values?)",
            family.name()
        )));
    }
    let mut eta = link.link(&mu);
    let mut deviance = family.deviance(y, &mu, None);

    log::debug!(
        "IRLS start: family={}, link={}, n={}, p={}, initial deviance={:.6}",
        family.name(),
        link.name(),
        n,
        p,
        deviance
    );

    // -------------------------------------------------------------------------
    // Step 2: IRLS iteration loop
    // -------------------------------------------------------------------------
    let mut coefficients: Option<Array1<f64>> = None;
    let mut rel_change = f64::INFINITY;

    for iteration in 1..=config.max_iterations {
        // ---------------------------------------------------------------------
        // Step 2a: Working weights w = 1 / (V(μ) g′(μ)²)
        // ---------------------------------------------------------------------
        let variance = family.variance(&mu);
        let link_deriv = link.derivative(&mu);
        let weights: Array1<f64> = Zip::from(&variance)
            .and(&link_deriv)
            .map_collect(|&v, &d| (1.0 / (v * d * d)).max(config.min_weight).min(1e10));

        // ---------------------------------------------------------------------
        // Step 2b: Working response z = η + (y − μ) g′(μ)
        // ---------------------------------------------------------------------
        let z = working_response(y, &mu, &eta, &link_deriv);

        // ---------------------------------------------------------------------
        // Step 2c: Solve (X'WX)β = X'Wz
        // ---------------------------------------------------------------------
        let (new_coefficients, xtwx_inv) = solve_weighted_least_squares(x, &z, &weights)?;

        // ---------------------------------------------------------------------
        // Step 2d: Update η and μ
        // ---------------------------------------------------------------------
        eta = x.dot(&new_coefficients);
        mu = family.clamp_mu(&link.inverse(&eta));

        // ---------------------------------------------------------------------
        // Step 2e: Check convergence
        // ---------------------------------------------------------------------
        let deviance_old = deviance;
        deviance = family.deviance(y, &mu, None);
        rel_change = if deviance_old.abs() > 1e-10 {
            (deviance_old - deviance).abs() / deviance_old.abs()
        } else {
            (deviance_old - deviance).abs()
        };
        let max_step = coefficients.as_ref().map(|old| {
            Zip::from(old)
                .and(&new_coefficients)
                .fold(0.0f64, |acc, &a, &b| acc.max((a - b).abs()))
        });

        log::debug!(
            "IRLS iteration {}: deviance = {:.6}, rel_change = {:.2e}, max_step = {:?}",
            iteration,
            deviance,
            rel_change,
            max_step
        );

        if rel_change < config.tolerance || max_step.is_some_and(|step| step < config.tolerance) {
            return Ok(IRLSResult {
                coefficients: new_coefficients,
                fitted_values: mu,
                linear_predictor: eta,
                deviance,
                iterations: iteration,
                covariance_unscaled: xtwx_inv,
                irls_weights: weights,
            });
        }
        coefficients = Some(new_coefficients);
    }

    Err(RiskStatsError::NonConvergence {
        iterations: config.max_iterations,
        last_change: rel_change,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// z = η + (y − μ) × g′(μ)
fn working_response(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    eta: &Array1<f64>,
    link_deriv: &Array1<f64>,
) -> Array1<f64> {
    Zip::from(eta)
        .and(y)
        .and(mu)
        .and(link_deriv)
        .map_collect(|&e, &yi, &mui, &d| e + (yi - mui) * d)
}

/// Solve weighted least squares: minimize Σ w_i (z_i − x_i'β)²
///
/// Full-rank designs go through a Cholesky factorization of X'WX. When the
/// design loses rank (an intercept next to complete one-hot blocks), the
/// minimum-norm β comes from the pseudo-inverse of W^(1/2)X itself, which
/// fixes the otherwise arbitrary level of each category block.
///
/// Returns (coefficients, (X'WX)⁻¹), the inverse being a pseudo-inverse in
/// the rank-deficient case.
pub(crate) fn solve_weighted_least_squares(
    x: &Array2<f64>,
    z: &Array1<f64>,
    w: &Array1<f64>,
) -> Result<(Array1<f64>, Array2<f64>)> {
    // Form X_w = W^(1/2) X and z_w = W^(1/2) z
    let sqrt_w = w.mapv(f64::sqrt);
    let x_weighted = x * &sqrt_w.view().insert_axis(Axis(1));
    let z_weighted = z * &sqrt_w;

    // (X_w'X_w)β = X_w'z_w is (X'WX)β = X'Wz
    let xtx = x_weighted.t().dot(&x_weighted);
    let xtz = x_weighted.t().dot(&z_weighted);

    if let Some(solution) = cholesky_solve_and_invert(&to_dmatrix(&xtx), &to_dvector(&xtz)) {
        return Ok(solution);
    }

    log::trace!("X'WX is singular, falling back to the pseudo-inverse of the weighted design");
    least_squares_pinv(&to_dmatrix(&x_weighted), &to_dvector(&z_weighted)).ok_or_else(|| {
        RiskStatsError::LinearAlgebraError(
            "failed to solve weighted least squares: weighted design is zero or not finite"
                .to_string(),
        )
    })
}

// =============================================================================
// Tests
// =============================================================================
