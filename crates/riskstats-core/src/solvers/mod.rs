// =============================================================================
// GLM Solvers
// =============================================================================
//
// We want coefficients β that best explain
//
//     g(E[Y]) = Xβ
//
// where g is the link function. The link makes the problem non-linear and the
// variance depends on μ, so there is no closed form. IRLS solves it by
// repeatedly linearizing around the current estimate and solving a weighted
// least squares problem.
//
// =============================================================================

mod irls;

pub use irls::{fit_glm, IRLSConfig, IRLSResult};

