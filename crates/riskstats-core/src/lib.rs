// =============================================================================
// RiskStats Core Library
// =============================================================================
//
// Statistical engine for insurance segment analysis: which segments carry
// more risk, whether the differences are statistically real, and a Gamma GLM
// of loss ratio to price them.
//
// STRUCTURE:
// ----------
//   - dataset:       Policy records and the derived view (Claimed, Margin, LossRatio)
//   - aggregate:     Segment loss ratios, monthly deltas, trend and profile summaries
//   - inference:     Chi-squared and F tests, p-values, test decisions
//   - hypothesis:    The four segment tests (province, postal code, margin, gender)
//   - design_matrix: One-hot encoding with mode/median imputation
//   - families:      Distribution families (Gamma)
//   - links:         Link functions (Log)
//   - solvers:       IRLS fitting
//   - diagnostics:   Residuals, dispersion, null deviance
//   - model:         Filter → encode → split → fit pipeline
//   - evaluation:    Prediction, RMSE, risk-driver ranking
//   - error:         Error types used throughout the library
//
// The crate never prints. Progress and decisions go through the `log`
// facade; installing a logger is the caller's business.
//
// FOR MAINTAINERS:
// ----------------
// When adding new functionality:
//   1. Add it to the appropriate module (or create a new one)
//   2. Write tests in that module (see existing tests for examples)
//   3. Re-export public items here so users can access them easily
//
// =============================================================================

pub mod aggregate;
pub mod constants;
mod convert;
pub mod dataset;
pub mod design_matrix;
pub mod diagnostics;
pub mod error;
pub mod evaluation;
pub mod families;
pub mod hypothesis;
pub mod inference;
pub mod links;
pub mod model;
pub mod solvers;

// Re-export commonly used items at the top level for convenience
pub use aggregate::{monthly_zip_aggregate, segmented_loss_ratio, temporal_trend, SegmentAggregate};
pub use dataset::{Column, Dataset, DerivedView, Record, YearMonth};
pub use design_matrix::{FeatureColumn, FeatureEncoder, ModelSpec};
pub use error::{Result, RiskStatsError};
pub use evaluation::{predict, rank_risk_drivers, rmse, RiskDriver};
pub use families::{Family, GammaFamily};
pub use hypothesis::{HypothesisConfig, HypothesisReport, HypothesisRunner};
pub use inference::{
    chi_squared_independence, one_way_anova_f, ContingencyTable, Decision, TestResult,
};
pub use links::{Link, LogLink};
pub use model::{fit_gamma_glm, FittedModel, GlmConfig, LossRatioModel, ModelEvaluation};
pub use solvers::{fit_glm, IRLSConfig, IRLSResult};
