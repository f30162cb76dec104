// =============================================================================
// Loss-Ratio GLM
// =============================================================================
//
// Fits a Gamma GLM with a log link to the per-policy loss ratio:
//
//     log E[LossRatio] = β₀ + Σ β_j x_j
//
// PIPELINE
// --------
//   1. Drop rows with LossRatio ≥ 50 or TotalPremium ≤ 0 (not representative)
//   2. Fit the feature encoder on the remaining rows
//   3. Seeded shuffle, hold out ⌈25%⌉ of rows
//   4. Drop training columns with zero variance, append an intercept last
//   5. IRLS on the training rows
//   6. Score the held-out rows
//
// FOR ACTUARIES:
// --------------
// With a log link, exp(β) is a multiplicative relativity. A Province_X
// coefficient of 0.2 means policies in X are expected to run a loss ratio
// exp(0.2) ≈ 1.22 times the base, all else equal.
//
// =============================================================================

mod split;

pub use split::{train_test_split, TrainTestSplit};

use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_TOP_DRIVERS, MAX_MODEL_LOSS_RATIO, SPLIT_SEED, TEST_FRACTION, ZERO_VARIANCE_TOLERANCE,
};
use crate::dataset::{Column, Dataset, Record};
use crate::design_matrix::{FeatureColumn, FeatureEncoder, ModelSpec};
use crate::diagnostics::{deviance_explained, estimate_dispersion_pearson, null_deviance};
use crate::error::{Result, RiskStatsError};
use crate::evaluation::{predict, rank_risk_drivers, rmse, RiskDriver};
use crate::families::{Family, GammaFamily};
use crate::inference::{confidence_interval_z, pvalue_z, significance_stars};
use crate::links::LogLink;
use crate::solvers::{fit_glm, IRLSConfig};

// =============================================================================
// Configuration
// =============================================================================

/// Settings for the full fit: solver, split and row filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlmConfig {
    #[serde(flatten)]
    pub irls: IRLSConfig,

    /// Seed of the train/test shuffle.
    pub seed: u64,

    /// Share of rows held out, rounded up.
    pub test_fraction: f64,

    /// Rows with a loss ratio at or above this are excluded.
    pub max_loss_ratio: f64,
}

impl Default for GlmConfig {
    fn default() -> Self {
        Self {
            irls: IRLSConfig::default(),
            seed: SPLIT_SEED,
            test_fraction: TEST_FRACTION,
            max_loss_ratio: MAX_MODEL_LOSS_RATIO,
        }
    }
}

// =============================================================================
// Fitted model
// =============================================================================

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientSummary {
    pub column: FeatureColumn,
    pub estimate: f64,
    pub std_error: f64,
    pub z_value: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub stars: &'static str,
}

/// Coefficients and fit statistics of a Gamma/log GLM.
///
/// `columns[i]` tags `coefficients[i]`; the intercept is always last.
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub columns: Vec<FeatureColumn>,
    pub coefficients: Array1<f64>,
    /// (X'WX)⁻¹; multiply by `dispersion` for Var(β̂).
    pub covariance_unscaled: Array2<f64>,
    /// Pearson estimate of the Gamma scale φ.
    pub dispersion: f64,
    pub deviance: f64,
    pub null_deviance: f64,
    pub iterations: usize,
    pub n_obs: usize,
    /// Numerical rank of the design, used for residual degrees of freedom.
    pub rank: usize,
    /// Encoded columns that survived the zero-variance filter, in order.
    source_indices: Vec<usize>,
    n_source_columns: usize,
}

/// Fit a Gamma/log GLM on an encoded design (without intercept).
///
/// Columns whose variance is zero on these rows are dropped first; an
/// intercept column is then appended last.
///
/// # Errors
/// `DimensionMismatch` if `columns` does not tag every column of `x`, plus
/// anything `fit_glm` raises.
pub fn fit_gamma_glm(
    x: &Array2<f64>,
    columns: &[FeatureColumn],
    y: &Array1<f64>,
    config: &IRLSConfig,
) -> Result<FittedModel> {
    if columns.len() != x.ncols() {
        return Err(RiskStatsError::DimensionMismatch(format!(
            "{} column tags for {} design columns",
            columns.len(),
            x.ncols()
        )));
    }
    if x.nrows() == 0 {
        return Err(RiskStatsError::EmptyInput("no training rows".to_string()));
    }

    // -------------------------------------------------------------------------
    // Step 1: Drop zero-variance columns
    // -------------------------------------------------------------------------
    let variances = x.var_axis(Axis(0), 0.0);
    let mut source_indices = Vec::with_capacity(columns.len());
    for (j, &variance) in variances.iter().enumerate() {
        if variance > ZERO_VARIANCE_TOLERANCE {
            source_indices.push(j);
        } else {
            log::warn!("dropping zero-variance column {}", columns[j]);
        }
    }

    // -------------------------------------------------------------------------
    // Step 2: Append intercept and fit
    // -------------------------------------------------------------------------
    let design = with_intercept(&x.select(Axis(1), &source_indices))?;
    let family = GammaFamily;
    let irls = fit_glm(y, &design, &family, &LogLink, config)?;

    // -------------------------------------------------------------------------
    // Step 3: Fit statistics
    // -------------------------------------------------------------------------
    let rank = effective_rank(&design, &irls.irls_weights, &irls.covariance_unscaled);
    let dispersion = estimate_dispersion_pearson(y, &irls.fitted_values, &family, rank);
    let null_dev = null_deviance(y, &family);

    let mut tagged: Vec<FeatureColumn> =
        source_indices.iter().map(|&j| columns[j].clone()).collect();
    tagged.push(FeatureColumn::Intercept);

    log::info!(
        "{} GLM fitted in {} iterations: n={}, columns={}, rank={}, deviance={:.4}, null deviance={:.4}",
        family.name(),
        irls.iterations,
        y.len(),
        tagged.len(),
        rank,
        irls.deviance,
        null_dev
    );

    Ok(FittedModel {
        columns: tagged,
        coefficients: irls.coefficients,
        covariance_unscaled: irls.covariance_unscaled,
        dispersion,
        deviance: irls.deviance,
        null_deviance: null_dev,
        iterations: irls.iterations,
        n_obs: y.len(),
        rank,
        source_indices,
        n_source_columns: columns.len(),
    })
}

impl FittedModel {
    /// Reduce an encoder-produced matrix to the fitted columns, intercept last.
    pub fn model_matrix(&self, encoded: &Array2<f64>) -> Result<Array2<f64>> {
        if encoded.ncols() != self.n_source_columns {
            return Err(RiskStatsError::DimensionMismatch(format!(
                "encoded matrix has {} columns, model was fitted on {}",
                encoded.ncols(),
                self.n_source_columns
            )));
        }
        with_intercept(&encoded.select(Axis(1), &self.source_indices))
    }

    /// Coefficient of a tagged column, `None` if it was not fitted.
    pub fn coefficient(&self, column: &FeatureColumn) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.coefficients[i])
    }

    /// Columns dropped as zero-variance are not listed.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(FeatureColumn::name).collect()
    }

    pub fn deviance_explained(&self) -> f64 {
        deviance_explained(self.deviance, self.null_deviance)
    }

    /// Standard errors sqrt(φ × diag((X'WX)⁻¹)).
    pub fn std_errors(&self) -> Array1<f64> {
        self.covariance_unscaled
            .diag()
            .mapv(|v| (self.dispersion * v).max(0.0).sqrt())
    }

    /// Wald z-tests and 95% intervals for every coefficient.
    pub fn coefficient_table(&self) -> Vec<CoefficientSummary> {
        let std_errors = self.std_errors();
        self.columns
            .iter()
            .zip(self.coefficients.iter())
            .zip(std_errors.iter())
            .map(|((column, &estimate), &std_error)| {
                let z_value = estimate / std_error;
                let p_value = pvalue_z(z_value);
                let (ci_lower, ci_upper) = confidence_interval_z(estimate, std_error, 0.95);
                CoefficientSummary {
                    column: column.clone(),
                    estimate,
                    std_error,
                    z_value,
                    p_value,
                    ci_lower,
                    ci_upper,
                    stars: significance_stars(p_value),
                }
            })
            .collect()
    }

    /// statsmodels-style text table.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Gamma GLM (log link)  n = {}  iterations = {}\n\
             deviance = {:.4}  null deviance = {:.4}  dispersion = {:.4}\n\n",
            self.n_obs, self.iterations, self.deviance, self.null_deviance, self.dispersion
        );
        out.push_str(&format!(
            "{:<32} {:>10} {:>10} {:>8} {:>8}\n",
            "", "coef", "std err", "z", "P>|z|"
        ));
        for row in self.coefficient_table() {
            out.push_str(&format!(
                "{:<32} {:>10.4} {:>10.4} {:>8.3} {:>8.4} {}\n",
                row.column.name(),
                row.estimate,
                row.std_error,
                row.z_value,
                row.p_value,
                row.stars
            ));
        }
        out
    }
}

fn with_intercept(x: &Array2<f64>) -> Result<Array2<f64>> {
    let ones = Array2::ones((x.nrows(), 1));
    concatenate(Axis(1), &[x.view(), ones.view()])
        .map_err(|e| RiskStatsError::DimensionMismatch(e.to_string()))
}

/// rank(X) as trace((X'WX)⁺ X'WX).
fn effective_rank(x: &Array2<f64>, weights: &Array1<f64>, xtwx_inv: &Array2<f64>) -> usize {
    let x_weighted = x * &weights.mapv(f64::sqrt).insert_axis(Axis(1));
    let xtwx = x_weighted.t().dot(&x_weighted);
    let trace = xtwx_inv.dot(&xtwx).diag().sum();
    if trace.is_finite() {
        trace.round().max(0.0) as usize
    } else {
        x.ncols()
    }
}

// =============================================================================
// End-to-end model
// =============================================================================

/// Encoder, fitted GLM and held-out scores from one modelling run.
#[derive(Debug, Clone)]
pub struct LossRatioModel {
    pub encoder: FeatureEncoder,
    pub fitted: FittedModel,
    /// Rows removed by the loss-ratio / premium filter.
    pub n_excluded: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub test_actual: Array1<f64>,
    pub test_predicted: Array1<f64>,
}

/// Headline numbers of a modelling run.
#[derive(Debug, Clone, Serialize)]
pub struct ModelEvaluation {
    pub n_train: usize,
    pub n_test: usize,
    pub n_excluded: usize,
    /// `None` when nothing was held out.
    pub test_rmse: Option<f64>,
    pub iterations: usize,
    pub deviance: f64,
    pub null_deviance: f64,
    pub dispersion: f64,
    pub top_drivers: Vec<RiskDriver>,
}

impl LossRatioModel {
    /// Filter, encode, split, fit and score.
    pub fn fit(dataset: &Dataset, spec: &ModelSpec, config: &GlmConfig) -> Result<Self> {
        // ---------------------------------------------------------------------
        // Step 1: Exclude non-representative rows
        // ---------------------------------------------------------------------
        let view = dataset.derive();
        let kept = view.filter(|row| {
            row.loss_ratio < config.max_loss_ratio && row.record.total_premium > 0.0
        });
        let n_excluded = view.len() - kept.len();
        if n_excluded > 0 {
            log::warn!(
                "excluded {} of {} rows with loss ratio >= {} or premium <= 0",
                n_excluded,
                view.len(),
                config.max_loss_ratio
            );
        }
        if kept.is_empty() {
            return Err(RiskStatsError::EmptyInput("no rows left to model".to_string()));
        }

        let records: Vec<&Record> = kept.records().collect();
        let y_all: Array1<f64> = kept.rows().iter().map(|row| row.loss_ratio).collect();

        // ---------------------------------------------------------------------
        // Step 2: Encode
        // ---------------------------------------------------------------------
        let encoder = FeatureEncoder::fit(&records, spec)?;
        let x_all = encoder.transform(&records);

        // ---------------------------------------------------------------------
        // Step 3: Split
        // ---------------------------------------------------------------------
        let split = train_test_split(records.len(), config.test_fraction, config.seed);
        if split.train.is_empty() {
            return Err(RiskStatsError::EmptyInput("training partition is empty".to_string()));
        }
        let x_train = x_all.select(Axis(0), &split.train);
        let y_train = y_all.select(Axis(0), &split.train);
        let x_test = x_all.select(Axis(0), &split.test);
        let y_test = y_all.select(Axis(0), &split.test);

        // ---------------------------------------------------------------------
        // Step 4: Fit and score
        // ---------------------------------------------------------------------
        let fitted = fit_gamma_glm(&x_train, encoder.columns(), &y_train, &config.irls)?;
        let test_predicted = predict(&fitted, &fitted.model_matrix(&x_test)?)?;

        Ok(Self {
            encoder,
            fitted,
            n_excluded,
            n_train: split.train.len(),
            n_test: split.test.len(),
            test_actual: y_test,
            test_predicted,
        })
    }

    /// RMSE on the held-out rows, `None` if there are none.
    pub fn test_rmse(&self) -> Option<f64> {
        rmse(&self.test_actual, &self.test_predicted).ok()
    }

    /// Expected loss ratio for arbitrary records.
    pub fn predict_records(&self, records: &[&Record]) -> Result<Array1<f64>> {
        let encoded = self.encoder.transform(records);
        predict(&self.fitted, &self.fitted.model_matrix(&encoded)?)
    }

    /// Largest indicator coefficients among `features`.
    pub fn risk_drivers(&self, features: &[Column], k: usize) -> Vec<RiskDriver> {
        rank_risk_drivers(&self.fitted, features, k)
    }

    /// Held-out error plus the top drivers over Province, Gender and make.
    pub fn evaluation(&self) -> ModelEvaluation {
        ModelEvaluation {
            n_train: self.n_train,
            n_test: self.n_test,
            n_excluded: self.n_excluded,
            test_rmse: self.test_rmse(),
            iterations: self.fitted.iterations,
            deviance: self.fitted.deviance,
            null_deviance: self.fitted.null_deviance,
            dispersion: self.fitted.dispersion,
            top_drivers: self.risk_drivers(
                &[Column::Province, Column::Gender, Column::Make],
                DEFAULT_TOP_DRIVERS,
            ),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::YearMonth;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn indicator(feature: Column, category: &str) -> FeatureColumn {
        FeatureColumn::Indicator {
            feature,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_zero_variance_column_is_dropped() {
        let x = array![[1.0, 0.0, 1.0], [1.0, 1.0, 2.0], [1.0, 0.0, 3.0], [1.0, 1.0, 4.0]];
        let columns = vec![
            indicator(Column::Province, "Gauteng"),
            indicator(Column::Gender, "Male"),
            FeatureColumn::Numeric {
                feature: Column::CustomValueEstimate,
            },
        ];
        let y = array![0.5, 0.9, 0.6, 1.2];
        let model = fit_gamma_glm(&x, &columns, &y, &IRLSConfig::default()).unwrap();

        assert_eq!(model.column_names(), vec!["Gender_Male", "CustomValueEstimate", "Intercept"]);
        assert_eq!(model.coefficients.len(), 3);
        assert_eq!(model.rank, 3);
        assert!(model.coefficient(&indicator(Column::Province, "Gauteng")).is_none());

        // Scoring reuses the same column selection
        let scored = model.model_matrix(&x).unwrap();
        assert_eq!(scored.ncols(), 3);
        assert_eq!(scored.column(2).to_vec(), vec![1.0; 4]);
    }

    #[test]
    fn test_full_dummy_block_is_rank_deficient_but_fits() {
        let x = array![[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [0.0, 1.0]];
        let columns = vec![indicator(Column::Province, "A"), indicator(Column::Province, "B")];
        let y = array![1.0, 3.0, 4.0, 5.0, 6.0];
        let model = fit_gamma_glm(&x, &columns, &y, &IRLSConfig::default()).unwrap();

        assert_eq!(model.rank, 2);
        let a = model.coefficient(&columns[0]).unwrap();
        let b = model.coefficient(&columns[1]).unwrap();
        let intercept = model.coefficient(&FeatureColumn::Intercept).unwrap();
        assert_abs_diff_eq!((intercept + a).exp(), 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!((intercept + b).exp(), 5.0, epsilon = 1e-6);
        assert!(b > a);
    }

    #[test]
    fn test_coefficient_table_and_summary() {
        let x = array![[0.0], [0.0], [0.0], [1.0], [1.0], [1.0]];
        let columns = vec![indicator(Column::Gender, "Male")];
        let y = array![1.0, 1.2, 0.8, 2.2, 1.8, 2.0];
        let model = fit_gamma_glm(&x, &columns, &y, &IRLSConfig::default()).unwrap();

        assert!(model.dispersion > 0.0);
        assert!(model.deviance < model.null_deviance);
        assert!(model.deviance_explained() > 0.5);

        let table = model.coefficient_table();
        assert_eq!(table.len(), 2);
        let male = &table[0];
        assert_abs_diff_eq!(male.estimate, 2.0f64.ln(), epsilon = 1e-6);
        assert!(male.std_error > 0.0);
        assert!(male.ci_lower < male.estimate && male.estimate < male.ci_upper);
        assert!(model.summary().contains("Gender_Male"));
    }

    #[test]
    fn test_tag_count_must_match() {
        let x = array![[1.0, 2.0]];
        let result = fit_gamma_glm(&x, &[], &array![1.0], &IRLSConfig::default());
        assert!(matches!(result, Err(RiskStatsError::DimensionMismatch(_))));
    }

    #[test]
    fn test_pipeline_excludes_degenerate_rows() {
        let month = YearMonth::new(2015, 1);
        let mut records = Vec::new();
        for i in 0..40u64 {
            let province = if i % 2 == 0 { "A" } else { "B" };
            let claims = if i % 2 == 0 { 30.0 + (i % 5) as f64 } else { 10.0 + (i % 3) as f64 };
            records.push(Record::new(i, 100.0, claims, month).with_province(province));
        }
        // Zero premium and extreme loss ratio rows
        records.push(Record::new(100, 0.0, 10.0, month).with_province("A"));
        records.push(Record::new(101, 1.0, 80.0, month).with_province("B"));
        let dataset = Dataset::new(records);

        let spec = ModelSpec {
            categorical: vec!["Province".to_string()],
            numerical: vec![],
        };
        let model = LossRatioModel::fit(&dataset, &spec, &GlmConfig::default()).unwrap();

        assert_eq!(model.n_excluded, 2);
        assert_eq!(model.n_test, 10);
        assert_eq!(model.n_train, 30);
        assert!(model.test_rmse().unwrap() < 0.05);

        let drivers = model.risk_drivers(&[Column::Province], 5);
        assert_eq!(drivers[0].column, indicator(Column::Province, "A"));

        let evaluation = model.evaluation();
        assert_eq!(evaluation.n_test, 10);
        assert!(evaluation.test_rmse.is_some());
    }

    #[test]
    fn test_predict_records_scores_unseen_category_at_the_base_level() {
        let month = YearMonth::new(2015, 1);
        let records: Vec<Record> = (0..40u64)
            .map(|i| {
                let (province, claims) = if i % 2 == 0 { ("A", 30.0) } else { ("B", 10.0) };
                Record::new(i, 100.0, claims, month).with_province(province)
            })
            .collect();
        let dataset = Dataset::new(records);
        let spec = ModelSpec {
            categorical: vec!["Province".to_string()],
            numerical: vec![],
        };
        let model = LossRatioModel::fit(&dataset, &spec, &GlmConfig::default()).unwrap();

        let seen_a = Record::new(100, 100.0, 0.0, month).with_province("A");
        let seen_b = Record::new(101, 100.0, 0.0, month).with_province("B");
        let unseen = Record::new(102, 100.0, 0.0, month).with_province("Z");
        let scored = model.predict_records(&[&seen_a, &seen_b, &unseen]).unwrap();

        assert_abs_diff_eq!(scored[0], 0.3, epsilon = 1e-5);
        assert_abs_diff_eq!(scored[1], 0.1, epsilon = 1e-5);

        // An unseen category has an all-zero indicator block, so it scores at
        // exp(intercept). With minimum-norm levels β_A + β_B = β_0, which puts
        // the intercept at ln(0.3 × 0.1) / 3.
        let intercept = model.fitted.coefficient(&FeatureColumn::Intercept).unwrap();
        assert_abs_diff_eq!(scored[2], intercept.exp(), epsilon = 1e-9);
        assert_abs_diff_eq!(scored[2], 0.03f64.cbrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: GlmConfig =
            serde_json::from_str(r#"{"seed": 7, "max_iterations": 10}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.irls.max_iterations, 10);
        assert_abs_diff_eq!(config.test_fraction, 0.25);
        assert_abs_diff_eq!(config.max_loss_ratio, 50.0);
    }
}
