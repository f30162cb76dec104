// =============================================================================
// Model Evaluation
// =============================================================================
//
// Scoring, held-out error and risk-driver ranking for a fitted loss-ratio GLM.
//
// SIGN CONVENTION
// ---------------
// The link is log, so a positive coefficient multiplies the expected loss
// ratio by exp(β) > 1: that category is riskier than the base. Drivers are
// ranked on β itself, largest first.
//
// =============================================================================

use std::cmp::Ordering;

use ndarray::Array1;
use serde::Serialize;

use crate::dataset::Column;
use crate::design_matrix::FeatureColumn;
use crate::error::{Result, RiskStatsError};
use crate::links::{Link, LogLink};
use crate::model::FittedModel;

/// μ = exp(Xβ) for a design that already carries the intercept column.
///
/// Build `x` with [`FittedModel::model_matrix`].
pub fn predict(model: &FittedModel, x: &ndarray::Array2<f64>) -> Result<Array1<f64>> {
    if x.ncols() != model.coefficients.len() {
        return Err(RiskStatsError::DimensionMismatch(format!(
            "design has {} columns, model has {} coefficients",
            x.ncols(),
            model.coefficients.len()
        )));
    }
    Ok(LogLink.inverse(&x.dot(&model.coefficients)))
}

/// Root mean squared error.
///
/// # Errors
/// `DimensionMismatch` for unequal lengths, `EmptyInput` for empty arrays.
pub fn rmse(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(RiskStatsError::DimensionMismatch(format!(
            "{} actual values but {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(RiskStatsError::EmptyInput("no values to compare".to_string()));
    }
    let mse = (actual - predicted).mapv(|e| e * e).sum() / actual.len() as f64;
    Ok(mse.sqrt())
}

/// A category and its fitted effect on the expected loss ratio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskDriver {
    pub column: FeatureColumn,
    pub coefficient: f64,
    /// exp(coefficient): multiplicative effect on the expected loss ratio.
    pub relativity: f64,
}

impl RiskDriver {
    pub fn name(&self) -> String {
        self.column.name()
    }
}

/// The `k` largest indicator coefficients whose source feature is in `features`.
///
/// Numeric columns and the intercept are never drivers. Equal coefficients
/// keep design-matrix order.
pub fn rank_risk_drivers(model: &FittedModel, features: &[Column], k: usize) -> Vec<RiskDriver> {
    let mut drivers: Vec<RiskDriver> = model
        .columns
        .iter()
        .zip(model.coefficients.iter())
        .filter(|(column, _)| match column {
            FeatureColumn::Indicator { feature, .. } => features.contains(feature),
            _ => false,
        })
        .map(|(column, &coefficient)| RiskDriver {
            column: column.clone(),
            coefficient,
            relativity: coefficient.exp(),
        })
        .collect();

    drivers.sort_by(|a, b| {
        b.coefficient
            .partial_cmp(&a.coefficient)
            .unwrap_or(Ordering::Equal)
    });
    drivers.truncate(k);
    drivers
}
