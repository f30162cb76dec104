// =============================================================================
// Design Matrix Construction
// =============================================================================
//
// Turns policy records into the dense numeric matrix the GLM is fitted on.
//
// CATEGORICAL FEATURES
// --------------------
// Each categorical feature becomes one 0/1 indicator column per category seen
// at fit time, in the order the categories were first observed. No reference
// level is dropped here: collinearity with the intercept is resolved by the
// solver (minimum-norm solution), which keeps every category's coefficient
// visible for risk-driver ranking.
//
// A category that only shows up at scoring time gets an all-zero block, so
// the policy is priced at the intercept for that feature rather than failing.
//
// MISSING VALUES
// --------------
//   - categorical → the mode (ties go to the value seen first)
//   - numerical   → the median
//
// Both statistics are learned once, at fit time, and reused for every later
// transform so training and held-out rows see the same imputation.
//
// =============================================================================

use std::collections::HashMap;
use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::aggregate::{category_counts, quantile_sorted};
use crate::dataset::{Column, ColumnKind, Record};
use crate::error::{Result, RiskStatsError};

// =============================================================================
// Model specification
// =============================================================================

/// Which columns enter the model, by source column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            categorical: vec!["Province".to_string(), "Gender".to_string(), "make".to_string()],
            numerical: vec!["CustomValueEstimate".to_string()],
        }
    }
}

// =============================================================================
// Column tags
// =============================================================================

/// What a design-matrix column encodes.
///
/// This is the reversible mapping from an encoded column back to its source,
/// so coefficient ranking never has to parse column names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureColumn {
    /// 1.0 when `feature == category`.
    Indicator { feature: Column, category: String },
    /// The raw (imputed) value of a numeric feature.
    Numeric { feature: Column },
    /// Constant 1.0.
    Intercept,
}

impl FeatureColumn {
    /// Display name: `<feature>_<category>`, `<feature>`, or `Intercept`.
    pub fn name(&self) -> String {
        match self {
            FeatureColumn::Indicator { feature, category } => {
                format!("{}_{}", feature.name(), category)
            }
            FeatureColumn::Numeric { feature } => feature.name().to_string(),
            FeatureColumn::Intercept => "Intercept".to_string(),
        }
    }

    /// Source column, `None` for the intercept.
    pub fn feature(&self) -> Option<Column> {
        match self {
            FeatureColumn::Indicator { feature, .. } | FeatureColumn::Numeric { feature } => {
                Some(*feature)
            }
            FeatureColumn::Intercept => None,
        }
    }

    pub fn is_indicator(&self) -> bool {
        matches!(self, FeatureColumn::Indicator { .. })
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// =============================================================================
// Encoder
// =============================================================================

#[derive(Debug, Clone)]
struct CategoricalFeature {
    column: Column,
    mode: String,
    /// Category → position within this feature's block.
    levels: HashMap<String, usize>,
    offset: usize,
}

#[derive(Debug, Clone)]
struct NumericFeature {
    column: Column,
    median: f64,
    offset: usize,
}

/// One-hot encoder with mode/median imputation, fitted once on training rows.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    categorical: Vec<CategoricalFeature>,
    numerical: Vec<NumericFeature>,
    columns: Vec<FeatureColumn>,
}

impl FeatureEncoder {
    /// Learn categories, modes and medians from `records`.
    ///
    /// # Errors
    /// * `SchemaMismatch` if a name is not a column, or is used as the wrong kind
    /// * `EmptyInput` if a feature has no observed value to impute from
    pub fn fit(records: &[&Record], spec: &ModelSpec) -> Result<Self> {
        let mut columns = Vec::new();

        let mut categorical = Vec::with_capacity(spec.categorical.len());
        for name in &spec.categorical {
            let column = resolve_feature(name, ColumnKind::Categorical)?;
            let counts = category_counts(records.iter().copied(), column)?;
            let mode = counts
                .first()
                .map(|c| c.value.clone())
                .ok_or_else(|| {
                    RiskStatsError::EmptyInput(format!("{} has no observed categories", column))
                })?;

            // First-observed order, not frequency order
            let mut levels = HashMap::new();
            let offset = columns.len();
            for record in records {
                if let Some(value) = record.categorical(column) {
                    if !levels.contains_key(value) {
                        levels.insert(value.to_string(), levels.len());
                        columns.push(FeatureColumn::Indicator {
                            feature: column,
                            category: value.to_string(),
                        });
                    }
                }
            }
            categorical.push(CategoricalFeature {
                column,
                mode,
                levels,
                offset,
            });
        }

        let mut numerical = Vec::with_capacity(spec.numerical.len());
        for name in &spec.numerical {
            let column = resolve_feature(name, ColumnKind::Numeric)?;
            let mut observed: Vec<f64> = records
                .iter()
                .filter_map(|r| r.numeric(column))
                .filter(|v| v.is_finite())
                .collect();
            if observed.is_empty() {
                return Err(RiskStatsError::EmptyInput(format!(
                    "{} has no observed values",
                    column
                )));
            }
            observed.sort_by(f64::total_cmp);
            let median = quantile_sorted(&observed, 0.5);
            numerical.push(NumericFeature {
                column,
                median,
                offset: columns.len(),
            });
            columns.push(FeatureColumn::Numeric { feature: column });
        }

        log::debug!(
            "feature encoder fitted on {} rows: {} columns",
            records.len(),
            columns.len()
        );

        Ok(Self {
            categorical,
            numerical,
            columns,
        })
    }

    /// Encode `records` into an n × `n_columns()` matrix.
    ///
    /// Categories not seen at fit time produce all-zero indicators.
    pub fn transform(&self, records: &[&Record]) -> Array2<f64> {
        let mut x = Array2::zeros((records.len(), self.columns.len()));
        for (i, record) in records.iter().enumerate() {
            for feature in &self.categorical {
                let value = record.categorical(feature.column).unwrap_or(&feature.mode);
                if let Some(&level) = feature.levels.get(value) {
                    x[[i, feature.offset + level]] = 1.0;
                }
            }
            for feature in &self.numerical {
                let value = record
                    .numeric(feature.column)
                    .filter(|v| v.is_finite())
                    .unwrap_or(feature.median);
                x[[i, feature.offset]] = value;
            }
        }
        x
    }

    /// Tagged columns, in matrix order.
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column display names, in matrix order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(FeatureColumn::name).collect()
    }

    /// Map a column name back to the column it was produced from.
    pub fn decode(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Imputation value learned for a categorical feature.
    pub fn mode_of(&self, column: Column) -> Option<&str> {
        self.categorical
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.mode.as_str())
    }

    /// Imputation value learned for a numeric feature.
    pub fn median_of(&self, column: Column) -> Option<f64> {
        self.numerical.iter().find(|f| f.column == column).map(|f| f.median)
    }
}

fn resolve_feature(name: &str, expected: ColumnKind) -> Result<Column> {
    let column = Column::from_name(name).ok_or_else(|| {
        RiskStatsError::SchemaMismatch(format!("unknown feature column '{}'", name))
    })?;
    if column.kind() != expected {
        return Err(RiskStatsError::SchemaMismatch(format!(
            "'{}' is {:?}, expected {:?}",
            name,
            column.kind(),
            expected
        )));
    }
    Ok(column)
}

// =============================================================================
// Tests
// =============================================================================
