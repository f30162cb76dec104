//! Descriptive profiles of single columns: outliers, composition, histograms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{IQR_FENCE_MULTIPLIER, OUTLIER_SKEW_THRESHOLD_PCT};
use crate::dataset::{Column, ColumnKind, Record};
use crate::error::{Result, RiskStatsError};

/// How much IQR outliers move the mean of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierImpact {
    pub column: Column,
    pub q1: f64,
    pub q3: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub outlier_policy_ids: Vec<u64>,
    /// Outliers as a percentage of non-missing values.
    pub outlier_share_pct: f64,
    pub mean_with_outliers: f64,
    pub mean_without_outliers: f64,
    /// (mean with − mean without) / mean without × 100; `None` if the trimmed mean is 0.
    pub skew_pct: Option<f64>,
}

impl OutlierImpact {
    pub fn outlier_count(&self) -> usize {
        self.outlier_policy_ids.len()
    }

    /// Whether outliers move the mean by more than `threshold_pct` percent.
    pub fn is_material(&self, threshold_pct: f64) -> bool {
        self.skew_pct.is_some_and(|s| s.abs() > threshold_pct)
    }

    pub fn summary(&self) -> String {
        let verdict = if self.is_material(OUTLIER_SKEW_THRESHOLD_PCT) {
            "outliers could skew the analysis"
        } else {
            "outliers have minimal impact"
        };
        format!(
            "{}: {} outliers ({:.1}% of data), mean {:.0} with vs {:.0} without, {}",
            self.column,
            self.outlier_count(),
            self.outlier_share_pct,
            self.mean_with_outliers,
            self.mean_without_outliers,
            verdict
        )
    }
}

/// Linear-interpolated quantile of an ascending slice.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn numeric_values<'a, I>(records: I, column: Column) -> Result<Vec<(u64, f64)>>
where
    I: IntoIterator<Item = &'a Record>,
{
    if column.kind() != ColumnKind::Numeric {
        return Err(RiskStatsError::SchemaMismatch(format!("{} is not numeric", column)));
    }
    let values: Vec<(u64, f64)> = records
        .into_iter()
        .filter_map(|r| r.numeric(column).map(|v| (r.policy_id, v)))
        .filter(|(_, v)| v.is_finite())
        .collect();
    if values.is_empty() {
        return Err(RiskStatsError::EmptyInput(format!("{} has no values", column)));
    }
    Ok(values)
}

/// Flag values outside the 1.5×IQR fences and measure their pull on the mean.
pub fn outlier_impact<'a, I>(records: I, column: Column) -> Result<OutlierImpact>
where
    I: IntoIterator<Item = &'a Record>,
{
    let values = numeric_values(records, column)?;

    let mut sorted: Vec<f64> = values.iter().map(|&(_, v)| v).collect();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile_sorted(&sorted, 0.25);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - IQR_FENCE_MULTIPLIER * iqr;
    let upper_fence = q3 + IQR_FENCE_MULTIPLIER * iqr;

    let mut outlier_policy_ids = Vec::new();
    let (mut sum_all, mut sum_kept, mut n_kept) = (0.0, 0.0, 0usize);
    for &(policy_id, v) in &values {
        sum_all += v;
        if v < lower_fence || v > upper_fence {
            outlier_policy_ids.push(policy_id);
        } else {
            sum_kept += v;
            n_kept += 1;
        }
    }

    let mean_with_outliers = sum_all / values.len() as f64;
    // Values between the quartiles always survive, so n_kept > 0
    let mean_without_outliers = sum_kept / n_kept.max(1) as f64;
    let skew_pct = if mean_without_outliers == 0.0 {
        None
    } else {
        Some((mean_with_outliers - mean_without_outliers) / mean_without_outliers * 100.0)
    };

    Ok(OutlierImpact {
        column,
        q1,
        q3,
        lower_fence,
        upper_fence,
        outlier_share_pct: outlier_policy_ids.len() as f64 / values.len() as f64 * 100.0,
        outlier_policy_ids,
        mean_with_outliers,
        mean_without_outliers,
        skew_pct,
    })
}

/// Percentage breakdown of `composition` within each value of `row`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRow {
    pub row: String,
    pub total: usize,
    /// (category, percent of the row), categories in sorted order.
    pub shares: Vec<(String, f64)>,
}

/// Row-normalised cross-tabulation of two categorical columns, in percent.
pub fn composition<'a, I>(
    records: I,
    row: Column,
    composition: Column,
) -> Result<Vec<CompositionRow>>
where
    I: IntoIterator<Item = &'a Record>,
{
    for column in [row, composition] {
        if column.kind() != ColumnKind::Categorical {
            return Err(RiskStatsError::SchemaMismatch(format!(
                "{} is not categorical",
                column
            )));
        }
    }

    let mut table: BTreeMap<&'a str, BTreeMap<&'a str, usize>> = BTreeMap::new();
    for record in records {
        if let (Some(r), Some(c)) = (record.categorical(row), record.categorical(composition)) {
            *table.entry(r).or_default().entry(c).or_insert(0) += 1;
        }
    }

    Ok(table
        .into_iter()
        .map(|(r, counts)| {
            let total: usize = counts.values().sum();
            CompositionRow {
                row: r.to_string(),
                total,
                shares: counts
                    .into_iter()
                    .map(|(c, n)| (c.to_string(), n as f64 / total as f64 * 100.0))
                    .collect(),
            }
        })
        .collect())
}

/// One equal-width histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of a numeric column. The last bin is closed on the right.
pub fn histogram<'a, I>(records: I, column: Column, bins: usize) -> Result<Vec<HistogramBin>>
where
    I: IntoIterator<Item = &'a Record>,
{
    if bins == 0 {
        return Err(RiskStatsError::EmptyInput("histogram needs at least one bin".to_string()));
    }
    let values = numeric_values(records, column)?;

    let (mut min, mut max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| (lo.min(v), hi.max(v)));
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &(_, v) in &values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count,
        })
        .collect())
}
