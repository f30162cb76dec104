// =============================================================================
// Segment Aggregation
// =============================================================================
//
// Loss ratio by segment is a ratio of SUMS:
//
//     LR(segment) = Σ claims / Σ premium × 100
//
// never the mean of per-record ratios. Ratio-of-sums is additive over
// partitions: merging two segments gives the ratio of their pooled sums, which
// is what an underwriter sees on the books.
//
// =============================================================================

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::dataset::{Column, ColumnKind, DerivedView, GroupValue, Record, RowMetric};
use crate::error::{Result, RiskStatsError};

/// Claims, premium and loss ratio of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAggregate {
    /// One value per grouping column.
    pub key: Vec<String>,
    pub policy_count: usize,
    pub total_claims: f64,
    pub total_premium: f64,
    /// Σ claims / Σ premium × 100; `None` when Σ premium is zero.
    pub loss_ratio: Option<f64>,
}

impl SegmentAggregate {
    /// Display label, key parts joined by " / ".
    pub fn label(&self) -> String {
        self.key.join(" / ")
    }
}

/// Mean of a derived metric within one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMean {
    pub key: String,
    pub count: usize,
    pub mean: f64,
}

/// Frequency of one categorical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

/// Resolve a grouping column by name.
pub(crate) fn resolve_group_key(name: &str) -> Result<Column> {
    Column::from_name(name).ok_or_else(|| RiskStatsError::InvalidGroupKey(name.to_string()))
}

/// Loss ratio per segment of a single column, highest first.
///
/// Records whose key is missing are left out of every segment. Segments with
/// equal loss ratio keep their key order; segments with zero premium (undefined
/// loss ratio) come last.
pub fn segmented_loss_ratio<'a, I>(records: I, group_key: &str) -> Result<Vec<SegmentAggregate>>
where
    I: IntoIterator<Item = &'a Record>,
{
    segmented_loss_ratio_by(records, &[group_key])
}

/// Loss ratio per combination of several grouping columns, highest first.
pub fn segmented_loss_ratio_by<'a, I>(
    records: I,
    group_keys: &[&str],
) -> Result<Vec<SegmentAggregate>>
where
    I: IntoIterator<Item = &'a Record>,
{
    if group_keys.is_empty() {
        return Err(RiskStatsError::InvalidGroupKey(
            "at least one grouping column is required".to_string(),
        ));
    }
    let columns = group_keys
        .iter()
        .map(|name| resolve_group_key(name))
        .collect::<Result<Vec<_>>>()?;

    // (count, claims, premium) per key, ordered by value within each column
    let mut groups: BTreeMap<Vec<GroupValue>, (usize, f64, f64)> = BTreeMap::new();
    for record in records {
        let key: Option<Vec<GroupValue>> = columns.iter().map(|&c| record.group_value(c)).collect();
        let Some(key) = key else { continue };
        let entry = groups.entry(key).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += record.total_claims;
        entry.2 += record.total_premium;
    }

    let mut segments: Vec<SegmentAggregate> = groups
        .into_iter()
        .map(|(key, (policy_count, total_claims, total_premium))| SegmentAggregate {
            key: key.iter().map(GroupValue::to_string).collect(),
            policy_count,
            total_claims,
            total_premium,
            loss_ratio: loss_ratio_pct(total_claims, total_premium),
        })
        .collect();

    // Vec::sort_by is stable, so ties keep key order
    segments.sort_by(|a, b| descending_optional(a.loss_ratio, b.loss_ratio));
    Ok(segments)
}

/// Σ claims / Σ premium × 100, undefined for zero premium.
pub fn loss_ratio_pct(total_claims: f64, total_premium: f64) -> Option<f64> {
    if total_premium == 0.0 {
        None
    } else {
        Some(total_claims / total_premium * 100.0)
    }
}

/// (label, loss ratio) pairs for a bar renderer; undefined ratios become 0.
pub fn loss_ratio_series(segments: &[SegmentAggregate]) -> Vec<(String, f64)> {
    segments
        .iter()
        .map(|s| (s.label(), s.loss_ratio.unwrap_or(0.0)))
        .collect()
}

/// Mean of `metric` per value of a categorical column, highest first.
pub fn segment_means(
    view: &DerivedView<'_>,
    column: Column,
    metric: RowMetric,
) -> Result<Vec<SegmentMean>> {
    if column.kind() != ColumnKind::Categorical {
        return Err(RiskStatsError::SchemaMismatch(format!(
            "{} is not categorical",
            column
        )));
    }

    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for row in view.rows() {
        if let Some(value) = row.record.categorical(column) {
            let entry = groups.entry(value).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += row.metric(metric);
        }
    }

    let mut means: Vec<SegmentMean> = groups
        .into_iter()
        .map(|(key, (count, sum))| SegmentMean {
            key: key.to_string(),
            count,
            mean: sum / count as f64,
        })
        .collect();
    means.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(Ordering::Equal));
    Ok(means)
}

/// Value counts of a categorical column, most frequent first.
///
/// Equal counts keep the order in which the values were first encountered.
pub fn category_counts<'a, I>(records: I, column: Column) -> Result<Vec<CategoryCount>>
where
    I: IntoIterator<Item = &'a Record>,
{
    if column.kind() != ColumnKind::Categorical {
        return Err(RiskStatsError::SchemaMismatch(format!(
            "{} is not categorical",
            column
        )));
    }

    let mut counts: Vec<CategoryCount> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for record in records {
        let Some(value) = record.categorical(column) else { continue };
        match index.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value, counts.len());
                counts.push(CategoryCount {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(counts)
}

/// The `n` most frequent values of a categorical column.
pub fn top_categories<'a, I>(records: I, column: Column, n: usize) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a Record>,
{
    Ok(category_counts(records, column)?
        .into_iter()
        .take(n)
        .map(|c| c.value)
        .collect())
}

/// Descending order with `None` last.
fn descending_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
