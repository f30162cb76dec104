//! Month-level aggregation: postal-code deltas and portfolio trend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::TREND_CHANGE_THRESHOLD_PCT;
use crate::dataset::{Record, YearMonth};

/// Monthly totals of one postal code and their change from the previous month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipMonthChange {
    pub postal_code: String,
    pub month: YearMonth,
    pub monthly_claims: f64,
    pub monthly_premium: f64,
    pub claims_change: f64,
    pub premium_change: f64,
}

/// Claims and premium per (postal code, month), first-differenced within each
/// postal code in month order.
///
/// A first difference needs two observations, so the earliest month of every
/// postal code is dropped rather than zero-filled. Records without a postal
/// code are ignored.
pub fn monthly_zip_aggregate<'a, I>(records: I) -> Vec<ZipMonthChange>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut monthly: BTreeMap<(&'a str, YearMonth), (f64, f64)> = BTreeMap::new();
    for record in records {
        let Some(postal_code) = record.postal_code.as_deref() else { continue };
        let entry = monthly
            .entry((postal_code, record.transaction_month))
            .or_insert((0.0, 0.0));
        entry.0 += record.total_claims;
        entry.1 += record.total_premium;
    }

    let mut changes = Vec::new();
    let mut previous: Option<(&str, f64, f64)> = None;
    for ((postal_code, month), (claims, premium)) in monthly {
        if let Some((prev_code, prev_claims, prev_premium)) = previous {
            if prev_code == postal_code {
                changes.push(ZipMonthChange {
                    postal_code: postal_code.to_string(),
                    month,
                    monthly_claims: claims,
                    monthly_premium: premium,
                    claims_change: claims - prev_claims,
                    premium_change: premium - prev_premium,
                });
            }
        }
        previous = Some((postal_code, claims, premium));
    }
    changes
}

/// Pearson correlation between claims change and premium change.
///
/// `None` with fewer than two points or when either series is constant.
pub fn change_correlation(changes: &[ZipMonthChange]) -> Option<f64> {
    let x: Vec<f64> = changes.iter().map(|c| c.claims_change).collect();
    let y: Vec<f64> = changes.iter().map(|c| c.premium_change).collect();
    pearson_correlation(&x, &y)
}

pub(crate) fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx.sqrt() * syy.sqrt()))
}

/// Policy volume and claim severity of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    /// Number of policy records in the month (the "claim frequency" series).
    pub policy_count: usize,
    pub total_claims: f64,
    /// Σ claims / record count.
    pub claim_severity: f64,
}

/// Month-by-month portfolio trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalTrend {
    pub months: Vec<MonthlySummary>,
    /// (last / first − 1) × 100 for the record count.
    pub frequency_change_pct: Option<f64>,
    /// (last / first − 1) × 100 for severity.
    pub severity_change_pct: Option<f64>,
}

impl TemporalTrend {
    /// Whether either series moved by more than `threshold_pct` percent.
    ///
    /// This is a descriptive policy cut-off, not a significance test.
    pub fn is_material_change(&self, threshold_pct: f64) -> bool {
        [self.frequency_change_pct, self.severity_change_pct]
            .iter()
            .flatten()
            .any(|change| change.abs() > threshold_pct)
    }

    pub fn summary(&self) -> String {
        let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:+.1}%", v));
        let verdict = if self.is_material_change(TREND_CHANGE_THRESHOLD_PCT) {
            "material change"
        } else {
            "relatively stable"
        };
        format!(
            "claim frequency {}, claim severity {} ({})",
            fmt(self.frequency_change_pct),
            fmt(self.severity_change_pct),
            verdict
        )
    }

    /// (month, record count) pairs for a line renderer.
    pub fn frequency_series(&self) -> Vec<(String, f64)> {
        self.months
            .iter()
            .map(|m| (m.month.to_string(), m.policy_count as f64))
            .collect()
    }

    /// (month, severity) pairs for a line renderer.
    pub fn severity_series(&self) -> Vec<(String, f64)> {
        self.months
            .iter()
            .map(|m| (m.month.to_string(), m.claim_severity))
            .collect()
    }
}

/// Record count and claim severity per calendar month, in month order.
pub fn temporal_trend<'a, I>(records: I) -> TemporalTrend
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut monthly: BTreeMap<YearMonth, (usize, f64)> = BTreeMap::new();
    for record in records {
        let entry = monthly.entry(record.transaction_month).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.total_claims;
    }

    let months: Vec<MonthlySummary> = monthly
        .into_iter()
        .map(|(month, (policy_count, total_claims))| MonthlySummary {
            month,
            policy_count,
            total_claims,
            claim_severity: total_claims / policy_count as f64,
        })
        .collect();

    let (frequency_change_pct, severity_change_pct) = match (months.first(), months.last()) {
        (Some(first), Some(last)) => (
            percent_change(first.policy_count as f64, last.policy_count as f64),
            percent_change(first.claim_severity, last.claim_severity),
        ),
        _ => (None, None),
    };

    TemporalTrend {
        months,
        frequency_change_pct,
        severity_change_pct,
    }
}

fn percent_change(first: f64, last: f64) -> Option<f64> {
    if first == 0.0 {
        None
    } else {
        Some((last / first - 1.0) * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn record(id: u64, zip: &str, month: u32, premium: f64, claims: f64) -> Record {
        Record::new(id, premium, claims, YearMonth::new(2015, month)).with_postal_code(zip)
    }

    #[test]
    fn test_first_month_per_postal_code_is_dropped() {
        let records = vec![
            record(1, "2000", 1, 100.0, 10.0),
            record(2, "2000", 1, 50.0, 0.0),
            record(3, "2000", 2, 120.0, 40.0),
            record(4, "2000", 4, 90.0, 5.0),
            record(5, "1000", 3, 10.0, 1.0),
        ];
        let changes = monthly_zip_aggregate(&records);

        // "1000" has one month only; "2000" has three months -> two deltas
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.postal_code == "2000"));

        assert_eq!(changes[0].month, YearMonth::new(2015, 2));
        assert_abs_diff_eq!(changes[0].claims_change, 30.0);
        assert_abs_diff_eq!(changes[0].premium_change, -30.0);

        assert_eq!(changes[1].month, YearMonth::new(2015, 4));
        assert_abs_diff_eq!(changes[1].claims_change, -35.0);
        assert_abs_diff_eq!(changes[1].monthly_premium, 90.0);
    }

    #[test]
    fn test_deltas_do_not_cross_postal_codes() {
        let records = vec![
            record(1, "1000", 5, 100.0, 10.0),
            record(2, "2000", 1, 999.0, 999.0),
            record(3, "2000", 2, 1.0, 1.0),
        ];
        let changes = monthly_zip_aggregate(&records);
        assert_eq!(changes.len(), 1);
        assert_abs_diff_eq!(changes[0].claims_change, -998.0);
    }

    #[test]
    fn test_change_correlation() {
        let changes: Vec<ZipMonthChange> = (0..5)
            .map(|i| ZipMonthChange {
                postal_code: "1".to_string(),
                month: YearMonth::new(2015, i + 1),
                monthly_claims: 0.0,
                monthly_premium: 0.0,
                claims_change: i as f64,
                premium_change: 2.0 * i as f64 + 1.0,
            })
            .collect();
        assert_abs_diff_eq!(change_correlation(&changes).unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(change_correlation(&changes[..1]), None);
    }

    #[test]
    fn test_temporal_trend() {
        let records = vec![
            record(1, "1", 1, 100.0, 100.0),
            record(2, "1", 1, 100.0, 0.0),
            record(3, "1", 2, 100.0, 30.0),
            record(4, "1", 3, 100.0, 60.0),
            record(5, "1", 3, 100.0, 0.0),
            record(6, "1", 3, 100.0, 0.0),
        ];
        let trend = temporal_trend(&records);

        assert_eq!(trend.months.len(), 3);
        assert_eq!(trend.months[0].policy_count, 2);
        assert_abs_diff_eq!(trend.months[0].claim_severity, 50.0);
        assert_abs_diff_eq!(trend.months[2].claim_severity, 20.0);

        assert_abs_diff_eq!(trend.frequency_change_pct.unwrap(), 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(trend.severity_change_pct.unwrap(), -60.0, epsilon = 1e-12);
        assert!(trend.is_material_change(TREND_CHANGE_THRESHOLD_PCT));
        assert!(trend.summary().contains("material change"));
        assert_eq!(trend.frequency_series()[1], ("2015-02".to_string(), 1.0));
    }

    #[test]
    fn test_stable_trend_and_zero_severity_start() {
        let records = vec![
            record(1, "1", 1, 100.0, 0.0),
            record(2, "1", 2, 100.0, 50.0),
        ];
        let trend = temporal_trend(&records);
        assert_abs_diff_eq!(trend.frequency_change_pct.unwrap(), 0.0);
        assert_eq!(trend.severity_change_pct, None);
        assert!(!trend.is_material_change(TREND_CHANGE_THRESHOLD_PCT));
    }
}
