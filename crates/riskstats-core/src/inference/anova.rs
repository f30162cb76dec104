// =============================================================================
// One-Way ANOVA
// =============================================================================
//
// Tests whether k groups share a common mean:
//
//     SSB = Σ_g n_g (ȳ_g − ȳ)²          df_between = k − 1
//     SSW = Σ_g Σ_i (y_gi − ȳ_g)²       df_within  = N − k
//     F   = (SSB / df_between) / (SSW / df_within)
//
// The p-value is the upper tail of F(df_between, df_within).
//
// =============================================================================

use std::collections::BTreeMap;

use super::{pvalue_f, DegreesOfFreedom, TestKind, TestResult};
use crate::constants::SIGNIFICANCE_LEVEL;
use crate::error::{Result, RiskStatsError};

/// One-way ANOVA F-test across labelled groups.
///
/// Empty groups are ignored. When every group has zero spread the statistic
/// is infinite if the means differ and 0 if they coincide.
///
/// # Errors
/// `InsufficientGroups` with fewer than two non-empty groups, or when the
/// observations leave no within-group degrees of freedom.
pub fn one_way_anova_f(groups: &BTreeMap<String, Vec<f64>>) -> Result<TestResult> {
    let non_empty: Vec<&Vec<f64>> = groups.values().filter(|g| !g.is_empty()).collect();
    let k = non_empty.len();
    if k < 2 {
        return Err(RiskStatsError::InsufficientGroups(format!(
            "need at least 2 non-empty groups, got {}",
            k
        )));
    }

    let n_total: usize = non_empty.iter().map(|g| g.len()).sum();
    if n_total <= k {
        return Err(RiskStatsError::InsufficientGroups(format!(
            "{} observations in {} groups leave no within-group degrees of freedom",
            n_total, k
        )));
    }

    let grand_mean = non_empty.iter().flat_map(|g| g.iter()).sum::<f64>() / n_total as f64;

    let (mut ss_between, mut ss_within) = (0.0, 0.0);
    for group in &non_empty {
        let n = group.len() as f64;
        let mean = group.iter().sum::<f64>() / n;
        ss_between += n * (mean - grand_mean).powi(2);
        ss_within += group.iter().map(|y| (y - mean).powi(2)).sum::<f64>();
    }

    let df_between = k - 1;
    let df_within = n_total - k;
    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;

    let statistic = if ms_within > 0.0 {
        ms_between / ms_within
    } else if ms_between > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let p_value = pvalue_f(statistic, df_between as f64, df_within as f64);

    Ok(TestResult::new(
        TestKind::OneWayAnova,
        statistic,
        DegreesOfFreedom::Pair {
            between: df_between,
            within: df_within,
        },
        p_value,
        SIGNIFICANCE_LEVEL,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn groups(data: &[(&str, &[f64])]) -> BTreeMap<String, Vec<f64>> {
        data.iter().map(|(k, v)| (k.to_string(), v.to_vec())).collect()
    }

    #[test]
    fn test_identical_means_give_f_near_zero() {
        let g = groups(&[
            ("a", &[1.0, 2.0, 3.0]),
            ("b", &[3.0, 2.0, 1.0]),
            ("c", &[2.0, 1.0, 3.0]),
        ]);
        let result = one_way_anova_f(&g).unwrap();
        assert_abs_diff_eq!(result.statistic, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.p_value, 1.0, epsilon = 1e-9);
        assert_eq!(result.df, DegreesOfFreedom::Pair {
            between: 2,
            within: 6,
        });
    }

    #[test]
    fn test_separated_means_give_small_p() {
        let g = groups(&[
            ("low", &[1.0, 1.1, 0.9, 1.0]),
            ("mid", &[10.0, 10.1, 9.9, 10.0]),
            ("high", &[20.0, 20.1, 19.9, 20.0]),
        ]);
        let result = one_way_anova_f(&g).unwrap();
        assert!(result.statistic > 1000.0);
        assert!(result.p_value < 1e-6);
        assert!(result.is_significant());
    }

    #[test]
    fn test_known_f_statistic() {
        // Means 2 and 4, each group variance 1, n = 3 per group
        // SSB = 3·1 + 3·1 = 6, SSW = 2 + 2 = 4, F = 6 / (4/4) = 6
        let g = groups(&[("a", &[1.0, 2.0, 3.0]), ("b", &[3.0, 4.0, 5.0])]);
        let result = one_way_anova_f(&g).unwrap();
        assert_abs_diff_eq!(result.statistic, 6.0, epsilon = 1e-12);
        // F(1, 4) tail at 6 equals the two-sided t(4) tail at sqrt(6)
        assert!(result.p_value > 0.05 && result.p_value < 0.1);
    }

    #[test]
    fn test_zero_spread_groups() {
        let g = groups(&[("a", &[1.0, 1.0]), ("b", &[2.0, 2.0])]);
        let result = one_way_anova_f(&g).unwrap();
        assert!(result.statistic.is_infinite());
        assert_eq!(result.p_value, 0.0);

        let g = groups(&[("a", &[1.0, 1.0]), ("b", &[1.0, 1.0])]);
        let result = one_way_anova_f(&g).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_insufficient_groups() {
        let g = groups(&[("a", &[1.0, 2.0]), ("empty", &[])]);
        assert!(matches!(
            one_way_anova_f(&g),
            Err(RiskStatsError::InsufficientGroups(_))
        ));

        let g = groups(&[("a", &[1.0]), ("b", &[2.0])]);
        assert!(matches!(
            one_way_anova_f(&g),
            Err(RiskStatsError::InsufficientGroups(_))
        ));
    }
}
