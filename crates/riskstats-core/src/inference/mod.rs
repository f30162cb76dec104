// =============================================================================
// Statistical Inference
// =============================================================================
//
// The distribution engine behind the hypothesis tests and the GLM summary:
//   - P-values: upper tails of the chi-squared and F distributions,
//     two-sided normal tails for coefficient z-tests
//   - Test statistics: Pearson chi-squared independence, one-way ANOVA
//   - Decisions: reject / fail to reject at a given significance level
//
// FOR ACTUARIES:
// --------------
// A p-value answers "if segments truly did not differ, how often would we see
// a difference at least this large?". Below α (0.05 by default) we reject the
// null hypothesis of no association.
//
// IMPORTANT CAVEATS:
// - Statistical significance ≠ practical significance
// - With a full policy book, tiny differences become "significant"
// - Always report the effect size next to the p-value
//
// =============================================================================

mod anova;
mod chi_squared;

pub use anova::one_way_anova_f;
pub use chi_squared::{chi_squared_independence, ContingencyTable};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal};

// =============================================================================
// P-Value Calculation
// =============================================================================

/// Calculate two-tailed p-value from a z-statistic.
///
/// Uses the standard normal distribution.
pub fn pvalue_z(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }

    match Normal::new(0.0, 1.0) {
        // P(|Z| > |z|) = 2 * P(Z > |z|)
        Ok(normal) => 2.0 * normal.sf(z.abs()),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail p-value of a chi-squared statistic: P(χ²_df ≥ statistic).
///
/// Uses the survival function directly rather than `1 - cdf`, which keeps
/// precision for very small p-values.
pub fn pvalue_chi2(statistic: f64, df: f64) -> f64 {
    if statistic.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if statistic <= 0.0 {
        return 1.0;
    }
    if statistic == f64::INFINITY {
        return 0.0;
    }

    match ChiSquared::new(df) {
        Ok(dist) => dist.sf(statistic),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail p-value of an F statistic: P(F_{df1,df2} ≥ statistic).
pub fn pvalue_f(statistic: f64, df1: f64, df2: f64) -> f64 {
    if statistic.is_nan() || df1 <= 0.0 || df2 <= 0.0 {
        return f64::NAN;
    }
    if statistic <= 0.0 {
        return 1.0;
    }
    if statistic == f64::INFINITY {
        return 0.0;
    }

    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(statistic),
        Err(_) => f64::NAN,
    }
}

// =============================================================================
// Confidence Intervals
// =============================================================================

/// Calculate confidence interval using z-distribution.
///
/// For a log link, exp(CI) gives the relativity confidence interval.
pub fn confidence_interval_z(estimate: f64, std_error: f64, confidence: f64) -> (f64, f64) {
    if !estimate.is_finite() || !std_error.is_finite() || std_error <= 0.0 {
        return (f64::NAN, f64::NAN);
    }

    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return (f64::NAN, f64::NAN);
    };

    // For 95% CI, alpha = 0.05, so we need z_{0.975}
    let alpha = 1.0 - confidence;
    let z_critical = normal.inverse_cdf(1.0 - alpha / 2.0);

    let margin = z_critical * std_error;
    (estimate - margin, estimate + margin)
}

// =============================================================================
// Test Results
// =============================================================================

/// Which test produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    ChiSquaredIndependence,
    OneWayAnova,
}

/// Degrees of freedom of a test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegreesOfFreedom {
    /// Chi-squared: (rows − 1)(cols − 1).
    Single(usize),
    /// F-test: numerator (between groups) and denominator (within groups).
    Pair { between: usize, within: usize },
}

/// Outcome of comparing a p-value with α.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    RejectNull,
    FailToReject,
}

impl Decision {
    /// Reject when p < α. A NaN p-value never rejects.
    pub fn at(p_value: f64, alpha: f64) -> Self {
        if p_value < alpha {
            Decision::RejectNull
        } else {
            Decision::FailToReject
        }
    }
}

/// Statistic, degrees of freedom, p-value and decision of one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub kind: TestKind,
    pub statistic: f64,
    pub df: DegreesOfFreedom,
    pub p_value: f64,
    pub alpha: f64,
    pub decision: Decision,
}

impl TestResult {
    pub(crate) fn new(
        kind: TestKind,
        statistic: f64,
        df: DegreesOfFreedom,
        p_value: f64,
        alpha: f64,
    ) -> Self {
        Self {
            kind,
            statistic,
            df,
            p_value,
            alpha,
            decision: Decision::at(p_value, alpha),
        }
    }

    /// Re-evaluate the decision at another significance level.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self.decision = Decision::at(self.p_value, alpha);
        self
    }

    pub fn is_significant(&self) -> bool {
        self.decision == Decision::RejectNull
    }

    pub fn summary(&self) -> String {
        let stat = match (self.kind, self.df) {
            (TestKind::ChiSquaredIndependence, DegreesOfFreedom::Single(df)) => {
                format!("chi2({}) = {:.4}", df, self.statistic)
            }
            (_, DegreesOfFreedom::Pair { between, within }) => {
                format!("F({}, {}) = {:.4}", between, within, self.statistic)
            }
            (_, DegreesOfFreedom::Single(df)) => format!("stat({}) = {:.4}", df, self.statistic),
        };
        let decision = match self.decision {
            Decision::RejectNull => "reject H0",
            Decision::FailToReject => "fail to reject H0",
        };
        format!(
            "{}, p = {:.4}{} -> {} at alpha = {}",
            stat,
            self.p_value,
            significance_stars(self.p_value),
            decision,
            self.alpha
        )
    }
}

// =============================================================================
// Significance Stars (for summary tables)
// =============================================================================

/// Get significance stars for a p-value.
///
/// - "***" : p < 0.001
/// - "**"  : p < 0.01
/// - "*"   : p < 0.05
/// - "."   : p < 0.1
/// - ""    : p >= 0.1
pub fn significance_stars(pvalue: f64) -> &'static str {
    if pvalue < 0.001 {
        "***"
    } else if pvalue < 0.01 {
        "**"
    } else if pvalue < 0.05 {
        "*"
    } else if pvalue < 0.1 {
        "."
    } else {
        ""
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pvalue_z_zero() {
        assert_abs_diff_eq!(pvalue_z(0.0), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_pvalue_z_known_value() {
        // z = 1.96 should give p ≈ 0.05 (two-tailed)
        assert_abs_diff_eq!(pvalue_z(1.96), 0.05, epsilon = 0.001);
        assert_abs_diff_eq!(pvalue_z(2.0), pvalue_z(-2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_pvalue_chi2_known_values() {
        // Critical values at 5%: 3.841 (df 1), 5.991 (df 2), 18.307 (df 10)
        assert_abs_diff_eq!(pvalue_chi2(3.841459, 1.0), 0.05, epsilon = 1e-4);
        assert_abs_diff_eq!(pvalue_chi2(5.991465, 2.0), 0.05, epsilon = 1e-4);
        assert_abs_diff_eq!(pvalue_chi2(18.307038, 10.0), 0.05, epsilon = 1e-4);
        // For df 2 the tail is exp(-x/2)
        assert_abs_diff_eq!(pvalue_chi2(4.0, 2.0), (-2.0f64).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_pvalue_chi2_edges() {
        assert_eq!(pvalue_chi2(0.0, 3.0), 1.0);
        assert_eq!(pvalue_chi2(f64::INFINITY, 3.0), 0.0);
        assert!(pvalue_chi2(1.0, 0.0).is_nan());
        // Far tail is tiny, not negative
        let p = pvalue_chi2(200.0, 1.0);
        assert!((0.0..1e-20).contains(&p));
    }

    #[test]
    fn test_pvalue_f_known_values() {
        // F(2, 10) critical value at 5% is 4.103
        assert_abs_diff_eq!(pvalue_f(4.102821, 2.0, 10.0), 0.05, epsilon = 1e-4);
        // For df1 = 2 the tail is (1 + 2x/df2)^(-df2/2)
        assert_abs_diff_eq!(pvalue_f(3.0, 2.0, 8.0), (1.0f64 + 0.75).powf(-4.0), epsilon = 1e-10);
        assert_eq!(pvalue_f(0.0, 2.0, 10.0), 1.0);
    }

    #[test]
    fn test_confidence_interval_95() {
        let (lower, upper) = confidence_interval_z(1.0, 0.5, 0.95);
        assert_abs_diff_eq!(lower, 1.0 - 1.96 * 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(upper, 1.0 + 1.96 * 0.5, epsilon = 0.01);
    }

    #[test]
    fn test_decision_threshold_is_strict() {
        assert_eq!(Decision::at(0.049, 0.05), Decision::RejectNull);
        assert_eq!(Decision::at(0.05, 0.05), Decision::FailToReject);
        assert_eq!(Decision::at(f64::NAN, 0.05), Decision::FailToReject);
    }

    #[test]
    fn test_with_alpha_reevaluates() {
        let result = TestResult::new(
            TestKind::ChiSquaredIndependence,
            5.0,
            DegreesOfFreedom::Single(1),
            0.025,
            0.05,
        );
        assert!(result.is_significant());
        assert!(!result.clone().with_alpha(0.01).is_significant());
        assert!(result.summary().starts_with("chi2(1)"));
    }

    #[test]
    fn test_significance_stars() {
        assert_eq!(significance_stars(0.0001), "***");
        assert_eq!(significance_stars(0.005), "**");
        assert_eq!(significance_stars(0.03), "*");
        assert_eq!(significance_stars(0.08), ".");
        assert_eq!(significance_stars(0.5), "");
    }
}
