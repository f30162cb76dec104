// =============================================================================
// Segment Hypothesis Tests
// =============================================================================
//
// Four fixed tests of whether risk or profitability differs across segments:
//
//   1. Province risk       Province × Claimed              chi-squared
//   2. Postal-code risk    PostalCode × Claimed (top N)    chi-squared
//   3. Postal-code margin  Margin across the top N codes   one-way ANOVA
//   4. Gender risk         Gender × Claimed (Male/Female)  chi-squared
//
// Each test reads the same immutable view and produces its own result, so
// they are order-insensitive and run in parallel in `run_all`.
//
// FOR ACTUARIES:
// --------------
// "Risk" here is claim frequency: the share of policies with any claim.
// A significant chi-squared says frequency depends on the segment; the
// reported contrast (highest vs lowest, ratio) says by how much.
//
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{segment_means, top_categories, SegmentMean};
use crate::constants::{SIGNIFICANCE_LEVEL, TOP_POSTAL_CODES};
use crate::dataset::{Column, Dataset, DerivedView, RowMetric};
use crate::error::{Result, RiskStatsError};
use crate::inference::{chi_squared_independence, one_way_anova_f, ContingencyTable, TestResult};

// =============================================================================
// Configuration
// =============================================================================

/// Knobs of the test battery. The defaults reproduce the standard report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisConfig {
    /// Reject H₀ when p < alpha.
    pub alpha: f64,
    /// How many of the most frequent postal codes the postal-code tests use.
    pub top_n: usize,
    /// Gender values admitted to the gender test; anything else is excluded.
    pub genders: Vec<String>,
}

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            alpha: SIGNIFICANCE_LEVEL,
            top_n: TOP_POSTAL_CODES,
            genders: vec!["Male".to_string(), "Female".to_string()],
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Highest- versus lowest-risk segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContrast {
    pub highest: SegmentMean,
    pub lowest: SegmentMean,
    /// highest / lowest claim rate; `None` when the lowest rate is 0.
    pub ratio: Option<f64>,
}

impl RiskContrast {
    fn from_means(means: &[SegmentMean]) -> Option<Self> {
        let highest = means.first()?.clone();
        let lowest = means.last()?.clone();
        let ratio = (lowest.mean > 0.0).then(|| highest.mean / lowest.mean);
        Some(Self { highest, lowest, ratio })
    }

    /// (highest / lowest − 1) × 100.
    pub fn gap_pct(&self) -> Option<f64> {
        self.ratio.map(|r| (r - 1.0) * 100.0)
    }
}

/// Outcome of a Segment × Claimed independence test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRiskTest {
    pub column: Column,
    pub test: TestResult,
    /// Claim rate per segment, highest first.
    pub claim_rates: Vec<SegmentMean>,
    /// Present only when the test rejects H₀.
    pub contrast: Option<RiskContrast>,
}

impl SegmentRiskTest {
    pub fn summary(&self) -> String {
        let mut out = format!("{} risk: {}", self.column, self.test.summary());
        if let Some(c) = &self.contrast {
            out.push_str(&format!(
                "; highest {} ({:.1}%), lowest {} ({:.1}%)",
                c.highest.key,
                c.highest.mean * 100.0,
                c.lowest.key,
                c.lowest.mean * 100.0
            ));
            if let Some(ratio) = c.ratio {
                out.push_str(&format!(", ratio {:.2}", ratio));
            }
        }
        out
    }
}

/// Outcome of the margin ANOVA across postal codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginTest {
    pub test: TestResult,
    /// The postal codes compared, most frequent first.
    pub postal_codes: Vec<String>,
    /// Mean margin per postal code, highest first.
    pub mean_margins: Vec<SegmentMean>,
    /// Present only when the test rejects H₀.
    pub most_profitable: Option<SegmentMean>,
    pub least_profitable: Option<SegmentMean>,
}

impl MarginTest {
    pub fn summary(&self) -> String {
        let mut out = format!("PostalCode margin: {}", self.test.summary());
        if let (Some(best), Some(worst)) = (&self.most_profitable, &self.least_profitable) {
            out.push_str(&format!(
                "; most profitable {} ({:.2}), least profitable {} ({:.2})",
                best.key, best.mean, worst.key, worst.mean
            ));
        }
        out
    }
}

/// All four tests. A failing test does not prevent the others from running.
#[derive(Debug, Clone)]
pub struct HypothesisReport {
    pub province_risk: Result<SegmentRiskTest>,
    pub postal_code_risk: Result<SegmentRiskTest>,
    pub postal_code_margin: Result<MarginTest>,
    pub gender_risk: Result<SegmentRiskTest>,
}

impl HypothesisReport {
    /// One line per test.
    pub fn summary(&self) -> String {
        fn line<T>(result: &Result<T>, describe: impl Fn(&T) -> String, name: &str) -> String {
            match result {
                Ok(r) => describe(r),
                Err(e) => format!("{}: not run ({})", name, e),
            }
        }
        [
            line(&self.province_risk, SegmentRiskTest::summary, "Province risk"),
            line(&self.postal_code_risk, SegmentRiskTest::summary, "PostalCode risk"),
            line(&self.postal_code_margin, MarginTest::summary, "PostalCode margin"),
            line(&self.gender_risk, SegmentRiskTest::summary, "Gender risk"),
        ]
        .join("\n")
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Runs the segment tests over a derived view.
#[derive(Debug, Clone, Default)]
pub struct HypothesisRunner {
    config: HypothesisConfig,
}

impl HypothesisRunner {
    pub fn new(config: HypothesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HypothesisConfig {
        &self.config
    }

    /// Test 1: does claim frequency depend on province?
    pub fn province_risk(&self, view: &DerivedView<'_>) -> Result<SegmentRiskTest> {
        self.segment_risk(view, Column::Province)
    }

    /// Test 2: does claim frequency differ across the most frequent postal codes?
    pub fn postal_code_risk(&self, view: &DerivedView<'_>) -> Result<SegmentRiskTest> {
        let subset = self.top_postal_codes(view)?.1;
        self.segment_risk(&subset, Column::PostalCode)
    }

    /// Test 3: does mean margin differ across the most frequent postal codes?
    pub fn postal_code_margin(&self, view: &DerivedView<'_>) -> Result<MarginTest> {
        let (postal_codes, subset) = self.top_postal_codes(view)?;

        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in subset.rows() {
            if let Some(code) = row.record.categorical(Column::PostalCode) {
                groups.entry(code.to_string()).or_default().push(row.margin);
            }
        }

        let test = one_way_anova_f(&groups)?.with_alpha(self.config.alpha);
        let mean_margins = segment_means(&subset, Column::PostalCode, RowMetric::Margin)?;
        let (most_profitable, least_profitable) = if test.is_significant() {
            (mean_margins.first().cloned(), mean_margins.last().cloned())
        } else {
            (None, None)
        };

        let result = MarginTest {
            test,
            postal_codes,
            mean_margins,
            most_profitable,
            least_profitable,
        };
        log::info!("{}", result.summary());
        Ok(result)
    }

    /// Test 4: does claim frequency depend on gender? Only the configured
    /// gender values take part.
    pub fn gender_risk(&self, view: &DerivedView<'_>) -> Result<SegmentRiskTest> {
        let subset = view.restrict_to(Column::Gender, &self.config.genders);
        log::debug!(
            "gender test keeps {} of {} rows with gender in {:?}",
            subset.len(),
            view.len(),
            self.config.genders
        );
        self.segment_risk(&subset, Column::Gender)
    }

    /// Run all four tests in parallel over one view.
    pub fn run_all(&self, view: &DerivedView<'_>) -> HypothesisReport {
        let ((province_risk, postal_code_risk), (postal_code_margin, gender_risk)) = rayon::join(
            || rayon::join(|| self.province_risk(view), || self.postal_code_risk(view)),
            || rayon::join(|| self.postal_code_margin(view), || self.gender_risk(view)),
        );
        HypothesisReport {
            province_risk,
            postal_code_risk,
            postal_code_margin,
            gender_risk,
        }
    }

    /// Convenience: derive the view and run all four tests.
    pub fn run_dataset(&self, dataset: &Dataset) -> HypothesisReport {
        self.run_all(&dataset.derive())
    }

    // -------------------------------------------------------------------------
    // Shared steps
    // -------------------------------------------------------------------------

    fn segment_risk(&self, view: &DerivedView<'_>, column: Column) -> Result<SegmentRiskTest> {
        let table = ContingencyTable::from_pairs(view.rows().iter().filter_map(|row| {
            row.record
                .categorical(column)
                .map(|value| (value, row.claimed.to_string()))
        }));
        let test = chi_squared_independence(&table)?.with_alpha(self.config.alpha);

        let claim_rates = segment_means(view, column, RowMetric::Claimed)?;
        let contrast = if test.is_significant() {
            RiskContrast::from_means(&claim_rates)
        } else {
            None
        };

        let result = SegmentRiskTest {
            column,
            test,
            claim_rates,
            contrast,
        };
        log::info!("{}", result.summary());
        Ok(result)
    }

    fn top_postal_codes<'a>(
        &self,
        view: &DerivedView<'a>,
    ) -> Result<(Vec<String>, DerivedView<'a>)> {
        let codes = top_categories(view.records(), Column::PostalCode, self.config.top_n)?;
        if codes.is_empty() {
            return Err(RiskStatsError::EmptyInput("no postal codes observed".to_string()));
        }
        let subset = view.restrict_to(Column::PostalCode, &codes);
        Ok((codes, subset))
    }
}

// =============================================================================
// Tests
// =============================================================================
