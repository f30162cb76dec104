// =============================================================================
// Pearson Chi-Squared Test of Independence
// =============================================================================
//
// Given observed counts O_ij of (row category, column category):
//
//     E_ij = row_total_i × col_total_j / grand_total
//     χ²   = Σ (O_ij − E_ij)² / E_ij
//     df   = (rows − 1)(cols − 1)
//
// Under independence χ² follows a chi-squared distribution with df degrees of
// freedom, so the p-value is its upper tail.
//
// =============================================================================

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

use super::{pvalue_chi2, DegreesOfFreedom, TestKind, TestResult};
use crate::constants::SIGNIFICANCE_LEVEL;
use crate::error::{Result, RiskStatsError};

/// Cross-tabulated counts of two categorical variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    row_labels: Vec<String>,
    col_labels: Vec<String>,
    counts: Array2<f64>,
}

impl ContingencyTable {
    /// Build a table from explicit labels and a rows × cols count matrix.
    pub fn new(
        row_labels: Vec<String>,
        col_labels: Vec<String>,
        counts: Array2<f64>,
    ) -> Result<Self> {
        if counts.nrows() != row_labels.len() || counts.ncols() != col_labels.len() {
            return Err(RiskStatsError::DimensionMismatch(format!(
                "counts are {}x{} but there are {} row and {} column labels",
                counts.nrows(),
                counts.ncols(),
                row_labels.len(),
                col_labels.len()
            )));
        }
        if counts.iter().any(|&c| c < 0.0 || !c.is_finite()) {
            return Err(RiskStatsError::DegenerateTable(
                "counts must be finite and non-negative".to_string(),
            ));
        }
        Ok(Self {
            row_labels,
            col_labels,
            counts,
        })
    }

    /// Cross-tabulate observed (row, column) pairs. Labels are sorted.
    pub fn from_pairs<I, R, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (R, C)>,
        R: Into<String>,
        C: Into<String>,
    {
        let mut cells: BTreeMap<(String, String), usize> = BTreeMap::new();
        let mut rows: BTreeMap<String, usize> = BTreeMap::new();
        let mut cols: BTreeMap<String, usize> = BTreeMap::new();
        for (r, c) in pairs {
            let (r, c) = (r.into(), c.into());
            rows.entry(r.clone()).or_insert(0);
            cols.entry(c.clone()).or_insert(0);
            *cells.entry((r, c)).or_insert(0) += 1;
        }

        // Assign dense indices in sorted label order
        for (i, v) in rows.values_mut().enumerate() {
            *v = i;
        }
        for (j, v) in cols.values_mut().enumerate() {
            *v = j;
        }

        let mut counts = Array2::zeros((rows.len(), cols.len()));
        for ((r, c), n) in &cells {
            counts[[rows[r], cols[c]]] = *n as f64;
        }

        Self {
            row_labels: rows.into_keys().collect(),
            col_labels: cols.into_keys().collect(),
            counts,
        }
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[String] {
        &self.col_labels
    }

    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    pub fn row_totals(&self) -> Array1<f64> {
        self.counts.sum_axis(ndarray::Axis(1))
    }

    pub fn col_totals(&self) -> Array1<f64> {
        self.counts.sum_axis(ndarray::Axis(0))
    }

    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    /// Expected counts under independence.
    pub fn expected(&self) -> Array2<f64> {
        let rows = self.row_totals();
        let cols = self.col_totals();
        let total = self.total();
        Array2::from_shape_fn(self.counts.dim(), |(i, j)| rows[i] * cols[j] / total)
    }
}

/// Pearson chi-squared test of independence.
///
/// The decision uses the default significance level; call
/// [`TestResult::with_alpha`] to apply another one.
///
/// # Errors
/// `DegenerateTable` if the table has fewer than two rows or columns, or any
/// row or column sums to zero (expected frequencies would be undefined).
pub fn chi_squared_independence(table: &ContingencyTable) -> Result<TestResult> {
    let (n_rows, n_cols) = table.counts.dim();
    if n_rows < 2 || n_cols < 2 {
        return Err(RiskStatsError::DegenerateTable(format!(
            "need at least 2 rows and 2 columns, got {}x{}",
            n_rows, n_cols
        )));
    }

    let row_totals = table.row_totals();
    let col_totals = table.col_totals();
    if let Some(i) = row_totals.iter().position(|&t| t == 0.0) {
        return Err(RiskStatsError::DegenerateTable(format!(
            "row '{}' has zero total",
            table.row_labels[i]
        )));
    }
    if let Some(j) = col_totals.iter().position(|&t| t == 0.0) {
        return Err(RiskStatsError::DegenerateTable(format!(
            "column '{}' has zero total",
            table.col_labels[j]
        )));
    }

    let expected = table.expected();
    let statistic: f64 = table
        .counts
        .iter()
        .zip(expected.iter())
        .map(|(&o, &e)| (o - e) * (o - e) / e)
        .sum();

    let df = (n_rows - 1) * (n_cols - 1);
    let p_value = pvalue_chi2(statistic, df as f64);

    Ok(TestResult::new(
        TestKind::ChiSquaredIndependence,
        statistic,
        DegreesOfFreedom::Single(df),
        p_value,
        SIGNIFICANCE_LEVEL,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_proportional_rows_show_no_association() {
        // Every row has the same 30/70 split
        let counts = array![[30.0, 70.0], [60.0, 140.0], [300.0, 700.0]];
        let table =
            ContingencyTable::new(labels(&["a", "b", "c"]), labels(&["0", "1"]), counts).unwrap();
        let result = chi_squared_independence(&table).unwrap();

        assert_abs_diff_eq!(result.statistic, 0.0, epsilon = 1e-9);
        assert_eq!(result.df, DegreesOfFreedom::Single(2));
        assert_abs_diff_eq!(result.p_value, 1.0, epsilon = 1e-9);
        assert!(!result.is_significant());
    }

    #[test]
    fn test_known_2x2_statistic() {
        // A: 8 claimed / 2 not, B: 1 claimed / 9 not
        let table = ContingencyTable::from_pairs(
            std::iter::repeat(("A", "1")).take(8)
                .chain(std::iter::repeat(("A", "0")).take(2))
                .chain(std::iter::repeat(("B", "1")).take(1))
                .chain(std::iter::repeat(("B", "0")).take(9)),
        );
        assert_eq!(table.row_labels(), &["A".to_string(), "B".to_string()]);
        assert_eq!(table.col_labels(), &["0".to_string(), "1".to_string()]);

        let result = chi_squared_independence(&table).unwrap();
        // 2 × (3.5²/4.5 + 3.5²/5.5)
        let expected_stat = 2.0 * (12.25 / 4.5 + 12.25 / 5.5);
        assert_abs_diff_eq!(result.statistic, expected_stat, epsilon = 1e-10);
        assert!(result.p_value < 0.01);
        assert!(result.is_significant());
    }

    #[test]
    fn test_zero_total_column_is_degenerate() {
        let counts = array![[5.0, 0.0], [7.0, 0.0]];
        let table =
            ContingencyTable::new(labels(&["a", "b"]), labels(&["0", "1"]), counts).unwrap();
        assert!(matches!(
            chi_squared_independence(&table),
            Err(RiskStatsError::DegenerateTable(_))
        ));
    }

    #[test]
    fn test_single_column_is_degenerate() {
        let table = ContingencyTable::from_pairs(vec![("a", "0"), ("b", "0")]);
        assert!(matches!(
            chi_squared_independence(&table),
            Err(RiskStatsError::DegenerateTable(_))
        ));
    }

    #[test]
    fn test_label_mismatch() {
        let counts = array![[1.0, 2.0]];
        assert!(matches!(
            ContingencyTable::new(labels(&["a", "b"]), labels(&["0", "1"]), counts),
            Err(RiskStatsError::DimensionMismatch(_))
        ));
    }
}
