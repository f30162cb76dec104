// =============================================================================
// Policy Dataset
// =============================================================================
//
// The in-memory table handed to the engine by the loading collaborator.
//
// The dataset itself is never mutated. Derived columns (Claimed, Margin,
// LossRatio) are computed into a `DerivedView` that borrows the records, so
// every component sees the same underlying rows and none of them can alias a
// half-updated working copy.
//
// =============================================================================

mod column;

pub use column::{Column, ColumnKind, YearMonth};

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::LOSS_RATIO_EPSILON;

/// One policy-period observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    #[serde(rename = "PolicyID")]
    pub policy_id: u64,
    pub total_premium: f64,
    pub total_claims: f64,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub gender: Option<String>,
    pub transaction_month: YearMonth,
    #[serde(rename = "make")]
    pub make: Option<String>,
    pub custom_value_estimate: Option<f64>,
}

impl Record {
    /// Create a record with the financial fields set and every categorical missing.
    pub fn new(policy_id: u64, total_premium: f64, total_claims: f64, month: YearMonth) -> Self {
        Self {
            policy_id,
            total_premium,
            total_claims,
            postal_code: None,
            province: None,
            gender: None,
            transaction_month: month,
            make: None,
            custom_value_estimate: None,
        }
    }

    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = Some(province.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_make(mut self, make: impl Into<String>) -> Self {
        self.make = Some(make.into());
        self
    }

    pub fn with_custom_value_estimate(mut self, value: f64) -> Self {
        self.custom_value_estimate = Some(value);
        self
    }

    /// Value of a categorical column, `None` if missing or not categorical.
    pub fn categorical(&self, column: Column) -> Option<&str> {
        match column {
            Column::PostalCode => self.postal_code.as_deref(),
            Column::Province => self.province.as_deref(),
            Column::Gender => self.gender.as_deref(),
            Column::Make => self.make.as_deref(),
            _ => None,
        }
    }

    /// Value of a numeric column, `None` if missing or not numeric.
    pub fn numeric(&self, column: Column) -> Option<f64> {
        match column {
            Column::TotalPremium => Some(self.total_premium),
            Column::TotalClaims => Some(self.total_claims),
            Column::CustomValueEstimate => self.custom_value_estimate,
            _ => None,
        }
    }

    /// Any column as a grouping key, ordered by the column's own kind.
    /// Missing values yield `None`.
    pub fn group_value(&self, column: Column) -> Option<GroupValue> {
        match column.kind() {
            ColumnKind::Categorical => {
                self.categorical(column).map(|v| GroupValue::Text(v.to_string()))
            }
            ColumnKind::Numeric => {
                self.numeric(column).map(|v| GroupValue::Number(NumericKey::new(v)))
            }
            ColumnKind::Temporal => Some(GroupValue::Month(self.transaction_month)),
            ColumnKind::Identifier => Some(GroupValue::Id(self.policy_id)),
        }
    }

    /// Any column rendered as a grouping label. Missing values yield `None`.
    pub fn group_label(&self, column: Column) -> Option<String> {
        self.group_value(column).map(|v| v.to_string())
    }
}

/// A numeric grouping key with a total order.
///
/// −0.0 is folded into 0.0 so both land in one group. Ordering follows
/// `f64::total_cmp`.
#[derive(Debug, Clone, Copy)]
pub struct NumericKey(f64);

impl NumericKey {
    pub fn new(value: f64) -> Self {
        Self(if value == 0.0 { 0.0 } else { value })
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for NumericKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NumericKey {}

impl PartialOrd for NumericKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumericKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One value of a grouping column.
///
/// Segments are keyed on this rather than on the rendered label, so numeric
/// and month keys sort by value (9 before 100) instead of as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupValue {
    Text(String),
    Number(NumericKey),
    Month(YearMonth),
    Id(u64),
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Text(v) => f.write_str(v),
            GroupValue::Number(v) => write!(f, "{}", v.value()),
            GroupValue::Month(v) => write!(f, "{}", v),
            GroupValue::Id(v) => write!(f, "{}", v),
        }
    }
}

/// Ordered, immutable sequence of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Layer the derived columns over every record.
    pub fn derive(&self) -> DerivedView<'_> {
        DerivedView {
            rows: self.records.iter().map(PolicyRow::new).collect(),
        }
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// =============================================================================
// Derived view
// =============================================================================

/// Per-record quantities that can be aggregated or averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowMetric {
    Claimed,
    Margin,
    LossRatio,
    TotalClaims,
    TotalPremium,
}

/// A record together with its derived columns.
#[derive(Debug, Clone, Copy)]
pub struct PolicyRow<'a> {
    pub record: &'a Record,
    /// 1 if the period had any claim, else 0.
    pub claimed: u8,
    /// Premium minus claims.
    pub margin: f64,
    /// Claims over premium, with `LOSS_RATIO_EPSILON` guarding a zero premium.
    pub loss_ratio: f64,
}

impl<'a> PolicyRow<'a> {
    fn new(record: &'a Record) -> Self {
        Self {
            record,
            claimed: u8::from(record.total_claims > 0.0),
            margin: record.total_premium - record.total_claims,
            loss_ratio: record.total_claims / (record.total_premium + LOSS_RATIO_EPSILON),
        }
    }

    pub fn metric(&self, metric: RowMetric) -> f64 {
        match metric {
            RowMetric::Claimed => f64::from(self.claimed),
            RowMetric::Margin => self.margin,
            RowMetric::LossRatio => self.loss_ratio,
            RowMetric::TotalClaims => self.record.total_claims,
            RowMetric::TotalPremium => self.record.total_premium,
        }
    }
}

/// Read-only view of a dataset (or a subset of it) with derived columns.
#[derive(Debug, Clone, Default)]
pub struct DerivedView<'a> {
    rows: Vec<PolicyRow<'a>>,
}

impl<'a> DerivedView<'a> {
    pub fn rows(&self) -> &[PolicyRow<'a>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Underlying records, in view order.
    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().map(|row| row.record)
    }

    /// A narrower view keeping the rows that satisfy `keep`.
    pub fn filter<F>(&self, mut keep: F) -> DerivedView<'a>
    where
        F: FnMut(&PolicyRow<'a>) -> bool,
    {
        DerivedView {
            rows: self.rows.iter().filter(|row| keep(row)).copied().collect(),
        }
    }

    /// Rows whose categorical `column` takes one of `values`.
    pub fn restrict_to(&self, column: Column, values: &[String]) -> DerivedView<'a> {
        self.filter(|row| {
            row.record
                .categorical(column)
                .is_some_and(|v| values.iter().any(|allowed| allowed == v))
        })
    }
}
