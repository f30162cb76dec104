//! Column schema of the policy dataset.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The columns a policy record carries, named as in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    PolicyId,
    TotalPremium,
    TotalClaims,
    PostalCode,
    Province,
    Gender,
    TransactionMonth,
    Make,
    CustomValueEstimate,
}

/// How a column may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Identifier,
    Numeric,
    Categorical,
    Temporal,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::PolicyId,
        Column::TotalPremium,
        Column::TotalClaims,
        Column::PostalCode,
        Column::Province,
        Column::Gender,
        Column::TransactionMonth,
        Column::Make,
        Column::CustomValueEstimate,
    ];

    /// Source column name.
    pub fn name(&self) -> &'static str {
        match self {
            Column::PolicyId => "PolicyID",
            Column::TotalPremium => "TotalPremium",
            Column::TotalClaims => "TotalClaims",
            Column::PostalCode => "PostalCode",
            Column::Province => "Province",
            Column::Gender => "Gender",
            Column::TransactionMonth => "TransactionMonth",
            Column::Make => "make",
            Column::CustomValueEstimate => "CustomValueEstimate",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::PolicyId => ColumnKind::Identifier,
            Column::TotalPremium | Column::TotalClaims | Column::CustomValueEstimate => {
                ColumnKind::Numeric
            }
            Column::PostalCode | Column::Province | Column::Gender | Column::Make => {
                ColumnKind::Categorical
            }
            Column::TransactionMonth => ColumnKind::Temporal,
        }
    }

    /// Look a column up by its source name.
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.name() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A calendar month. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
        assert_eq!(Column::from_name("Region"), None);
    }

    #[test]
    fn test_year_month_from_date() {
        let date = NaiveDate::from_ymd_opt(2014, 11, 1).unwrap();
        let ym = YearMonth::from(date);
        assert_eq!(ym, YearMonth::new(2014, 11));
        assert!(ym < YearMonth::new(2015, 1));
        assert_eq!(ym.to_string(), "2014-11");
    }
}
