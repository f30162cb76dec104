// =============================================================================
// Error Types
// =============================================================================
//
// Every fallible operation in the crate returns `Result<T>`, aliased below.
// All variants are recoverable: a caller running the full analysis can skip a
// single failing test or segment and carry on with the rest of the batch.
//
// =============================================================================

use thiserror::Error;

/// Errors raised by the analysis engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskStatsError {
    /// A column that does not exist was requested as a grouping key.
    #[error("invalid group key: '{0}' is not a column of the policy dataset")]
    InvalidGroupKey(String),

    /// A contingency table has a zero-total row or column, or too few
    /// rows/columns for a test with positive degrees of freedom.
    #[error("degenerate contingency table: {0}")]
    DegenerateTable(String),

    /// ANOVA needs at least two non-empty groups and within-group degrees of freedom.
    #[error("insufficient groups for ANOVA: {0}")]
    InsufficientGroups(String),

    /// IRLS hit its iteration cap without meeting the tolerance.
    #[error("IRLS did not converge after {iterations} iterations (last relative change {last_change:.3e})")]
    NonConvergence { iterations: usize, last_change: f64 },

    /// A feature is missing from the schema or has the wrong kind.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Arrays that must line up do not.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// An operation received no data to work with.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A numeric input is outside the domain an operation accepts.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The weighted least squares system could not be solved.
    #[error("linear algebra error: {0}")]
    LinearAlgebraError(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RiskStatsError>;
