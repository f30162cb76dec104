// =============================================================================
// Numeric Constants and Policy Thresholds
// =============================================================================
//
// Values shared across modules. The two *_THRESHOLD_PCT values are business
// policy choices used to phrase descriptive conclusions; they are not
// statistical significance levels.
//
// =============================================================================

/// Added to the premium when computing a per-record loss ratio.
pub const LOSS_RATIO_EPSILON: f64 = 1e-6;

/// Default significance level for all hypothesis tests.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Number of most frequent postal codes used by the postal-code tests.
pub const TOP_POSTAL_CODES: usize = 10;

/// Rows with a per-record loss ratio at or above this are excluded from modelling.
pub const MAX_MODEL_LOSS_RATIO: f64 = 50.0;

/// Share of modelling rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.25;

/// Default seed for the train/test shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Default number of risk drivers returned by the ranking.
pub const DEFAULT_TOP_DRIVERS: usize = 5;

/// Smallest admissible mean (and response, inside the deviance) for the Gamma family.
pub const MU_MIN_POSITIVE: f64 = 1e-10;

/// Columns whose training variance is at or below this are dropped before fitting.
pub const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Policy: outliers are "material" when they move the mean by more than this many percent.
pub const OUTLIER_SKEW_THRESHOLD_PCT: f64 = 5.0;

/// Policy: a monthly trend is a "material change" when frequency or severity
/// moves by more than this many percent between the first and last month.
pub const TREND_CHANGE_THRESHOLD_PCT: f64 = 10.0;

/// Whisker multiplier for IQR outlier fences.
pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;
