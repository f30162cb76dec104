// =============================================================================
// Aggregation
// =============================================================================
//
// Sum-based summaries of the policy dataset, used for reporting and as the
// grouping logic behind the hypothesis tests:
//
//   - segments: loss ratio by segment, value counts, per-segment means
//   - temporal: postal-code month-over-month deltas, portfolio trend
//   - profile:  outlier impact, composition cross-tabs, histograms
//
// Everything here returns plain numeric summaries; rendering them is someone
// else's job.
//
// =============================================================================

mod profile;
mod segments;
mod temporal;

pub use segments::{
    category_counts, loss_ratio_pct, loss_ratio_series, segment_means, segmented_loss_ratio,
    segmented_loss_ratio_by, top_categories, CategoryCount, SegmentAggregate, SegmentMean,
};

pub use temporal::{
    change_correlation, monthly_zip_aggregate, temporal_trend, MonthlySummary, TemporalTrend,
    ZipMonthChange,
};

pub use profile::{
    composition, histogram, outlier_impact, CompositionRow, HistogramBin, OutlierImpact,
};

pub(crate) use profile::quantile_sorted;
