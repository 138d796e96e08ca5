// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod breakdown;
mod charts;
mod filters;
mod metrics_error;
mod operational;
mod report;
#[cfg(test)]
mod test_support;
mod volume;
mod yoy;

pub const CRATE_NAME: &str = "bijux-churn-metrics";

pub use breakdown::{
    branch_breakdown, reason_breakdown, segment_breakdown, Breakdown, BreakdownDimension,
    BreakdownRow, Variation, EXCLUDED_CATEGORY_LABELS,
};
pub use charts::{monthly_category_volume, monthly_volume, MonthlyCategoryVolume, MonthlyVolume};
pub use filters::{resolve_filter, FilterSelection, ResolvedFilter, Selection};
pub use metrics_error::{MetricsError, MetricsErrorCode};
pub use operational::{operational_churn, OperationalChurn, OperationalMonth};
pub use report::{compute_metrics, metrics_fingerprint, MetricsReport, METRICS_SCHEMA_VERSION};
pub use volume::{
    annual_projection, average_monthly_active_base, executed_churn, projected_annual_churn_rate,
    AnnualProjection, ExecutedChurn,
};
pub use yoy::{
    monthly_comparison, yoy_absolute_variation, yoy_average_monthly_variation_pct, yoy_comparison,
    MonthlyComparison,
};
