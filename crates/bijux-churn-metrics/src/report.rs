// SPDX-License-Identifier: Apache-2.0

use bijux_churn_core::canonical;
use bijux_churn_model::{FactTables, Kpi, ReportingYears};
use serde::{Deserialize, Serialize};

use crate::breakdown::{branch_breakdown, reason_breakdown, segment_breakdown, Breakdown};
use crate::charts::{monthly_category_volume, monthly_volume, MonthlyCategoryVolume, MonthlyVolume};
use crate::filters::{resolve_filter, FilterSelection, ResolvedFilter};
use crate::metrics_error::MetricsError;
use crate::operational::{operational_churn, OperationalChurn};
use crate::volume::{
    annual_projection, average_monthly_active_base, executed_churn, projected_annual_churn_rate,
    AnnualProjection, ExecutedChurn,
};
use crate::yoy::{
    monthly_comparison, yoy_absolute_variation, yoy_average_monthly_variation_pct, yoy_comparison,
    MonthlyComparison,
};

pub const METRICS_SCHEMA_VERSION: u64 = 1;

/// Every KPI and chart table for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsReport {
    pub schema_version: u64,
    pub reporting_years: ReportingYears,
    pub filter: ResolvedFilter,
    pub anchor_year: i32,
    pub filtered_churn_volume: u64,
    pub executed_churn: ExecutedChurn,
    pub operational_churn: Kpi<OperationalChurn>,
    pub annual_projection: AnnualProjection,
    pub average_monthly_active_base: Kpi<f64>,
    pub projected_annual_churn_rate_pct: Kpi<f64>,
    pub yoy_absolute_variation: i64,
    pub yoy_average_monthly_variation_pct: Kpi<f64>,
    pub yoy_months: Vec<MonthlyComparison>,
    pub segment_breakdown: Breakdown,
    pub reason_breakdown: Breakdown,
    pub branch_breakdown: Breakdown,
    pub monthly_volume: Vec<MonthlyVolume>,
    pub monthly_volume_yoy: Vec<MonthlyComparison>,
    pub monthly_category_volume: Vec<MonthlyCategoryVolume>,
}

/// Computes the whole report. Pure: the fact tables are only read.
pub fn compute_metrics(
    tables: &FactTables,
    selection: &FilterSelection,
    years: ReportingYears,
) -> Result<MetricsReport, MetricsError> {
    let filter = resolve_filter(selection, &tables.churn)?;
    let anchor_year = filter.anchor_year(years);
    let churn = &tables.churn;

    let filtered_churn_volume = churn
        .iter()
        .filter(|e| filter.matches(e))
        .map(|e| u64::from(e.volume))
        .sum::<u64>();
    let projection = annual_projection(churn, &filter, anchor_year);
    let average_active = average_monthly_active_base(&tables.active_base, &filter, anchor_year);
    let projected_rate = projected_annual_churn_rate(&projection, &average_active);
    let yoy_months = yoy_comparison(churn, &filter, years);

    let report = MetricsReport {
        schema_version: METRICS_SCHEMA_VERSION,
        reporting_years: years,
        anchor_year,
        filtered_churn_volume,
        executed_churn: executed_churn(churn, &filter, years),
        operational_churn: operational_churn(tables, &filter, anchor_year),
        annual_projection: projection,
        average_monthly_active_base: average_active,
        projected_annual_churn_rate_pct: projected_rate,
        yoy_absolute_variation: yoy_absolute_variation(&yoy_months),
        yoy_average_monthly_variation_pct: yoy_average_monthly_variation_pct(&yoy_months),
        yoy_months,
        segment_breakdown: segment_breakdown(churn, &filter, years),
        reason_breakdown: reason_breakdown(churn, &filter, years),
        branch_breakdown: branch_breakdown(churn, &filter, years),
        monthly_volume: monthly_volume(churn, &tables.active_base, &filter),
        monthly_volume_yoy: monthly_comparison(churn, &filter, years, |e| filter.matches(e)),
        monthly_category_volume: monthly_category_volume(churn, &filter),
        filter,
    };
    tracing::debug!(
        anchor_year,
        filtered_churn_volume,
        operational = report.operational_churn.is_measured(),
        "metrics computed"
    );
    Ok(report)
}

/// Canonical-JSON SHA-256 of a report; equal reports hash equal.
pub fn metrics_fingerprint(report: &MetricsReport) -> Result<String, MetricsError> {
    Ok(canonical::canonical_digest(report)?)
}
