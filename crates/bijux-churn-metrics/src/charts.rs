// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::{
    month_abbreviation, month_name, ActiveBaseSnapshot, ChurnEvent, Kpi, SourceTable, YearMonth,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filters::ResolvedFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyVolume {
    pub period: YearMonth,
    pub month_name: String,
    pub churn_volume: u64,
    pub active_base: Option<u64>,
    pub churn_rate_pct: Kpi<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyCategoryVolume {
    pub period: YearMonth,
    pub month_abbreviation: String,
    pub churn_type: String,
    pub volume: u64,
}

/// Filtered churn per (year, month), joined with the active base of the same
/// period and selected segments.
#[must_use]
pub fn monthly_volume(
    churn: &[ChurnEvent],
    active_base: &SourceTable<ActiveBaseSnapshot>,
    filter: &ResolvedFilter,
) -> Vec<MonthlyVolume> {
    let mut churn_by_period = BTreeMap::<YearMonth, u64>::new();
    for event in churn.iter().filter(|e| filter.matches(e)) {
        *churn_by_period.entry(event.period()).or_insert(0) += u64::from(event.volume);
    }
    let mut base_by_period = BTreeMap::<YearMonth, u64>::new();
    if active_base.is_loaded() {
        for row in active_base
            .rows
            .iter()
            .filter(|r| filter.months.contains(&r.month) && filter.segments.contains(&r.segment))
        {
            *base_by_period
                .entry(YearMonth {
                    year: row.year,
                    month: row.month,
                })
                .or_insert(0) += row.active_count;
        }
    }

    churn_by_period
        .into_iter()
        .map(|(period, churn_volume)| {
            let base = base_by_period.get(&period).copied();
            let churn_rate_pct = match (active_base.degraded_reason(), base) {
                (Some(reason), _) => Kpi::unavailable(format!("active base unavailable: {reason}")),
                (None, Some(b)) if b > 0 => Kpi::measured(churn_volume as f64 / b as f64 * 100.0),
                (None, _) => Kpi::unavailable(format!("no active base for {period}")),
            };
            MonthlyVolume {
                period,
                month_name: month_name(period.month).unwrap_or_default().to_string(),
                churn_volume,
                active_base: base,
                churn_rate_pct,
            }
        })
        .collect()
}

/// Filtered churn per (year, month, churn type) for stacked charts.
#[must_use]
pub fn monthly_category_volume(churn: &[ChurnEvent], filter: &ResolvedFilter) -> Vec<MonthlyCategoryVolume> {
    let mut volumes = BTreeMap::<(YearMonth, String), u64>::new();
    for event in churn.iter().filter(|e| filter.matches(e)) {
        *volumes
            .entry((event.period(), event.churn_type.clone()))
            .or_insert(0) += u64::from(event.volume);
    }
    volumes
        .into_iter()
        .map(|((period, churn_type), volume)| MonthlyCategoryVolume {
            period,
            month_abbreviation: month_abbreviation(period.month).unwrap_or_default().to_string(),
            churn_type,
            volume,
        })
        .collect()
}
