// SPDX-License-Identifier: Apache-2.0

//! Operational churn: executed churn plus the movement of the pending
//! cancellation backlog.
//!
//! For a month `M` of the anchor year `Y`:
//! `(backlog[Y,M] - backlog[previous(Y,M)]) + executed[Y,M]`.
//! Each selected month looks up its own calendar-previous period, so a
//! non-contiguous selection never pairs a month with an earlier selected
//! one. January reads December of `Y - 1`.
//!
//! Only selected months of `Y` that have data (a backlog row or any churn)
//! are evaluated, so months past the data horizon do not make the whole
//! figure unavailable.

use bijux_churn_model::{BacklogSnapshot, FactTables, Kpi, SourceTable, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filters::ResolvedFilter;
use crate::volume::selected_active_rows;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationalMonth {
    pub period: YearMonth,
    pub previous_period: YearMonth,
    pub backlog: u64,
    pub previous_backlog: u64,
    pub backlog_delta: i64,
    pub executed: u64,
    pub operational: i64,
    pub active_base: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationalChurn {
    pub anchor_year: i32,
    pub months: Vec<OperationalMonth>,
    pub total: i64,
    pub active_base: u64,
    pub rate_pct: Kpi<f64>,
}

fn backlog_index(backlog: &SourceTable<BacklogSnapshot>) -> BTreeMap<YearMonth, u64> {
    let mut index = BTreeMap::new();
    for row in &backlog.rows {
        index.entry(row.period()).or_insert(row.volume);
    }
    index
}

fn signed(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Unavailable when the backlog is degraded, when no selected month has data,
/// or when a month with data lacks a needed backlog period; a missing backlog
/// value is never read as zero.
#[must_use]
pub fn operational_churn(
    tables: &FactTables,
    filter: &ResolvedFilter,
    anchor_year: i32,
) -> Kpi<OperationalChurn> {
    if let Some(reason) = tables.backlog.degraded_reason() {
        return Kpi::unavailable(format!("backlog unavailable: {reason}"));
    }
    if filter.months.is_empty() {
        return Kpi::unavailable("no months selected");
    }
    let backlog = backlog_index(&tables.backlog);

    let has_data = |period: &YearMonth| {
        backlog.contains_key(period) || tables.churn.iter().any(|e| e.period() == *period)
    };

    let mut months = Vec::with_capacity(filter.months.len());
    for &month in &filter.months {
        let period = YearMonth {
            year: anchor_year,
            month,
        };
        if !has_data(&period) {
            continue;
        }
        let Some(previous_period) = period.previous() else {
            return Kpi::unavailable(format!("no calendar month before {period}"));
        };
        let Some(&current) = backlog.get(&period) else {
            return Kpi::unavailable(format!("no backlog for {period}"));
        };
        let Some(&previous) = backlog.get(&previous_period) else {
            return Kpi::unavailable(format!("no backlog for {previous_period}"));
        };
        let executed = tables
            .churn
            .iter()
            .filter(|e| e.period() == period && filter.matches(e))
            .map(|e| u64::from(e.volume))
            .sum::<u64>();
        let active_base = selected_active_rows(&tables.active_base.rows, filter, anchor_year)
            .filter(|row| row.month == month)
            .map(|row| row.active_count)
            .sum::<u64>();
        let backlog_delta = signed(current) - signed(previous);
        months.push(OperationalMonth {
            period,
            previous_period,
            backlog: current,
            previous_backlog: previous,
            backlog_delta,
            executed,
            operational: backlog_delta + signed(executed),
            active_base,
        });
    }

    if months.is_empty() {
        return Kpi::unavailable(format!("no data for the selected months of {anchor_year}"));
    }
    let total = months.iter().map(|m| m.operational).sum::<i64>();
    let active_base = months.iter().map(|m| m.active_base).sum::<u64>();
    let rate_pct = if let Some(reason) = tables.active_base.degraded_reason() {
        Kpi::unavailable(format!("active base unavailable: {reason}"))
    } else if active_base == 0 {
        Kpi::unavailable(format!("no active base for the selected months of {anchor_year}"))
    } else {
        Kpi::measured(total as f64 / active_base as f64 * 100.0)
    };
    Kpi::measured(OperationalChurn {
        anchor_year,
        months,
        total,
        active_base,
        rate_pct,
    })
}
