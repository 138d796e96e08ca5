// SPDX-License-Identifier: Apache-2.0

//! Volume KPIs: executed churn, the annual projection and the active-base
//! figures it is divided by.

use bijux_churn_model::{ActiveBaseSnapshot, ChurnEvent, Kpi, ReportingYears, SourceTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::filters::ResolvedFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutedChurn {
    pub year: i32,
    pub volume: u64,
}

/// Executed churn is pinned to the current reporting year; the year
/// selection does not apply to it.
#[must_use]
pub fn executed_churn(
    churn: &[ChurnEvent],
    filter: &ResolvedFilter,
    years: ReportingYears,
) -> ExecutedChurn {
    let year = years.current();
    let volume = churn
        .iter()
        .filter(|e| e.year == year && filter.matches_dimensions(e))
        .map(|e| u64::from(e.volume))
        .sum();
    ExecutedChurn { year, volume }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnualProjection {
    pub year: i32,
    pub accumulated: u64,
    pub months_with_data: u64,
    pub latest_month: Option<u8>,
    pub projected: f64,
}

/// Year-to-date volume averaged over the months that have data, times 12.
#[must_use]
pub fn annual_projection(churn: &[ChurnEvent], filter: &ResolvedFilter, year: i32) -> AnnualProjection {
    let in_year = churn
        .iter()
        .filter(|e| e.year == year && filter.matches(e))
        .collect::<Vec<_>>();
    let latest_month = in_year.iter().map(|e| e.month).max();
    let accumulated = in_year
        .iter()
        .filter(|e| latest_month.is_some_and(|latest| e.month <= latest))
        .map(|e| u64::from(e.volume))
        .sum::<u64>();
    let months_with_data = in_year.iter().map(|e| e.month).collect::<BTreeSet<_>>().len() as u64;
    let projected = if months_with_data == 0 {
        0.0
    } else {
        accumulated as f64 / months_with_data as f64 * 12.0
    };
    AnnualProjection {
        year,
        accumulated,
        months_with_data,
        latest_month,
        projected,
    }
}

/// Active-base rows of `year` inside the selected months and segments.
pub(crate) fn selected_active_rows<'a>(
    active_base: &'a [ActiveBaseSnapshot],
    filter: &'a ResolvedFilter,
    year: i32,
) -> impl Iterator<Item = &'a ActiveBaseSnapshot> + 'a {
    active_base.iter().filter(move |row| {
        row.year == year && filter.months.contains(&row.month) && filter.segments.contains(&row.segment)
    })
}

/// Total active base over the selected months divided by how many of those months have rows.
#[must_use]
pub fn average_monthly_active_base(
    active_base: &SourceTable<ActiveBaseSnapshot>,
    filter: &ResolvedFilter,
    year: i32,
) -> Kpi<f64> {
    if let Some(reason) = active_base.degraded_reason() {
        return Kpi::unavailable(format!("active base unavailable: {reason}"));
    }
    let mut total = 0_u64;
    let mut months = BTreeSet::new();
    for row in selected_active_rows(&active_base.rows, filter, year) {
        total += row.active_count;
        months.insert(row.month);
    }
    if months.is_empty() {
        return Kpi::unavailable(format!("no active base for the selected months of {year}"));
    }
    Kpi::measured(total as f64 / months.len() as f64)
}

#[must_use]
pub fn projected_annual_churn_rate(projection: &AnnualProjection, average_active_base: &Kpi<f64>) -> Kpi<f64> {
    match average_active_base {
        Kpi::Measured { value } if *value > 0.0 => Kpi::measured(projection.projected / value * 100.0),
        Kpi::Measured { .. } => Kpi::unavailable("average active base is zero"),
        Kpi::Unavailable { reason } => Kpi::unavailable(reason.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        annual_projection, average_monthly_active_base, executed_churn, projected_annual_churn_rate,
    };
    use crate::filters::{resolve_filter, FilterSelection, Selection};
    use crate::test_support::{active, event, events};
    use bijux_churn_model::{Kpi, ReportingYears, Segment, SourceTable};

    #[test]
    fn projection_scales_year_to_date_average_to_twelve_months() {
        let mut churn = events(2025, 1, 20);
        churn.extend(events(2025, 2, 30));
        churn.extend(events(2025, 4, 40));
        churn.extend(events(2024, 4, 99));
        let filter = resolve_filter(&FilterSelection::all(), &churn).expect("filter");
        let projection = annual_projection(&churn, &filter, 2025);
        assert_eq!(projection.accumulated, 90);
        assert_eq!(projection.months_with_data, 3);
        assert_eq!(projection.latest_month, Some(4));
        assert!((projection.projected - 360.0).abs() < 1e-9);
    }

    #[test]
    fn projection_without_data_is_zero() {
        let churn = events(2024, 1, 3);
        let filter = resolve_filter(&FilterSelection::all(), &churn).expect("filter");
        let projection = annual_projection(&churn, &filter, 2025);
        assert_eq!(projection.projected, 0.0);
        assert_eq!(projection.latest_month, None);
    }

    #[test]
    fn executed_churn_ignores_year_selection() {
        let mut churn = events(2025, 1, 4);
        churn.extend(events(2024, 1, 7));
        churn.push(event(2025, 1, Segment::Pme, "Voluntário"));
        let selection = FilterSelection {
            years: Selection::only([2024]),
            segments: Selection::only([Segment::Pf]),
            ..FilterSelection::all()
        };
        let filter = resolve_filter(&selection, &churn).expect("filter");
        let executed = executed_churn(&churn, &filter, ReportingYears::default());
        assert_eq!(executed.year, 2025);
        assert_eq!(executed.volume, 4);
    }

    #[test]
    fn average_active_base_uses_months_present_and_selected_segments() {
        let churn = vec![event(2025, 1, Segment::Pf, "V"), event(2025, 2, Segment::Pf, "V")];
        let selection = FilterSelection {
            segments: Selection::only([Segment::Pf]),
            ..FilterSelection::all()
        };
        let filter = resolve_filter(&selection, &churn).expect("filter");
        let table = SourceTable::loaded(vec![
            active(2025, 1, Segment::Pf, 1000),
            active(2025, 1, Segment::Pme, 500),
            active(2025, 2, Segment::Pf, 1200),
            active(2025, 3, Segment::Pf, 9999),
        ]);
        let avg = average_monthly_active_base(&table, &filter, 2025);
        assert_eq!(avg, Kpi::measured(1100.0));

        let projection = annual_projection(&churn, &filter, 2025);
        let rate = projected_annual_churn_rate(&projection, &avg);
        let value = *rate.value().expect("rate");
        assert!((value - 12.0 / 1100.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_active_rows_are_a_measured_zero_average() {
        let churn = events(2025, 1, 5);
        let filter = resolve_filter(&FilterSelection::all(), &churn).expect("filter");
        let table = SourceTable::loaded(vec![active(2025, 1, Segment::Pf, 0)]);
        let avg = average_monthly_active_base(&table, &filter, 2025);
        assert_eq!(avg, Kpi::measured(0.0));
        let rate = projected_annual_churn_rate(&annual_projection(&churn, &filter, 2025), &avg);
        assert!(matches!(rate, Kpi::Unavailable { reason } if reason.contains("zero")));

        let empty = SourceTable::loaded(Vec::new());
        assert!(!average_monthly_active_base(&empty, &filter, 2025).is_measured());
    }

    #[test]
    fn degraded_active_base_makes_rate_unavailable() {
        let churn = events(2025, 1, 5);
        let filter = resolve_filter(&FilterSelection::all(), &churn).expect("filter");
        let table = SourceTable::degraded("base_ativa.xlsx not found", Vec::new());
        let avg = average_monthly_active_base(&table, &filter, 2025);
        assert!(!avg.is_measured());
        let rate = projected_annual_churn_rate(&annual_projection(&churn, &filter, 2025), &avg);
        assert!(matches!(rate, Kpi::Unavailable { reason } if reason.contains("not found")));
    }
}
