// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::{month_name, ChurnEvent, Kpi, ReportingYears};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filters::ResolvedFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyComparison {
    pub month: u8,
    pub month_name: String,
    pub prior_volume: u64,
    pub current_volume: u64,
    /// `current / prior - 1`; absent when the prior month has no volume.
    pub variation_ratio: Option<f64>,
}

/// Prior and current volume for each selected month. Months without rows count as 0.
#[must_use]
pub fn monthly_comparison<F>(
    churn: &[ChurnEvent],
    filter: &ResolvedFilter,
    years: ReportingYears,
    include: F,
) -> Vec<MonthlyComparison>
where
    F: Fn(&ChurnEvent) -> bool,
{
    let mut volumes = filter
        .months
        .iter()
        .map(|m| (*m, (0_u64, 0_u64)))
        .collect::<BTreeMap<_, _>>();
    for event in churn.iter().filter(|e| include(e)) {
        let Some(slot) = volumes.get_mut(&event.month) else {
            continue;
        };
        if event.year == years.prior() {
            slot.0 += u64::from(event.volume);
        } else if event.year == years.current() {
            slot.1 += u64::from(event.volume);
        }
    }
    volumes
        .into_iter()
        .map(|(month, (prior, current))| MonthlyComparison {
            month,
            month_name: month_name(month).unwrap_or_default().to_string(),
            prior_volume: prior,
            current_volume: current,
            variation_ratio: (prior > 0).then(|| current as f64 / prior as f64 - 1.0),
        })
        .collect()
}

/// Year-over-year comparison over the selected months, segments and churn
/// types. The year selection does not apply: it always compares the two
/// reporting years.
#[must_use]
pub fn yoy_comparison(
    churn: &[ChurnEvent],
    filter: &ResolvedFilter,
    years: ReportingYears,
) -> Vec<MonthlyComparison> {
    monthly_comparison(churn, filter, years, |e| filter.matches_dimensions(e))
}

#[must_use]
pub fn yoy_absolute_variation(months: &[MonthlyComparison]) -> i64 {
    months
        .iter()
        .map(|m| m.current_volume as i64 - m.prior_volume as i64)
        .sum()
}

/// Mean of the monthly variations, in percent, over months whose prior
/// volume is positive. Other months are left out of the mean entirely.
#[must_use]
pub fn yoy_average_monthly_variation_pct(months: &[MonthlyComparison]) -> Kpi<f64> {
    let ratios = months
        .iter()
        .filter_map(|m| m.variation_ratio)
        .collect::<Vec<_>>();
    if ratios.is_empty() {
        return Kpi::unavailable("no selected month has prior-year volume");
    }
    Kpi::measured(ratios.iter().sum::<f64>() / ratios.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::{yoy_absolute_variation, yoy_average_monthly_variation_pct, yoy_comparison};
    use crate::filters::{resolve_filter, FilterSelection, Selection};
    use crate::test_support::events;
    use bijux_churn_model::{Kpi, ReportingYears};

    #[test]
    fn average_skips_months_without_prior_volume() {
        let mut churn = events(2025, 1, 10);
        churn.extend(events(2024, 2, 50));
        churn.extend(events(2025, 2, 60));
        let selection = FilterSelection {
            months: Selection::only([1, 2]),
            ..FilterSelection::all()
        };
        let filter = resolve_filter(&selection, &churn).expect("filter");
        let months = yoy_comparison(&churn, &filter, ReportingYears::default());
        assert_eq!(months[0].variation_ratio, None);
        assert_eq!(yoy_absolute_variation(&months), (10 - 0) + (60 - 50));
        let avg = *yoy_average_monthly_variation_pct(&months).value().expect("avg");
        assert!((avg - 20.0).abs() < 1e-9);
    }

    #[test]
    fn year_selection_does_not_narrow_the_comparison() {
        let mut churn = events(2024, 3, 4);
        churn.extend(events(2025, 3, 2));
        let selection = FilterSelection {
            years: Selection::only([2025]),
            ..FilterSelection::all()
        };
        let filter = resolve_filter(&selection, &churn).expect("filter");
        let months = yoy_comparison(&churn, &filter, ReportingYears::default());
        assert_eq!(months[0].prior_volume, 4);
        assert_eq!(yoy_absolute_variation(&months), -2);
        let avg = *yoy_average_monthly_variation_pct(&months).value().expect("avg");
        assert!((avg + 50.0).abs() < 1e-9);
    }

    #[test]
    fn no_prior_volume_anywhere_is_unavailable() {
        let churn = events(2025, 5, 3);
        let filter = resolve_filter(&FilterSelection::all(), &churn).expect("filter");
        let months = yoy_comparison(&churn, &filter, ReportingYears::default());
        assert!(matches!(
            yoy_average_monthly_variation_pct(&months),
            Kpi::Unavailable { .. }
        ));
    }
}
