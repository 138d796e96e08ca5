// SPDX-License-Identifier: Apache-2.0

//! Prior-versus-current category tables (segment, cancellation reason, branch).

use bijux_churn_model::{normalize_label, ChurnEvent, ReportingYears};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filters::ResolvedFilter;

/// Category values that never form a breakdown row.
pub const EXCLUDED_CATEGORY_LABELS: [&str; 3] = ["", "nan", "desconsiderar"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownDimension {
    Segment,
    Reason,
    Branch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Variation {
    /// `current / prior - 1`.
    Ratio(f64),
    /// No prior volume but some current volume.
    New,
}

impl Variation {
    #[must_use]
    pub fn between(prior: u64, current: u64) -> Self {
        if prior > 0 {
            Self::Ratio(current as f64 / prior as f64 - 1.0)
        } else if current > 0 {
            Self::New
        } else {
            Self::Ratio(0.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakdownRow {
    pub category: String,
    pub prior_volume: u64,
    pub current_volume: u64,
    pub prior_share_pct: f64,
    pub current_share_pct: f64,
    pub absolute_difference: i64,
    pub variation: Variation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Breakdown {
    pub dimension: BreakdownDimension,
    pub prior_year: i32,
    pub current_year: i32,
    pub prior_total: u64,
    pub current_total: u64,
    pub rows: Vec<BreakdownRow>,
}

fn share_pct(volume: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        volume as f64 / total as f64 * 100.0
    }
}

fn is_excluded(label: &str) -> bool {
    let normalized = normalize_label(label);
    EXCLUDED_CATEGORY_LABELS.contains(&normalized.as_str())
}

/// Outer join of per-category prior and current totals. Rows are ordered by
/// current volume, then prior volume (both descending), then category.
fn build<'a, I, K>(
    dimension: BreakdownDimension,
    events: I,
    years: ReportingYears,
    key: K,
) -> Breakdown
where
    I: Iterator<Item = &'a ChurnEvent>,
    K: Fn(&'a ChurnEvent) -> Option<String>,
{
    let mut volumes = BTreeMap::<String, (u64, u64)>::new();
    for event in events {
        let Some(category) = key(event) else {
            continue;
        };
        let slot = volumes.entry(category).or_insert((0, 0));
        if event.year == years.prior() {
            slot.0 += u64::from(event.volume);
        } else if event.year == years.current() {
            slot.1 += u64::from(event.volume);
        }
    }
    volumes.retain(|_, (prior, current)| *prior > 0 || *current > 0);
    let prior_total = volumes.values().map(|v| v.0).sum::<u64>();
    let current_total = volumes.values().map(|v| v.1).sum::<u64>();
    let mut rows = volumes
        .into_iter()
        .map(|(category, (prior, current))| BreakdownRow {
            category,
            prior_volume: prior,
            current_volume: current,
            prior_share_pct: share_pct(prior, prior_total),
            current_share_pct: share_pct(current, current_total),
            absolute_difference: current as i64 - prior as i64,
            variation: Variation::between(prior, current),
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| {
        b.current_volume
            .cmp(&a.current_volume)
            .then(b.prior_volume.cmp(&a.prior_volume))
            .then(a.category.cmp(&b.category))
    });
    Breakdown {
        dimension,
        prior_year: years.prior(),
        current_year: years.current(),
        prior_total,
        current_total,
        rows,
    }
}

/// Segment table over the selected months, segments and churn types of both
/// reporting years, regardless of the year selection.
#[must_use]
pub fn segment_breakdown(churn: &[ChurnEvent], filter: &ResolvedFilter, years: ReportingYears) -> Breakdown {
    build(
        BreakdownDimension::Segment,
        churn.iter().filter(|e| filter.matches_dimensions(e)),
        years,
        |e| Some(e.segment.as_str().to_string()),
    )
}

#[must_use]
pub fn reason_breakdown(churn: &[ChurnEvent], filter: &ResolvedFilter, years: ReportingYears) -> Breakdown {
    build(
        BreakdownDimension::Reason,
        churn.iter().filter(|e| filter.matches(e)),
        years,
        |e| e.reason_category.clone().filter(|c| !is_excluded(c)),
    )
}

#[must_use]
pub fn branch_breakdown(churn: &[ChurnEvent], filter: &ResolvedFilter, years: ReportingYears) -> Breakdown {
    build(
        BreakdownDimension::Branch,
        churn.iter().filter(|e| filter.matches(e)),
        years,
        |e| e.branch.clone().filter(|c| !is_excluded(c)),
    )
}

#[cfg(test)]
mod tests {
    use super::{branch_breakdown, reason_breakdown, segment_breakdown, Variation};
    use crate::filters::{resolve_filter, FilterSelection};
    use crate::test_support::event;
    use bijux_churn_model::{ChurnEvent, ReportingYears, Segment};

    fn with_reason(mut e: ChurnEvent, reason: &str) -> ChurnEvent {
        e.reason_category = Some(reason.to_string());
        e
    }

    #[test]
    fn variation_rules() {
        assert_eq!(Variation::between(4, 6), Variation::Ratio(0.5));
        assert_eq!(Variation::between(0, 3), Variation::New);
        assert_eq!(Variation::between(0, 0), Variation::Ratio(0.0));
        assert_eq!(Variation::between(2, 0), Variation::Ratio(-1.0));
    }

    #[test]
    fn segment_table_outer_joins_both_years() {
        let churn = vec![
            event(2024, 1, Segment::Pf, "V"),
            event(2024, 1, Segment::Pf, "V"),
            event(2025, 1, Segment::Pf, "V"),
            event(2025, 1, Segment::Corporativo, "V"),
            event(2024, 1, Segment::Pme, "V"),
        ];
        let filter = resolve_filter(&FilterSelection::all(), &churn).expect("filter");
        let table = segment_breakdown(&churn, &filter, ReportingYears::default());
        assert_eq!(table.prior_total, 3);
        assert_eq!(table.current_total, 2);
        let corp = table
            .rows
            .iter()
            .find(|r| r.category == "Corporativo")
            .expect("corporativo");
        assert_eq!(corp.prior_volume, 0);
        assert_eq!(corp.variation, Variation::New);
        let pme = table.rows.iter().find(|r| r.category == "PME").expect("pme");
        assert_eq!(pme.current_volume, 0);
        assert_eq!(pme.absolute_difference, -1);
        let pf = table.rows.iter().find(|r| r.category == "PF").expect("pf");
        assert!((pf.current_share_pct - 50.0).abs() < 1e-9);
        assert_eq!(pf.variation, Variation::Ratio(-0.5));
    }

    #[test]
    fn reason_table_drops_placeholder_categories() {
        let churn = vec![
            with_reason(event(2025, 1, Segment::Pf, "V"), "Preço"),
            with_reason(event(2025, 1, Segment::Pf, "V"), "nan"),
            with_reason(event(2025, 1, Segment::Pf, "V"), " Desconsiderar "),
            with_reason(event(2024, 1, Segment::Pf, "V"), "Preço"),
            event(2025, 1, Segment::Pf, "V"),
        ];
        let filter = resolve_filter(&FilterSelection::all(), &churn).expect("filter");
        let table = reason_breakdown(&churn, &filter, ReportingYears::default());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].category, "Preço");
        assert_eq!(table.rows[0].variation, Variation::Ratio(0.0));
        assert!(branch_breakdown(&churn, &filter, ReportingYears::default())
            .rows
            .is_empty());
    }
}
