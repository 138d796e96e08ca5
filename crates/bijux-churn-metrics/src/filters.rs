// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::{ChurnEvent, ReportingYears, Segment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::metrics_error::MetricsError;

/// One filter dimension: everything observed, or an explicit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "values", rename_all = "snake_case")]
pub enum Selection<T: Ord> {
    All,
    Only(BTreeSet<T>),
}

impl<T: Ord> Default for Selection<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: Ord + Clone> Selection<T> {
    pub fn only(values: impl IntoIterator<Item = T>) -> Self {
        Self::Only(values.into_iter().collect())
    }

    fn resolve(
        &self,
        dimension: &str,
        observed: impl FnOnce() -> BTreeSet<T>,
    ) -> Result<BTreeSet<T>, MetricsError> {
        match self {
            Self::All => Ok(observed()),
            Self::Only(values) if values.is_empty() => Err(MetricsError::validation(format!(
                "{dimension} selection is empty; select at least one value or all"
            ))),
            Self::Only(values) => Ok(values.clone()),
        }
    }
}

/// Immutable user selection passed into every metrics call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSelection {
    #[serde(default)]
    pub years: Selection<i32>,
    #[serde(default)]
    pub months: Selection<u8>,
    #[serde(default)]
    pub segments: Selection<Segment>,
    #[serde(default)]
    pub churn_types: Selection<String>,
}

impl FilterSelection {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }
}

/// A selection with every `All` expanded against the unfiltered churn facts.
/// Months iterate in calendar order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedFilter {
    pub years: BTreeSet<i32>,
    pub months: BTreeSet<u8>,
    pub segments: BTreeSet<Segment>,
    pub churn_types: BTreeSet<String>,
}

impl ResolvedFilter {
    /// Month, segment and churn-type filters; the year is left to the caller.
    #[must_use]
    pub fn matches_dimensions(&self, event: &ChurnEvent) -> bool {
        self.months.contains(&event.month)
            && self.segments.contains(&event.segment)
            && self.churn_types.contains(&event.churn_type)
    }

    #[must_use]
    pub fn matches(&self, event: &ChurnEvent) -> bool {
        self.years.contains(&event.year) && self.matches_dimensions(event)
    }

    /// Year that operational churn and the annual projection are computed for.
    #[must_use]
    pub fn anchor_year(&self, years: ReportingYears) -> i32 {
        self.years.last().copied().unwrap_or(years.current())
    }
}

pub fn resolve_filter(
    selection: &FilterSelection,
    churn: &[ChurnEvent],
) -> Result<ResolvedFilter, MetricsError> {
    if let Selection::Only(months) = &selection.months {
        if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(MetricsError::validation(format!(
                "month must be within 1..=12, got {bad}"
            )));
        }
    }
    Ok(ResolvedFilter {
        years: selection
            .years
            .resolve("year", || churn.iter().map(|e| e.year).collect())?,
        months: selection
            .months
            .resolve("month", || churn.iter().map(|e| e.month).collect())?,
        segments: selection
            .segments
            .resolve("segment", || churn.iter().map(|e| e.segment).collect())?,
        churn_types: selection.churn_types.resolve("churn type", || {
            churn.iter().map(|e| e.churn_type.clone()).collect()
        })?,
    })
}
