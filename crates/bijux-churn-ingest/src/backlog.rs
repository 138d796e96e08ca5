// SPDX-License-Identifier: Apache-2.0

//! Backlog reconciliation.
//!
//! The backlog sheet is wide: one identifier column plus one column per
//! period. Only the aggregate `Geral` row is kept. Month-name columns belong
//! to the current reporting year; the single `Dez/YY` column is December of
//! the prior year. When no prior-December value survives, the documented
//! fallback total is synthesized so that January can still be compared
//! against it.

use bijux_churn_model::{
    month_from_name, month_name, normalize_label, BacklogOrigin, BacklogSnapshot, ReportingYears,
    SourceTable, YearMonth,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::quality::SourceQuality;
use crate::table::RawTable;

pub const AGGREGATE_ROW_LABEL: &str = "Geral";
pub const IDENTIFIER_HEADER_MARKER: &str = "Backlog";
pub const IDENTIFIER_FALLBACK_HEADER: &str = "Unnamed: 0";

/// Prior-December backlog components used when the sheet does not carry that period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogFallback {
    pub voluntary: u64,
    pub involuntary: u64,
    pub asset_writeoff: u64,
}

impl BacklogFallback {
    #[must_use]
    pub const fn total(self) -> u64 {
        self.voluntary + self.involuntary + self.asset_writeoff
    }
}

pub const PRIOR_DECEMBER_FALLBACK: BacklogFallback = BacklogFallback {
    voluntary: 787,
    involuntary: 858,
    asset_writeoff: 0,
};

pub(crate) const SKIP_UNKNOWN_PERIOD: &str = "unrecognized_period_column";
pub(crate) const DROP_DUPLICATE_PERIOD: &str = "duplicate_period";
pub(crate) const COERCE_NON_NUMERIC: &str = "non_numeric_volume";
pub(crate) const COERCE_NEGATIVE: &str = "negative_volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierRule {
    HeaderContainsBacklog,
    UnnamedFirstColumn,
    FirstColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentifierColumn {
    pub index: usize,
    pub header: String,
    pub rule: IdentifierRule,
}

/// Locates the identifier column: a header mentioning "Backlog", then the
/// unnamed first column, then whatever column comes first.
#[must_use]
pub fn detect_identifier_column(headers: &[String]) -> Option<IdentifierColumn> {
    let marker = normalize_label(IDENTIFIER_HEADER_MARKER);
    let found = headers
        .iter()
        .position(|h| normalize_label(h).contains(&marker))
        .map(|idx| (idx, IdentifierRule::HeaderContainsBacklog))
        .or_else(|| {
            headers
                .iter()
                .position(|h| h == IDENTIFIER_FALLBACK_HEADER)
                .map(|idx| (idx, IdentifierRule::UnnamedFirstColumn))
        })
        .or_else(|| (!headers.is_empty()).then_some((0, IdentifierRule::FirstColumn)));
    found.map(|(index, rule)| IdentifierColumn {
        index,
        header: headers[index].clone(),
        rule,
    })
}

/// Maps a period column label to its (year, month); `None` for labels outside the allow-list.
#[must_use]
pub fn resolve_period_label(label: &str, years: ReportingYears) -> Option<YearMonth> {
    if normalize_label(label) == normalize_label(&years.prior_december_label()) {
        return Some(YearMonth {
            year: years.prior(),
            month: 12,
        });
    }
    month_from_name(label).map(|month| YearMonth {
        year: years.current(),
        month,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogReconciliation {
    pub table: SourceTable<BacklogSnapshot>,
    pub identifier: Option<IdentifierColumn>,
    pub fallback_synthesized: bool,
    pub quality: SourceQuality,
}

/// Reconciles a readable backlog sheet.
#[must_use]
pub fn reconcile_backlog(raw: &RawTable, years: ReportingYears) -> BacklogReconciliation {
    let mut quality = SourceQuality::with_raw_rows(raw.rows.len());
    let Some(identifier) = detect_identifier_column(&raw.headers) else {
        return fallback_only(
            format!("backlog {} has no identifier column", raw.source),
            years,
            quality,
        );
    };

    // Literal label; only surrounding whitespace is ignored.
    let aggregate_rows = (0..raw.rows.len())
        .filter(|row| {
            raw.cell(*row, identifier.index)
                .as_text()
                .is_some_and(|v| v.trim() == AGGREGATE_ROW_LABEL)
        })
        .collect::<Vec<_>>();
    if aggregate_rows.is_empty() {
        let mut out = fallback_only(
            format!(
                "backlog {} has no '{AGGREGATE_ROW_LABEL}' row in column `{}`",
                raw.source, identifier.header
            ),
            years,
            quality,
        );
        out.identifier = Some(identifier);
        return out;
    }

    let mut snapshots = Vec::new();
    for (col, label) in raw.headers.iter().enumerate() {
        if col == identifier.index {
            continue;
        }
        let Some(period) = resolve_period_label(label, years) else {
            quality.coerce(SKIP_UNKNOWN_PERIOD);
            continue;
        };
        for row in &aggregate_rows {
            let volume = match raw.cell(*row, col).as_number() {
                Some(v) if v >= 0.0 => v.trunc() as u64,
                Some(_) => {
                    quality.coerce(COERCE_NEGATIVE);
                    0
                }
                None => {
                    quality.coerce(COERCE_NON_NUMERIC);
                    0
                }
            };
            snapshots.push(BacklogSnapshot {
                year: period.year,
                month: period.month,
                month_name: month_name(period.month).unwrap_or_default().to_string(),
                period_label: label.clone(),
                volume,
                origin: BacklogOrigin::Sheet,
            });
        }
    }

    let fallback_synthesized = ensure_prior_december(&mut snapshots, years);
    let rows = dedupe_periods(snapshots, &mut quality);
    quality.kept_rows = rows.len() as u64;
    BacklogReconciliation {
        table: SourceTable::loaded(rows),
        identifier: Some(identifier),
        fallback_synthesized,
        quality,
    }
}

/// Backlog table for a source that could not be read or interpreted at all.
#[must_use]
pub fn fallback_only(
    reason: impl Into<String>,
    years: ReportingYears,
    mut quality: SourceQuality,
) -> BacklogReconciliation {
    let mut rows = Vec::new();
    let fallback_synthesized = ensure_prior_december(&mut rows, years);
    quality.kept_rows = rows.len() as u64;
    BacklogReconciliation {
        table: SourceTable::degraded(reason, rows),
        identifier: None,
        fallback_synthesized,
        quality,
    }
}

fn ensure_prior_december(rows: &mut Vec<BacklogSnapshot>, years: ReportingYears) -> bool {
    let prior_december = YearMonth {
        year: years.prior(),
        month: 12,
    };
    if rows.iter().any(|r| r.period() == prior_december) {
        return false;
    }
    let name = month_name(12).unwrap_or_default().to_string();
    rows.push(BacklogSnapshot {
        year: prior_december.year,
        month: prior_december.month,
        month_name: name.clone(),
        period_label: name,
        volume: PRIOR_DECEMBER_FALLBACK.total(),
        origin: BacklogOrigin::Fallback,
    });
    true
}

fn dedupe_periods(rows: Vec<BacklogSnapshot>, quality: &mut SourceQuality) -> Vec<BacklogSnapshot> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(row.period()) {
            out.push(row);
        } else {
            quality.drop_row(DROP_DUPLICATE_PERIOD);
        }
    }
    out
}
