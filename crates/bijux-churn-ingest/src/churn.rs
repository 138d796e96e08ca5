// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::{
    classify, month_name, normalize_label, ChurnEvent, YearMonth, CHURN_EVENT_UNIT_VOLUME,
};
use chrono::Datelike;
use std::path::PathBuf;

use crate::quality::SourceQuality;
use crate::table::{read_table, RawTable};
use crate::IngestError;

pub const COL_ORDER_CREATED: &str = "Datacriacaoos";
pub const COL_ORDER_STATUS: &str = "Statusos";
pub const COL_UNINSTALL_DATE: &str = "DATADESINSTALACAO";
pub const COL_LEGAL_FORM: &str = "Formajuridica";
pub const COL_CHURN_TYPE: &str = "tipoChurn";
pub const COL_BRANCH: &str = "Filialos";
pub const COL_REASON_CATEGORY: &str = "Categoria4";

/// Substring (case-insensitive) that marks a completed order status.
pub const COMPLETED_STATUS_MARKER: &str = "concluído";
/// Churn-type (and reason) value that removes a row from every analysis.
pub const DISREGARD_SENTINEL: &str = "desconsiderar";

pub(crate) const DROP_NOT_COMPLETED: &str = "status_not_completed";
pub(crate) const DROP_DISREGARDED: &str = "churn_type_disregarded";
pub(crate) const DROP_MISSING_UNINSTALL_DATE: &str = "missing_uninstall_date";

/// Reads every yearly churn file and stacks them in the given order.
/// The yearly files must share one header layout.
pub fn read_churn_sources(paths: &[PathBuf]) -> Result<RawTable, IngestError> {
    if paths.is_empty() {
        return Err(IngestError(
            "at least one churn source is required".to_string(),
        ));
    }
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        let table = read_table(path)
            .map_err(|e| IngestError(format!("churn source unreadable: {}", e.0)))?;
        tables.push(table);
    }
    concat_tables(tables)
}

pub fn concat_tables(tables: Vec<RawTable>) -> Result<RawTable, IngestError> {
    let mut iter = tables.into_iter();
    let Some(mut combined) = iter.next() else {
        return Err(IngestError("no churn tables to combine".to_string()));
    };
    let expected = combined.normalized_headers();
    let mut sources = vec![combined.source.clone()];
    for table in iter {
        if table.normalized_headers() != expected {
            return Err(IngestError(format!(
                "churn source {} header mismatch: expected [{}], found [{}]",
                table.source,
                combined.headers.join(", "),
                table.headers.join(", ")
            )));
        }
        sources.push(table.source);
        combined.rows.extend(table.rows);
    }
    combined.source = sources.join(" + ");
    Ok(combined)
}

struct ChurnColumns {
    order_created: Option<usize>,
    status: usize,
    uninstalled: usize,
    legal_form: Option<usize>,
    churn_type: Option<usize>,
    branch: Option<usize>,
    reason_category: Option<usize>,
}

impl ChurnColumns {
    fn resolve(table: &RawTable) -> Result<Self, IngestError> {
        let required = |name: &str| {
            table.column(name).ok_or_else(|| {
                IngestError(format!(
                    "churn source {} is missing required column `{name}`",
                    table.source
                ))
            })
        };
        Ok(Self {
            order_created: table.column(COL_ORDER_CREATED),
            status: required(COL_ORDER_STATUS)?,
            uninstalled: required(COL_UNINSTALL_DATE)?,
            legal_form: table.column(COL_LEGAL_FORM),
            churn_type: table.column(COL_CHURN_TYPE),
            branch: table.column(COL_BRANCH),
            reason_category: table.column(COL_REASON_CATEGORY),
        })
    }
}

/// Turns the stacked churn log into churn facts: completed orders only,
/// disregarded churn types removed, rows without an uninstall date dropped.
pub fn build_churn_facts(table: &RawTable) -> Result<(Vec<ChurnEvent>, SourceQuality), IngestError> {
    let cols = ChurnColumns::resolve(table)?;
    let mut quality = SourceQuality::with_raw_rows(table.rows.len());
    let mut events = Vec::new();

    for row in 0..table.rows.len() {
        let text = |col: Option<usize>| col.and_then(|c| table.cell(row, c).as_text());

        let status = text(Some(cols.status)).unwrap_or_default();
        if !normalize_label(&status).contains(COMPLETED_STATUS_MARKER) {
            quality.drop_row(DROP_NOT_COMPLETED);
            continue;
        }

        let churn_type = text(cols.churn_type).unwrap_or_default();
        if normalize_label(&churn_type) == DISREGARD_SENTINEL {
            quality.drop_row(DROP_DISREGARDED);
            continue;
        }

        let Some(uninstalled) = table.cell(row, cols.uninstalled).as_date() else {
            quality.drop_row(DROP_MISSING_UNINSTALL_DATE);
            continue;
        };

        let legal_form = text(cols.legal_form);
        let segment = classify(legal_form.as_deref());
        let year = uninstalled.year();
        let month = uninstalled.month() as u8;
        let period = YearMonth { year, month };

        events.push(ChurnEvent {
            order_created: cols
                .order_created
                .and_then(|c| table.cell(row, c).as_date()),
            uninstalled,
            status,
            legal_form: legal_form.unwrap_or_default(),
            segment,
            churn_type,
            reason_category: text(cols.reason_category),
            branch: text(cols.branch),
            year,
            month,
            month_name: month_name(month).unwrap_or_default().to_string(),
            year_month: period.key(),
            volume: CHURN_EVENT_UNIT_VOLUME,
        });
        quality.keep_row();
    }

    Ok((events, quality))
}

#[cfg(test)]
mod tests {
    use super::{build_churn_facts, concat_tables, DROP_DISREGARDED, DROP_NOT_COMPLETED};
    use crate::table::{Cell, RawTable};
    use bijux_churn_model::Segment;

    fn text(v: &str) -> Cell {
        if v.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(v.to_string())
        }
    }

    fn churn_table(source: &str, rows: &[[&str; 4]]) -> RawTable {
        RawTable::new(
            source,
            vec![
                "Statusos".into(),
                "DATADESINSTALACAO".into(),
                "Formajuridica".into(),
                "tipoChurn".into(),
            ],
            rows.iter()
                .map(|r| r.iter().map(|v| text(v)).collect())
                .collect(),
        )
    }

    #[test]
    fn only_completed_non_disregarded_dated_rows_survive() {
        let table = churn_table(
            "churn.csv",
            &[
                ["Concluído", "2025-01-10", "P1", "Voluntário"],
                ["CONCLUÍDO com pendência", "2025-02-03", "", "Involuntário"],
                ["Cancelado", "2025-01-11", "C1", "Voluntário"],
                ["Concluído", "2025-01-12", "C1", " desconsiderar "],
                ["Concluído", "", "PF", "Voluntário"],
            ],
        );
        let (events, quality) = build_churn_facts(&table).expect("facts");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].segment, Segment::Pme);
        assert_eq!(events[0].month_name, "Janeiro");
        assert_eq!(events[0].year_month, "2025-01");
        assert_eq!(events[1].segment, Segment::Pf);
        assert_eq!(events[1].month, 2);
        assert_eq!(quality.raw_rows, 5);
        assert_eq!(quality.kept_rows, 2);
        assert_eq!(quality.dropped.get(DROP_NOT_COMPLETED), Some(&1));
        assert_eq!(quality.dropped.get(DROP_DISREGARDED), Some(&1));
        assert_eq!(quality.dropped_total(), 3);
    }

    #[test]
    fn concatenation_preserves_row_count_and_order() {
        let y2024 = churn_table(
            "churn_2024.csv",
            &[
                ["Concluído", "2024-03-01", "PF", "Voluntário"],
                ["Concluído", "2024-04-01", "PF", "Voluntário"],
            ],
        );
        let y2025 = churn_table("churn_2025.csv", &[["Concluído", "2025-03-01", "PF", "Voluntário"]]);
        let combined = concat_tables(vec![y2024, y2025]).expect("concat");
        assert_eq!(combined.rows.len(), 3);
        assert_eq!(combined.cell(2, 1), &Cell::Text("2025-03-01".into()));
        assert_eq!(combined.source, "churn_2024.csv + churn_2025.csv");
    }

    #[test]
    fn concatenation_rejects_mismatched_headers() {
        let y2024 = churn_table("churn_2024.csv", &[]);
        let y2025 = RawTable::new("churn_2025.csv", vec!["Statusos".into()], Vec::new());
        let err = concat_tables(vec![y2024, y2025]).expect_err("header mismatch");
        assert!(err.0.contains("header mismatch"), "{}", err.0);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let table = RawTable::new("churn.csv", vec!["Statusos".into()], Vec::new());
        let err = build_churn_facts(&table).expect_err("uninstall date column is required");
        assert!(err.0.contains("DATADESINSTALACAO"), "{}", err.0);
    }
}
