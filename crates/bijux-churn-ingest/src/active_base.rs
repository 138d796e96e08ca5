// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::{classify, month_name, ActiveBaseSnapshot};
use chrono::Datelike;

use crate::quality::SourceQuality;
use crate::table::RawTable;

pub const COL_SNAPSHOT_DATE: &str = "Data";
pub const COL_CLIENT_TYPE: &str = "Tipo Cliente";
pub const COL_ACTIVE_COUNT: &str = "Volume Clientes Ativos";

pub(crate) const DROP_INVALID_DATE: &str = "invalid_snapshot_date";
pub(crate) const DROP_INVALID_COUNT: &str = "invalid_active_count";

/// Normalizes the active-base snapshot. A missing column makes the whole
/// source unusable and is returned as the degradation reason.
pub fn build_active_base(
    table: &RawTable,
) -> Result<(Vec<ActiveBaseSnapshot>, SourceQuality), String> {
    let column = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| format!("active base {} is missing column `{name}`", table.source))
    };
    let date_col = column(COL_SNAPSHOT_DATE)?;
    let client_col = column(COL_CLIENT_TYPE)?;
    let count_col = column(COL_ACTIVE_COUNT)?;

    let mut quality = SourceQuality::with_raw_rows(table.rows.len());
    let mut rows = Vec::new();
    for row in 0..table.rows.len() {
        let Some(snapshot_date) = table.cell(row, date_col).as_date() else {
            quality.drop_row(DROP_INVALID_DATE);
            continue;
        };
        let Some(count) = table
            .cell(row, count_col)
            .as_number()
            .filter(|v| *v >= 0.0)
        else {
            quality.drop_row(DROP_INVALID_COUNT);
            continue;
        };
        let client_type = table
            .cell(row, client_col)
            .as_text()
            .map(|raw| raw.replace('\u{a0}', " ").trim().to_string());
        let month = snapshot_date.month() as u8;
        rows.push(ActiveBaseSnapshot {
            snapshot_date,
            year: snapshot_date.year(),
            month,
            month_name: month_name(month).unwrap_or_default().to_string(),
            segment: classify(client_type.as_deref()),
            client_type: client_type.unwrap_or_default(),
            active_count: count.trunc() as u64,
        });
        quality.keep_row();
    }
    Ok((rows, quality))
}

#[cfg(test)]
mod tests {
    use super::{build_active_base, DROP_INVALID_COUNT, DROP_INVALID_DATE};
    use crate::table::{Cell, RawTable};
    use bijux_churn_model::Segment;

    fn table(rows: Vec<[Cell; 3]>) -> RawTable {
        RawTable::new(
            "base_ativa.csv",
            vec![
                "Data".into(),
                "Tipo Cliente".into(),
                "Volume Clientes Ativos".into(),
            ],
            rows.into_iter().map(Vec::from).collect(),
        )
    }

    #[test]
    fn invalid_dates_and_counts_are_row_level_drops() {
        let t = table(vec![
            [
                Cell::Text("2025-01-31".into()),
                Cell::Text("PME\u{a0}".into()),
                Cell::Number(1200.7),
            ],
            [
                Cell::Text("sem data".into()),
                Cell::Text("PF".into()),
                Cell::Number(10.0),
            ],
            [
                Cell::Text("2025-02-28".into()),
                Cell::Text("PF".into()),
                Cell::Text("n/d".into()),
            ],
            [
                Cell::Text("2025-02-28".into()),
                Cell::Text("Corporativo".into()),
                Cell::Number(-3.0),
            ],
        ]);
        let (rows, quality) = build_active_base(&t).expect("active base");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].segment, Segment::Pme);
        assert_eq!(rows[0].client_type, "PME");
        assert_eq!(rows[0].active_count, 1200);
        assert_eq!(rows[0].month_name, "Janeiro");
        assert_eq!(quality.dropped.get(DROP_INVALID_DATE), Some(&1));
        assert_eq!(quality.dropped.get(DROP_INVALID_COUNT), Some(&2));
    }

    #[test]
    fn missing_column_degrades_the_source() {
        let t = RawTable::new("base_ativa.csv", vec!["Data".into()], Vec::new());
        let reason = build_active_base(&t).expect_err("missing columns");
        assert!(reason.contains("Tipo Cliente"), "{reason}");
    }
}
