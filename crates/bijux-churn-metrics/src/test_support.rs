// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::{
    month_name, ActiveBaseSnapshot, BacklogOrigin, BacklogSnapshot, ChurnEvent, FactTables,
    Segment, SourceTable, YearMonth,
};
use chrono::NaiveDate;

pub(crate) fn event(year: i32, month: u8, segment: Segment, churn_type: &str) -> ChurnEvent {
    ChurnEvent {
        order_created: None,
        uninstalled: NaiveDate::from_ymd_opt(year, u32::from(month), 15).expect("date"),
        status: "Concluído".to_string(),
        legal_form: segment.as_str().to_string(),
        segment,
        churn_type: churn_type.to_string(),
        reason_category: None,
        branch: None,
        year,
        month,
        month_name: month_name(month).unwrap_or_default().to_string(),
        year_month: YearMonth { year, month }.key(),
        volume: 1,
    }
}

pub(crate) fn events(year: i32, month: u8, count: usize) -> Vec<ChurnEvent> {
    (0..count)
        .map(|_| event(year, month, Segment::Pf, "Voluntário"))
        .collect()
}

pub(crate) fn active(year: i32, month: u8, segment: Segment, count: u64) -> ActiveBaseSnapshot {
    ActiveBaseSnapshot {
        snapshot_date: NaiveDate::from_ymd_opt(year, u32::from(month), 1).expect("date"),
        year,
        month,
        month_name: month_name(month).unwrap_or_default().to_string(),
        client_type: segment.as_str().to_string(),
        segment,
        active_count: count,
    }
}

pub(crate) fn backlog(year: i32, month: u8, volume: u64) -> BacklogSnapshot {
    BacklogSnapshot {
        year,
        month,
        month_name: month_name(month).unwrap_or_default().to_string(),
        period_label: month_name(month).unwrap_or_default().to_string(),
        volume,
        origin: BacklogOrigin::Sheet,
    }
}

pub(crate) fn tables(
    churn: Vec<ChurnEvent>,
    active_base: Vec<ActiveBaseSnapshot>,
    backlog_rows: Vec<BacklogSnapshot>,
) -> FactTables {
    FactTables {
        churn,
        active_base: SourceTable::loaded(active_base),
        backlog: SourceTable::loaded(backlog_rows),
    }
}
