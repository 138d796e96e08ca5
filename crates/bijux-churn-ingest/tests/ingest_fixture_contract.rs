// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use bijux_churn_ingest::{
    load_fact_tables, read_churn_sources, IdentifierRule, LoadEventLevel, LoadOptions, LoadStage,
};
use bijux_churn_model::{BacklogOrigin, ReportingYears, Segment, SourceStatus, YearMonth};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn full_options() -> LoadOptions {
    LoadOptions {
        churn_paths: vec![fixture("churn_2024.csv"), fixture("churn_2025.csv")],
        active_base_path: Some(fixture("base_ativa.csv")),
        backlog_path: Some(fixture("backlog.csv")),
        reporting_years: ReportingYears::default(),
    }
}

#[test]
fn yearly_churn_files_concatenate_without_losing_rows() {
    let combined = read_churn_sources(&[fixture("churn_2024.csv"), fixture("churn_2025.csv")])
        .expect("combined churn");
    assert_eq!(combined.rows.len(), 7 + 7);
    assert!(combined.source.contains(" + "));
}

#[test]
fn full_load_produces_all_three_tables() {
    let facts = load_fact_tables(&full_options()).expect("load");

    let churn = &facts.tables.churn;
    assert_eq!(churn.len(), 10);
    assert_eq!(facts.quality.churn.raw_rows, 14);
    assert_eq!(facts.quality.churn.kept_rows, 10);
    assert_eq!(facts.quality.churn.dropped.get("status_not_completed"), Some(&2));
    assert_eq!(facts.quality.churn.dropped.get("churn_type_disregarded"), Some(&1));
    assert_eq!(facts.quality.churn.dropped.get("missing_uninstall_date"), Some(&1));

    let day_first = &churn[4];
    assert_eq!(day_first.period(), YearMonth { year: 2025, month: 1 });
    assert_eq!(day_first.year_month, "2025-01");
    assert_eq!(day_first.month_name, "Janeiro");
    assert!(churn
        .iter()
        .any(|e| e.legal_form == "X9" && e.segment == Segment::Outros));
    assert!(churn.iter().all(|e| e.volume == 1));

    assert!(facts.tables.active_base.is_loaded());
    assert_eq!(facts.tables.active_base.rows.len(), 7);
    assert_eq!(facts.quality.active_base.dropped_total(), 2);

    assert!(facts.tables.backlog.is_loaded());
    assert!(!facts.backlog_fallback_synthesized);
    let identifier = facts.backlog_identifier.expect("identifier column");
    assert_eq!(identifier.rule, IdentifierRule::HeaderContainsBacklog);
    let volumes = facts
        .tables
        .backlog
        .rows
        .iter()
        .map(|r| (r.year, r.month, r.volume))
        .collect::<Vec<_>>();
    assert_eq!(volumes, vec![(2024, 12, 1500), (2025, 1, 1520), (2025, 2, 1490)]);
}

#[test]
fn load_events_cover_every_stage_in_order() {
    let events = load_fact_tables(&full_options()).expect("load").events;
    let stages = events.iter().map(|e| e.stage).collect::<Vec<_>>();
    assert_eq!(stages.first(), Some(&LoadStage::Prepare));
    assert_eq!(stages.last(), Some(&LoadStage::Finalize));
    assert!(stages.contains(&LoadStage::Read));
    assert!(stages.contains(&LoadStage::Normalize));
    assert!(events.iter().all(|e| e.level == LoadEventLevel::Info));
}

#[test]
fn unnamed_identifier_column_still_reconciles_and_synthesizes_prior_december() {
    let opts = LoadOptions {
        backlog_path: Some(fixture("backlog_unnamed_identifier.csv")),
        ..full_options()
    };
    let facts = load_fact_tables(&opts).expect("load");
    assert!(facts.tables.backlog.is_loaded());
    assert!(facts.backlog_fallback_synthesized);
    assert_eq!(
        facts.backlog_identifier.map(|c| c.rule),
        Some(IdentifierRule::UnnamedFirstColumn)
    );
    let december = facts
        .tables
        .backlog
        .rows
        .iter()
        .find(|r| r.year == 2024 && r.month == 12)
        .expect("prior december");
    assert_eq!(december.volume, 1645);
    assert_eq!(december.origin, BacklogOrigin::Fallback);
}

#[test]
fn custom_reporting_years_shift_backlog_periods() {
    let opts = LoadOptions {
        backlog_path: Some(fixture("backlog_unnamed_identifier.csv")),
        reporting_years: ReportingYears::new(2026, 2025).expect("years"),
        ..full_options()
    };
    let facts = load_fact_tables(&opts).expect("load");
    let periods = facts
        .tables
        .backlog
        .rows
        .iter()
        .map(|r| r.period())
        .collect::<Vec<_>>();
    assert!(periods.contains(&YearMonth { year: 2026, month: 1 }));
    assert!(periods.contains(&YearMonth { year: 2025, month: 12 }));
    assert!(matches!(facts.tables.backlog.status, SourceStatus::Loaded));
}
