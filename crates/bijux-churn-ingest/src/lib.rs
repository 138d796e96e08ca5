// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod active_base;
mod backlog;
mod cache;
mod churn;
mod export;
mod hashing;
mod logging;
mod quality;
mod table;

use bijux_churn_model::{ActiveBaseSnapshot, FactTables, ReportingYears, SourceTable};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const CRATE_NAME: &str = "bijux-churn-ingest";

pub use active_base::{build_active_base, COL_ACTIVE_COUNT, COL_CLIENT_TYPE, COL_SNAPSHOT_DATE};
pub use backlog::{
    detect_identifier_column, fallback_only, reconcile_backlog, resolve_period_label,
    BacklogFallback, BacklogReconciliation, IdentifierColumn, IdentifierRule,
    AGGREGATE_ROW_LABEL, IDENTIFIER_FALLBACK_HEADER, PRIOR_DECEMBER_FALLBACK,
};
pub use cache::{CacheOutcome, FactCache};
pub use churn::{
    build_churn_facts, concat_tables, read_churn_sources, COL_BRANCH, COL_CHURN_TYPE,
    COL_LEGAL_FORM, COL_ORDER_CREATED, COL_ORDER_STATUS, COL_REASON_CATEGORY,
    COL_UNINSTALL_DATE, COMPLETED_STATUS_MARKER, DISREGARD_SENTINEL,
};
pub use export::{replay_export_counts, write_churn_export, ExportFormat, EXPORT_SCHEMA_VERSION};
pub use hashing::{hash_file, FileState, SourceFingerprint};
pub use logging::{LoadEvent, LoadEventLevel, LoadLog, LoadStage};
pub use quality::{LoadQualityReport, SourceQuality};
pub use table::{read_table, Cell, RawTable};

#[derive(Debug)]
pub struct IngestError(pub String);
impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for IngestError {}

/// Which files make up one load and which years the backlog sheet speaks of.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadOptions {
    pub churn_paths: Vec<PathBuf>,
    pub active_base_path: Option<PathBuf>,
    pub backlog_path: Option<PathBuf>,
    pub reporting_years: ReportingYears,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedFacts {
    pub tables: FactTables,
    pub quality: LoadQualityReport,
    pub backlog_identifier: Option<IdentifierColumn>,
    pub backlog_fallback_synthesized: bool,
    pub events: Vec<LoadEvent>,
}

/// Runs the full load. Only the churn source can fail it; the active base
/// and backlog degrade instead.
pub fn load_fact_tables(opts: &LoadOptions) -> Result<LoadedFacts, IngestError> {
    let mut log = LoadLog::default();
    log.emit(
        LoadStage::Prepare,
        "load.start",
        logging::fields([
            ("churn_sources", opts.churn_paths.len().to_string()),
            ("current_year", opts.reporting_years.current().to_string()),
            ("prior_year", opts.reporting_years.prior().to_string()),
        ]),
    );

    let raw_churn = read_churn_sources(&opts.churn_paths)?;
    log.emit(
        LoadStage::Read,
        "load.churn.read",
        logging::fields([
            ("source", raw_churn.source.clone()),
            ("rows", raw_churn.rows.len().to_string()),
        ]),
    );
    let (churn, churn_quality) = build_churn_facts(&raw_churn)?;
    if churn.is_empty() {
        return Err(IngestError(format!(
            "no churn events survived filtering in {}",
            raw_churn.source
        )));
    }
    log.emit(
        LoadStage::Normalize,
        "load.churn.normalized",
        logging::fields([
            ("kept", churn_quality.kept_rows.to_string()),
            ("dropped", churn_quality.dropped_total().to_string()),
        ]),
    );

    let (active_base, active_quality) = load_active_base(opts.active_base_path.as_deref());
    match active_base.degraded_reason() {
        Some(reason) => log.warn(
            LoadStage::Normalize,
            "load.active_base.degraded",
            logging::fields([("reason", reason.to_string())]),
        ),
        None => log.emit(
            LoadStage::Normalize,
            "load.active_base.normalized",
            logging::fields([("kept", active_quality.kept_rows.to_string())]),
        ),
    }

    let reconciliation = load_backlog(opts.backlog_path.as_deref(), opts.reporting_years);
    if let Some(reason) = reconciliation.table.degraded_reason() {
        log.warn(
            LoadStage::Reconcile,
            "load.backlog.degraded",
            logging::fields([("reason", reason.to_string())]),
        );
    }
    if reconciliation.fallback_synthesized {
        log.emit(
            LoadStage::Reconcile,
            "load.backlog.prior_december_fallback",
            logging::fields([
                ("period", opts.reporting_years.prior_december_label()),
                ("volume", PRIOR_DECEMBER_FALLBACK.total().to_string()),
            ]),
        );
    }

    let quality = LoadQualityReport {
        churn: churn_quality,
        active_base: active_quality,
        backlog: reconciliation.quality,
    };
    let tables = FactTables {
        churn,
        active_base,
        backlog: reconciliation.table,
    };
    log.emit(
        LoadStage::Finalize,
        "load.complete",
        logging::fields([
            ("churn_events", tables.churn.len().to_string()),
            ("active_base_rows", tables.active_base.rows.len().to_string()),
            ("backlog_rows", tables.backlog.rows.len().to_string()),
        ]),
    );

    Ok(LoadedFacts {
        tables,
        quality,
        backlog_identifier: reconciliation.identifier,
        backlog_fallback_synthesized: reconciliation.fallback_synthesized,
        events: log.into_events(),
    })
}

fn load_active_base(path: Option<&Path>) -> (SourceTable<ActiveBaseSnapshot>, SourceQuality) {
    let Some(path) = path else {
        return (
            SourceTable::degraded("active base source not configured", Vec::new()),
            SourceQuality::default(),
        );
    };
    let raw = match read_table(path) {
        Ok(raw) => raw,
        Err(e) => {
            return (
                SourceTable::degraded(format!("active base unreadable: {e}"), Vec::new()),
                SourceQuality::default(),
            )
        }
    };
    match build_active_base(&raw) {
        Ok((rows, quality)) => (SourceTable::loaded(rows), quality),
        Err(reason) => (
            SourceTable::degraded(reason, Vec::new()),
            SourceQuality::with_raw_rows(raw.rows.len()),
        ),
    }
}

fn load_backlog(path: Option<&Path>, years: ReportingYears) -> BacklogReconciliation {
    let Some(path) = path else {
        return fallback_only("backlog source not configured", years, SourceQuality::default());
    };
    match read_table(path) {
        Ok(raw) => reconcile_backlog(&raw, years),
        Err(e) => fallback_only(
            format!("backlog unreadable: {e}"),
            years,
            SourceQuality::default(),
        ),
    }
}
