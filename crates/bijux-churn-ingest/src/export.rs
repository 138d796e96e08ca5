// SPDX-License-Identifier: Apache-2.0

//! Consolidated churn export for downstream BI tools.

use bijux_churn_core::canonical;
use bijux_churn_model::ChurnEvent;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::IngestError;

pub const EXPORT_SCHEMA_VERSION: u64 = 1;
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    JsonlZst,
}

impl ExportFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::JsonlZst => "jsonl_zst",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExportRecord {
    schema_version: u64,
    record_id: String,
    year_month: String,
    payload: ChurnEvent,
}

/// Flattened row layout shared by every CSV export.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    order_created: Option<String>,
    uninstalled: String,
    status: &'a str,
    legal_form: &'a str,
    segment: &'a str,
    churn_type: &'a str,
    reason_category: Option<&'a str>,
    branch: Option<&'a str>,
    year: i32,
    month: u8,
    month_name: &'a str,
    year_month: &'a str,
    volume: u32,
}

impl<'a> From<&'a ChurnEvent> for CsvRow<'a> {
    fn from(e: &'a ChurnEvent) -> Self {
        Self {
            order_created: e.order_created.map(|d| d.to_string()),
            uninstalled: e.uninstalled.to_string(),
            status: &e.status,
            legal_form: &e.legal_form,
            segment: e.segment.as_str(),
            churn_type: &e.churn_type,
            reason_category: e.reason_category.as_deref(),
            branch: e.branch.as_deref(),
            year: e.year,
            month: e.month,
            month_name: &e.month_name,
            year_month: &e.year_month,
            volume: e.volume,
        }
    }
}

/// Writes churn facts in load order and returns the number of rows written.
pub fn write_churn_export(
    out_path: &Path,
    events: &[ChurnEvent],
    format: ExportFormat,
) -> Result<u64, IngestError> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IngestError(e.to_string()))?;
    }
    match format {
        ExportFormat::Csv => write_csv(out_path, events),
        ExportFormat::JsonlZst => write_jsonl_zst(out_path, events),
    }?;
    tracing::info!(
        path = %out_path.display(),
        format = format.as_str(),
        rows = events.len(),
        "churn export written"
    );
    Ok(events.len() as u64)
}

fn write_csv(out_path: &Path, events: &[ChurnEvent]) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_path(out_path).map_err(|e| IngestError(e.to_string()))?;
    for event in events {
        writer
            .serialize(CsvRow::from(event))
            .map_err(|e| IngestError(e.to_string()))?;
    }
    writer.flush().map_err(|e| IngestError(e.to_string()))
}

fn write_jsonl_zst(out_path: &Path, events: &[ChurnEvent]) -> Result<(), IngestError> {
    let file = fs::File::create(out_path).map_err(|e| IngestError(e.to_string()))?;
    let mut encoder = zstd::stream::write::Encoder::new(file, ZSTD_LEVEL)
        .map_err(|e| IngestError(e.to_string()))?;
    for (idx, event) in events.iter().enumerate() {
        let record = ExportRecord {
            schema_version: EXPORT_SCHEMA_VERSION,
            record_id: format!("churn:{idx:06}"),
            year_month: event.year_month.clone(),
            payload: event.clone(),
        };
        let mut line =
            canonical::canonical_json_bytes(&record).map_err(|e| IngestError(e.to_string()))?;
        line.push(b'\n');
        encoder
            .write_all(&line)
            .map_err(|e| IngestError(e.to_string()))?;
    }
    encoder.finish().map_err(|e| IngestError(e.to_string()))?;
    Ok(())
}

/// Re-reads a compressed export and counts its records per `YYYY-MM`.
pub fn replay_export_counts(
    path: &Path,
) -> Result<std::collections::BTreeMap<String, u64>, IngestError> {
    let file = fs::File::open(path).map_err(|e| IngestError(e.to_string()))?;
    let decoder = zstd::stream::read::Decoder::new(file).map_err(|e| IngestError(e.to_string()))?;
    let reader = BufReader::new(decoder);
    let mut counts = std::collections::BTreeMap::new();
    for line in reader.lines() {
        let line = line.map_err(|e| IngestError(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: ExportRecord =
            serde_json::from_str(&line).map_err(|e| IngestError(e.to_string()))?;
        if rec.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(IngestError(format!(
                "export schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, rec.schema_version
            )));
        }
        *counts.entry(rec.year_month).or_insert(0) += 1;
    }
    Ok(counts)
}
