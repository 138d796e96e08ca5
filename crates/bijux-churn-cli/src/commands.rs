// SPDX-License-Identifier: Apache-2.0

use crate::config::{resolve_config, SourceOverrides};
use crate::helpers::emit_ok;
use crate::{CliError, OutputMode};
use bijux_churn_core::resolve_bijux_cache_dir;
use bijux_churn_ingest::{
    hash_file, replay_export_counts, write_churn_export, CacheOutcome, ExportFormat, FactCache,
    LoadOptions, LoadedFacts, SourceFingerprint,
};
use bijux_churn_metrics::{compute_metrics, metrics_fingerprint, FilterSelection};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

struct Loaded {
    opts: LoadOptions,
    facts: Arc<LoadedFacts>,
    cache: CacheOutcome,
    config_origin: Option<PathBuf>,
}

fn fact_cache_dir() -> PathBuf {
    resolve_bijux_cache_dir().join("churn")
}

fn load(config_path: Option<&Path>, overrides: &SourceOverrides) -> Result<Loaded, CliError> {
    let resolved = resolve_config(config_path).map_err(CliError::config)?;
    let opts = resolved
        .config
        .load_options(overrides)
        .map_err(CliError::config)?;
    let (facts, cache) = FactCache::with_disk_dir(fact_cache_dir())
        .get_or_load(&opts)
        .map_err(CliError::ingest)?;
    info!(cache = ?cache, "fact tables ready");
    Ok(Loaded {
        opts,
        facts,
        cache,
        config_origin: resolved.origin,
    })
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|e| CliError::internal(e.to_string()))
}

pub(crate) fn run_report(
    config_path: Option<&Path>,
    overrides: &SourceOverrides,
    selection: &FilterSelection,
    out: Option<&Path>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let loaded = load(config_path, overrides)?;
    let report = compute_metrics(
        &loaded.facts.tables,
        selection,
        loaded.opts.reporting_years,
    )
    .map_err(CliError::metrics)?;
    let fingerprint = metrics_fingerprint(&report).map_err(CliError::metrics)?;

    if let Some(out) = out {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CliError::internal(e.to_string()))?;
        }
        let text =
            serde_json::to_string_pretty(&report).map_err(|e| CliError::internal(e.to_string()))?;
        fs::write(out, text).map_err(|e| {
            CliError::internal(format!("failed to write report {}: {e}", out.display()))
        })?;
        info!(out = %out.display(), fingerprint = %fingerprint, "report written");
    }

    emit_ok(
        output_mode,
        json!({
            "command": "report",
            "config": loaded.config_origin,
            "cache": to_value(&loaded.cache)?,
            "fingerprint": fingerprint,
            "sources": {
                "active_base": to_value(&loaded.facts.tables.active_base.status)?,
                "backlog": to_value(&loaded.facts.tables.backlog.status)?,
            },
            "report": to_value(&report)?,
        }),
    )
    .map_err(CliError::internal)
}

fn source_entry(role: &str, path: &Path) -> Result<Value, CliError> {
    Ok(json!({
        "role": role,
        "fingerprint": to_value(&SourceFingerprint::of(path))?,
        "sha256": hash_file(path).ok(),
    }))
}

pub(crate) fn run_inspect(
    config_path: Option<&Path>,
    overrides: &SourceOverrides,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let loaded = load(config_path, overrides)?;
    let tables = &loaded.facts.tables;

    let mut sources = Vec::new();
    for path in &loaded.opts.churn_paths {
        sources.push(source_entry("churn", path)?);
    }
    if let Some(path) = &loaded.opts.active_base_path {
        sources.push(source_entry("active_base", path)?);
    }
    if let Some(path) = &loaded.opts.backlog_path {
        sources.push(source_entry("backlog", path)?);
    }

    let mut churn_per_period = BTreeMap::<String, u64>::new();
    let mut churn_per_segment = BTreeMap::<&str, u64>::new();
    for event in &tables.churn {
        *churn_per_period.entry(event.year_month.clone()).or_default() += 1;
        *churn_per_segment.entry(event.segment.as_str()).or_default() += 1;
    }

    emit_ok(
        output_mode,
        json!({
            "command": "inspect",
            "config": loaded.config_origin,
            "cache": to_value(&loaded.cache)?,
            "reporting_years": to_value(&loaded.opts.reporting_years)?,
            "sources": sources,
            "tables": {
                "churn": {
                    "rows": tables.churn.len(),
                    "per_period": churn_per_period,
                    "per_segment": churn_per_segment,
                },
                "active_base": {
                    "source": to_value(&tables.active_base.status)?,
                    "rows": tables.active_base.rows.len(),
                },
                "backlog": {
                    "source": to_value(&tables.backlog.status)?,
                    "identifier_column": to_value(&loaded.facts.backlog_identifier)?,
                    "fallback_synthesized": loaded.facts.backlog_fallback_synthesized,
                    "rows": to_value(&tables.backlog.rows)?,
                },
            },
            "quality": to_value(&loaded.facts.quality)?,
            "events": to_value(&loaded.facts.events)?,
        }),
    )
    .map_err(CliError::internal)
}

pub(crate) fn run_export(
    config_path: Option<&Path>,
    overrides: &SourceOverrides,
    out: &Path,
    format: ExportFormat,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let loaded = load(config_path, overrides)?;
    let written = write_churn_export(out, &loaded.facts.tables.churn, format)
        .map_err(|e| CliError::internal(e.to_string()))?;

    let replayed = match format {
        ExportFormat::JsonlZst => {
            let counts =
                replay_export_counts(out).map_err(|e| CliError::internal(e.to_string()))?;
            let total: u64 = counts.values().sum();
            if total != written {
                return Err(CliError::internal(format!(
                    "export replay mismatch: wrote {written} records, replayed {total}"
                )));
            }
            Some(counts)
        }
        ExportFormat::Csv => None,
    };

    emit_ok(
        output_mode,
        json!({
            "command": "export",
            "format": format.as_str(),
            "out": out,
            "records": written,
            "replayed_per_period": replayed,
        }),
    )
    .map_err(CliError::internal)
}
