// SPDX-License-Identifier: Apache-2.0

use bijux_churn_core::{resolve_bijux_config_path, ConfigPathScope};
use bijux_churn_ingest::LoadOptions;
use bijux_churn_model::ReportingYears;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// `churn.toml`: where the sources live and which years the report compares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    #[serde(default)]
    pub churn: Vec<PathBuf>,
    pub active_base: Option<PathBuf>,
    pub backlog: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportingConfig {
    pub current_year: Option<i32>,
    pub prior_year: Option<i32>,
}

/// The config that was applied and the file it came from, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config: ReportConfig,
    pub origin: Option<PathBuf>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOverrides {
    pub churn: Vec<PathBuf>,
    pub active_base: Option<PathBuf>,
    pub backlog: Option<PathBuf>,
    pub current_year: Option<i32>,
    pub prior_year: Option<i32>,
}

pub fn parse_config(text: &str) -> Result<ReportConfig, String> {
    toml::from_str(text).map_err(|e| format!("invalid churn config: {e}"))
}

/// Reads a config file; relative source paths are taken from the file's directory.
pub fn read_config(path: &Path) -> Result<ReportConfig, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
    let mut config = parse_config(&text)?;
    if let Some(base) = path.parent() {
        config.sources.churn = config
            .sources
            .churn
            .iter()
            .map(|p| anchor(base, p))
            .collect();
        config.sources.active_base = config.sources.active_base.map(|p| anchor(base, &p));
        config.sources.backlog = config.sources.backlog.map(|p| anchor(base, &p));
    }
    Ok(config)
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// An explicit path must exist; otherwise the workspace file wins over the
/// user file, and no file at all means defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ResolvedConfig, String> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(format!("config file not found: {}", path.display()));
        }
        return Ok(ResolvedConfig {
            config: read_config(path)?,
            origin: Some(path.to_path_buf()),
        });
    }
    for scope in [ConfigPathScope::Workspace, ConfigPathScope::User] {
        let candidate = resolve_bijux_config_path(scope);
        if candidate.is_file() {
            return Ok(ResolvedConfig {
                config: read_config(&candidate)?,
                origin: Some(candidate),
            });
        }
    }
    Ok(ResolvedConfig::default())
}

impl ReportConfig {
    /// Merges command-line overrides into load options. A lone current year
    /// implies the year before it as prior year, and vice versa.
    pub fn load_options(&self, overrides: &SourceOverrides) -> Result<LoadOptions, String> {
        let churn_paths = if overrides.churn.is_empty() {
            self.sources.churn.clone()
        } else {
            overrides.churn.clone()
        };
        if churn_paths.is_empty() {
            return Err(
                "no churn sources given; pass --churn or set [sources] churn in churn.toml"
                    .to_string(),
            );
        }
        let current = overrides.current_year.or(self.reporting.current_year);
        let prior = overrides.prior_year.or(self.reporting.prior_year);
        let defaults = ReportingYears::default();
        let (current, prior) = match (current, prior) {
            (Some(current), Some(prior)) => (current, prior),
            (Some(current), None) => (current, current - 1),
            (None, Some(prior)) => (prior + 1, prior),
            (None, None) => (defaults.current(), defaults.prior()),
        };
        let reporting_years = ReportingYears::new(current, prior).map_err(|e| e.0)?;
        Ok(LoadOptions {
            churn_paths,
            active_base_path: overrides
                .active_base
                .clone()
                .or_else(|| self.sources.active_base.clone()),
            backlog_path: overrides
                .backlog
                .clone()
                .or_else(|| self.sources.backlog.clone()),
            reporting_years,
        })
    }
}
