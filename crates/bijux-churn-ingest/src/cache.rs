// SPDX-License-Identifier: Apache-2.0

//! Memoizes loaded fact tables across metric recomputations.
//!
//! Entries are keyed by the load options (which files, which reporting
//! years). Each entry remembers the fingerprints of its source files and is
//! reloaded as soon as any of them changes size, modification time or
//! presence.
//!
//! With a disk directory attached, loaded facts are also persisted as
//! `facts-<key>.json` so a later process with the same sources skips the
//! spreadsheet parse. Disk problems only cost a reload; they never fail a load.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bijux_churn_core::canonical;
use serde::{Deserialize, Serialize};

use crate::hashing::SourceFingerprint;
use crate::{load_fact_tables, IngestError, LoadOptions, LoadedFacts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    Hit,
    Miss,
    Invalidated,
}

struct CacheEntry {
    fingerprint_key: String,
    facts: Arc<LoadedFacts>,
}

const DISK_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DiskEntry {
    schema_version: u32,
    fingerprint_key: String,
    facts: LoadedFacts,
}

#[derive(Serialize)]
struct DiskEntryRef<'a> {
    schema_version: u32,
    fingerprint_key: &'a str,
    facts: &'a LoadedFacts,
}

#[derive(Default)]
pub struct FactCache {
    entries: BTreeMap<String, CacheEntry>,
    disk_dir: Option<PathBuf>,
}

impl FactCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that also persists entries under `dir`.
    #[must_use]
    pub fn with_disk_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: BTreeMap::new(),
            disk_dir: Some(dir.into()),
        }
    }

    #[must_use]
    pub fn disk_dir(&self) -> Option<&Path> {
        self.disk_dir.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns cached facts when every source is unchanged, loading otherwise.
    /// A failed load leaves no entry behind.
    pub fn get_or_load(
        &mut self,
        opts: &LoadOptions,
    ) -> Result<(Arc<LoadedFacts>, CacheOutcome), IngestError> {
        let identity = identity_key(opts)?;
        let fingerprint_key = fingerprint_key(opts)?;

        let mut outcome = match self.entries.get(&identity) {
            Some(entry) if entry.fingerprint_key == fingerprint_key => {
                tracing::debug!(key = %identity, "fact cache hit");
                return Ok((Arc::clone(&entry.facts), CacheOutcome::Hit));
            }
            Some(_) => CacheOutcome::Invalidated,
            None => CacheOutcome::Miss,
        };
        if outcome == CacheOutcome::Invalidated {
            tracing::info!(key = %identity, "source changed; reloading fact tables");
            self.entries.remove(&identity);
        }

        if let Some(path) = self.disk_path(&identity) {
            match read_disk_entry(&path) {
                Some(entry) if entry.fingerprint_key == fingerprint_key => {
                    tracing::debug!(path = %path.display(), "fact cache disk hit");
                    let facts = Arc::new(entry.facts);
                    self.remember(identity, fingerprint_key, Arc::clone(&facts));
                    return Ok((facts, CacheOutcome::Hit));
                }
                Some(_) => {
                    tracing::info!(path = %path.display(), "persisted facts are stale; reloading");
                    outcome = CacheOutcome::Invalidated;
                }
                None => {}
            }
        }

        let facts = Arc::new(load_fact_tables(opts)?);
        if let Some(path) = self.disk_path(&identity) {
            let entry = DiskEntryRef {
                schema_version: DISK_SCHEMA_VERSION,
                fingerprint_key: &fingerprint_key,
                facts: &facts,
            };
            if let Err(err) = write_disk_entry(&path, &entry) {
                tracing::warn!(path = %path.display(), error = %err, "fact cache not persisted");
            }
        }
        self.remember(identity, fingerprint_key, Arc::clone(&facts));
        Ok((facts, outcome))
    }

    fn disk_path(&self, identity: &str) -> Option<PathBuf> {
        self.disk_dir
            .as_ref()
            .map(|dir| dir.join(format!("facts-{identity}.json")))
    }

    fn remember(&mut self, identity: String, fingerprint_key: String, facts: Arc<LoadedFacts>) {
        self.entries.insert(
            identity,
            CacheEntry {
                fingerprint_key,
                facts,
            },
        );
    }
}

/// Unreadable, corrupt or older-schema files count as absent.
fn read_disk_entry(path: &Path) -> Option<DiskEntry> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice::<DiskEntry>(&bytes) {
        Ok(entry) if entry.schema_version == DISK_SCHEMA_VERSION => Some(entry),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring corrupt fact cache file");
            None
        }
    }
}

fn write_disk_entry(path: &Path, entry: &DiskEntryRef<'_>) -> Result<(), IngestError> {
    let parent = path
        .parent()
        .ok_or_else(|| IngestError("fact cache path has no parent".to_string()))?;
    std::fs::create_dir_all(parent).map_err(|e| IngestError(e.to_string()))?;
    let bytes = serde_json::to_vec(entry).map_err(|e| IngestError(e.to_string()))?;
    let tmp = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("facts"),
        std::process::id()
    ));
    {
        let mut file = std::fs::File::create(&tmp).map_err(|e| IngestError(e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| IngestError(e.to_string()))?;
        file.sync_all().map_err(|e| IngestError(e.to_string()))?;
    }
    std::fs::rename(&tmp, path).map_err(|e| IngestError(e.to_string()))
}

fn source_paths(opts: &LoadOptions) -> Vec<&PathBuf> {
    opts.churn_paths
        .iter()
        .chain(opts.active_base_path.iter())
        .chain(opts.backlog_path.iter())
        .collect()
}

fn identity_key(opts: &LoadOptions) -> Result<String, IngestError> {
    canonical::canonical_digest(opts).map_err(|e| IngestError(e.to_string()))
}

fn fingerprint_key(opts: &LoadOptions) -> Result<String, IngestError> {
    let prints = source_paths(opts)
        .into_iter()
        .map(|p| SourceFingerprint::of(p))
        .collect::<Vec<_>>();
    canonical::canonical_digest(&prints).map_err(|e| IngestError(e.to_string()))
}
