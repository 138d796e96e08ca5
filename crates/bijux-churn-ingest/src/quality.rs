// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row accounting for one source: what came in, what survived, and why the rest did not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceQuality {
    pub raw_rows: u64,
    pub kept_rows: u64,
    #[serde(default)]
    pub dropped: BTreeMap<String, u64>,
    #[serde(default)]
    pub coerced: BTreeMap<String, u64>,
}

impl SourceQuality {
    #[must_use]
    pub fn with_raw_rows(raw_rows: usize) -> Self {
        Self {
            raw_rows: raw_rows as u64,
            ..Self::default()
        }
    }

    pub fn drop_row(&mut self, reason: &str) {
        *self.dropped.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn coerce(&mut self, reason: &str) {
        *self.coerced.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn keep_row(&mut self) {
        self.kept_rows += 1;
    }

    #[must_use]
    pub fn dropped_total(&self) -> u64 {
        self.dropped.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadQualityReport {
    pub churn: SourceQuality,
    pub active_base: SourceQuality,
    pub backlog: SourceQuality,
}
