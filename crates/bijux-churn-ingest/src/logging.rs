// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    Prepare,
    Read,
    Normalize,
    Reconcile,
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadEventLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadEvent {
    pub stage: LoadStage,
    pub level: LoadEventLevel,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Structured record of one load, mirrored to `tracing` as it is written.
#[derive(Debug, Default, Clone)]
pub struct LoadLog {
    events: Vec<LoadEvent>,
}

impl LoadLog {
    pub fn emit(&mut self, stage: LoadStage, name: impl Into<String>, fields: BTreeMap<String, String>) {
        let name = name.into();
        tracing::debug!(stage = ?stage, event = %name, fields = ?fields, "churn load event");
        self.events.push(LoadEvent {
            stage,
            level: LoadEventLevel::Info,
            name,
            fields,
        });
    }

    pub fn warn(&mut self, stage: LoadStage, name: impl Into<String>, fields: BTreeMap<String, String>) {
        let name = name.into();
        tracing::warn!(stage = ?stage, event = %name, fields = ?fields, "churn load degraded");
        self.events.push(LoadEvent {
            stage,
            level: LoadEventLevel::Warn,
            name,
            fields,
        });
    }

    #[must_use]
    pub fn into_events(self) -> Vec<LoadEvent> {
        self.events
    }
}

/// Small helper so call sites read as key/value lists.
#[must_use]
pub fn fields<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
