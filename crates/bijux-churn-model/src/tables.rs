// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::facts::{ActiveBaseSnapshot, BacklogSnapshot, ChurnEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded,
    Degraded { reason: String },
}

/// Normalized rows of one secondary source plus whether the source could be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable<T> {
    pub status: SourceStatus,
    pub rows: Vec<T>,
}

impl<T> SourceTable<T> {
    #[must_use]
    pub const fn loaded(rows: Vec<T>) -> Self {
        Self {
            status: SourceStatus::Loaded,
            rows,
        }
    }

    #[must_use]
    pub fn degraded(reason: impl Into<String>, rows: Vec<T>) -> Self {
        Self {
            status: SourceStatus::Degraded {
                reason: reason.into(),
            },
            rows,
        }
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.status, SourceStatus::Loaded)
    }

    #[must_use]
    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.status {
            SourceStatus::Loaded => None,
            SourceStatus::Degraded { reason } => Some(reason),
        }
    }
}

/// The three normalized tables of one load. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactTables {
    pub churn: Vec<ChurnEvent>,
    pub active_base: SourceTable<ActiveBaseSnapshot>,
    pub backlog: SourceTable<BacklogSnapshot>,
}
