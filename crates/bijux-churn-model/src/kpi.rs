// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// A KPI value that keeps "measured zero" apart from "could not measure".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Kpi<T> {
    Measured { value: T },
    Unavailable { reason: String },
}

impl<T> Kpi<T> {
    #[must_use]
    pub const fn measured(value: T) -> Self {
        Self::Measured { value }
    }

    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Measured { value } => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_measured(&self) -> bool {
        matches!(self, Self::Measured { .. })
    }
}
