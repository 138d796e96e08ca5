// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

#[must_use]
pub fn month_name(month: u8) -> Option<&'static str> {
    MONTH_NAMES.get(usize::from(month).checked_sub(1)?).copied()
}

#[must_use]
pub fn month_abbreviation(month: u8) -> Option<&'static str> {
    MONTH_ABBREVIATIONS
        .get(usize::from(month).checked_sub(1)?)
        .copied()
}

/// Resolves a full month name ("Março", " marÇo ") to its calendar number.
#[must_use]
pub fn month_from_name(label: &str) -> Option<u8> {
    let wanted = normalize_label(label);
    MONTH_NAMES
        .iter()
        .position(|name| normalize_label(name) == wanted)
        .and_then(|idx| u8::try_from(idx + 1).ok())
}

/// Canonical form used for every header and label comparison:
/// NFKC, non-breaking spaces folded, inner whitespace collapsed, trimmed, lowercased.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    raw.nfkc()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u8,
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError(format!(
                "month must be within 1..=12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Calendar-previous period; January rolls back into December of the prior year.
    /// `None` only for January of `i32::MIN`.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        if self.month <= 1 {
            match self.year.checked_sub(1) {
                Some(year) => Some(Self { year, month: 12 }),
                None => None,
            }
        } else {
            Some(Self {
                year: self.year,
                month: self.month - 1,
            })
        }
    }

    #[must_use]
    pub fn month_name(self) -> &'static str {
        month_name(self.month).unwrap_or("")
    }

    #[must_use]
    pub fn key(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// The two calendar years the report compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportingYears {
    current: i32,
    prior: i32,
}

impl Default for ReportingYears {
    fn default() -> Self {
        Self {
            current: 2025,
            prior: 2024,
        }
    }
}

impl ReportingYears {
    pub fn new(current: i32, prior: i32) -> Result<Self, ValidationError> {
        if prior >= current {
            return Err(ValidationError(format!(
                "prior year {prior} must precede current year {current}"
            )));
        }
        Ok(Self { current, prior })
    }

    #[must_use]
    pub const fn current(self) -> i32 {
        self.current
    }

    #[must_use]
    pub const fn prior(self) -> i32 {
        self.prior
    }

    /// Backlog sheets label December of the prior year as `Dez/YY`.
    #[must_use]
    pub fn prior_december_label(self) -> String {
        format!("Dez/{:02}", self.prior.rem_euclid(100))
    }
}
