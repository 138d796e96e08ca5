// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::YearMonth;
use crate::segment::Segment;

/// Every surviving churn row weighs exactly one unit of volume.
pub const CHURN_EVENT_UNIT_VOLUME: u32 = 1;

/// One completed cancellation order, attributed to the month it was uninstalled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChurnEvent {
    pub order_created: Option<NaiveDate>,
    pub uninstalled: NaiveDate,
    pub status: String,
    pub legal_form: String,
    pub segment: Segment,
    pub churn_type: String,
    pub reason_category: Option<String>,
    pub branch: Option<String>,
    pub year: i32,
    pub month: u8,
    pub month_name: String,
    pub year_month: String,
    pub volume: u32,
}

impl ChurnEvent {
    #[must_use]
    pub const fn period(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActiveBaseSnapshot {
    pub snapshot_date: NaiveDate,
    pub year: i32,
    pub month: u8,
    pub month_name: String,
    pub client_type: String,
    pub segment: Segment,
    pub active_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacklogOrigin {
    Sheet,
    Fallback,
}

/// Aggregate ("Geral") pending-cancellation backlog for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacklogSnapshot {
    pub year: i32,
    pub month: u8,
    pub month_name: String,
    pub period_label: String,
    pub volume: u64,
    pub origin: BacklogOrigin,
}

impl BacklogSnapshot {
    #[must_use]
    pub const fn period(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }
}
