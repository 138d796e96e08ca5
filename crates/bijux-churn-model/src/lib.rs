// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Churn report model SSOT.
//!
//! ```compile_fail
//! use bijux_churn_model::Segment;
//!
//! fn exhaustive_match(s: Segment) -> &'static str {
//!     match s {
//!         Segment::Pf => "pf",
//!         Segment::Pme => "pme",
//!         Segment::Corporativo => "corp",
//!     }
//! }
//! ```

mod calendar;
mod facts;
mod kpi;
mod segment;
mod tables;

pub use calendar::{
    month_abbreviation, month_from_name, month_name, normalize_label, ReportingYears,
    ValidationError, YearMonth, MONTH_ABBREVIATIONS, MONTH_NAMES,
};
pub use facts::{
    ActiveBaseSnapshot, BacklogOrigin, BacklogSnapshot, ChurnEvent, CHURN_EVENT_UNIT_VOLUME,
};
pub use kpi::Kpi;
pub use segment::{classify, Segment, ALL_SEGMENTS};
pub use tables::{FactTables, SourceStatus, SourceTable};

pub const CRATE_NAME: &str = "bijux-churn-model";
