// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::calendar::ValidationError;

/// Client segment tag shared by the churn log and the active-base snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "PF")]
    Pf,
    #[serde(rename = "PME")]
    Pme,
    #[serde(rename = "Corporativo")]
    Corporativo,
    #[serde(rename = "Outros")]
    Outros,
}

pub const ALL_SEGMENTS: [Segment; 4] = [
    Segment::Pf,
    Segment::Pme,
    Segment::Corporativo,
    Segment::Outros,
];

impl Segment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pf => "PF",
            Self::Pme => "PME",
            Self::Corporativo => "Corporativo",
            Self::Outros => "Outros",
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = ValidationError;

    /// Parses a segment tag, not a raw legal-form code; see [`classify`] for those.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_SEGMENTS
            .into_iter()
            .find(|segment| segment.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError(format!("unknown client segment: {s}")))
    }
}

/// Maps a raw legal-form code (churn log) or client-type label (active base)
/// to its segment. Missing and blank codes are individual customers.
#[must_use]
pub fn classify(raw_code: Option<&str>) -> Segment {
    let Some(raw) = raw_code else {
        return Segment::Pf;
    };
    let code = raw.replace('\u{a0}', " ").trim().to_uppercase();
    match code.as_str() {
        "" => Segment::Pf,
        "P1" => Segment::Pme,
        "C1" => Segment::Corporativo,
        "PF" => Segment::Pf,
        "PME" => Segment::Pme,
        "CORPORATIVO" => Segment::Corporativo,
        _ => Segment::Outros,
    }
}
