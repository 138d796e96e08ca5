// SPDX-License-Identifier: Apache-2.0

use crate::OutputMode;
use bijux_churn_model::{month_from_name, Segment};
use serde_json::Value;

pub(crate) fn emit_ok(output_mode: OutputMode, payload: Value) -> Result<(), String> {
    if output_mode.json {
        println!(
            "{}",
            serde_json::to_string(&payload).map_err(|e| e.to_string())?
        );
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).map_err(|e| e.to_string())?
        );
    }
    Ok(())
}

/// Accepts a calendar number or a Portuguese month name. Numbers are not
/// range-checked here; the metrics filter rejects them with a validation error.
pub(crate) fn parse_month(raw: &str) -> Result<u8, String> {
    if let Ok(number) = raw.trim().parse::<u8>() {
        return Ok(number);
    }
    month_from_name(raw).ok_or_else(|| format!("unknown month: {raw}"))
}

pub(crate) fn parse_segment(raw: &str) -> Result<Segment, String> {
    raw.parse::<Segment>().map_err(|e| e.0)
}

#[cfg(test)]
mod tests {
    use super::{parse_month, parse_segment};
    use bijux_churn_model::Segment;

    #[test]
    fn months_parse_from_numbers_and_names() {
        assert_eq!(parse_month("2"), Ok(2));
        assert_eq!(parse_month("Março"), Ok(3));
        assert_eq!(parse_month("13"), Ok(13));
        assert!(parse_month("Smarch").is_err());
    }

    #[test]
    fn segments_parse_case_insensitively() {
        assert_eq!(parse_segment("pme"), Ok(Segment::Pme));
        assert!(parse_segment("P1").is_err());
    }
}
