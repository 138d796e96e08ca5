// SPDX-License-Identifier: Apache-2.0

//! Canonical JSON used for cache keys, export records and report fingerprints.
//!
//! Object keys are emitted in byte order and negative zero is folded into
//! zero, so two reports that compare equal also hash equal.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::sha256_hex;

pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = canonicalize(serde_json::to_value(value)?);
    serde_json::to_vec(&value)
}

/// SHA-256 (lowercase hex) of [`canonical_json_bytes`].
pub fn canonical_digest<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(&canonical_json_bytes(value)?))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => items.into_iter().map(canonicalize).collect(),
        Value::Number(n) => Value::Number(fold_negative_zero(n)),
        other => other,
    }
}

fn fold_negative_zero(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 && f.is_sign_negative() => {
            Number::from_f64(0.0).unwrap_or(n)
        }
        _ => n,
    }
}

#[cfg(test)]
mod tests {
    use super::{canonical_digest, canonical_json_bytes};
    use serde_json::json;

    #[test]
    fn nested_keys_are_sorted() {
        let value = json!({
            "rows": [{"prior_volume": 2, "category": "PF"}],
            "current_year": 2025,
            "kpi": {"value": 1.5, "status": "measured"},
        });
        let text = String::from_utf8(canonical_json_bytes(&value).expect("bytes")).expect("utf8");
        assert_eq!(
            text,
            r#"{"current_year":2025,"kpi":{"status":"measured","value":1.5},"rows":[{"category":"PF","prior_volume":2}]}"#
        );
    }

    #[test]
    fn negative_zero_hashes_like_zero() {
        let a = canonical_digest(&json!({"variation": -0.0})).expect("digest");
        let b = canonical_digest(&json!({"variation": 0.0})).expect("digest");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
