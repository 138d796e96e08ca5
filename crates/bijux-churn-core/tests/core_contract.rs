// SPDX-License-Identifier: Apache-2.0

use bijux_churn_core::{canonical, sha256_hex, ErrorCode, ExitCode, MachineError};
use serde_json::json;
use std::path::PathBuf;

#[test]
fn canonical_bytes_ignore_key_order() {
    let a = json!({"year": 2025, "month": 1});
    let b = json!({"month": 1, "year": 2025});
    let ba = canonical::canonical_json_bytes(&a).expect("canonical a");
    let bb = canonical::canonical_json_bytes(&b).expect("canonical b");
    assert_eq!(ba, bb);
    assert_eq!(
        canonical::canonical_digest(&a).expect("digest"),
        sha256_hex(&ba)
    );
}

#[test]
fn sha256_matches_known_digest() {
    assert_eq!(
        sha256_hex(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn exit_codes_keep_their_numeric_contract() {
    assert_eq!(ExitCode::Success as u8, 0);
    assert_eq!(ExitCode::Usage as u8, 2);
    assert_eq!(ExitCode::Validation as u8, 3);
    assert_eq!(ExitCode::DependencyFailure as u8, 4);
    assert_eq!(ExitCode::Internal as u8, 10);
    assert_eq!(ExitCode::DependencyFailure.as_str(), "dependency_failure");
}

#[test]
fn machine_error_serializes_details_in_key_order() {
    let err = MachineError::new(ErrorCode::IngestError, "churn source unreadable")
        .with_detail("path", "churn_2025.xlsx")
        .with_detail("class", "fatal");
    let text = serde_json::to_string(&err).expect("serialize");
    assert_eq!(
        text,
        r#"{"code":"ingest_error","message":"churn source unreadable","details":{"class":"fatal","path":"churn_2025.xlsx"}}"#
    );
    assert_eq!(err.to_string(), "ingest_error: churn source unreadable");
    assert_eq!(err.exit_code(), ExitCode::DependencyFailure);
}

#[test]
fn every_error_code_maps_to_a_failure_exit_status() {
    let cases = [
        (ErrorCode::UsageError, ExitCode::Usage),
        (ErrorCode::ConfigError, ExitCode::Validation),
        (ErrorCode::ValidationError, ExitCode::Validation),
        (ErrorCode::IngestError, ExitCode::DependencyFailure),
        (ErrorCode::InternalError, ExitCode::Internal),
    ];
    for (code, exit) in cases {
        assert_eq!(code.exit_code(), exit, "{}", code.as_str());
        assert_ne!(code.exit_code(), ExitCode::Success);
    }
}

#[test]
fn core_crate_has_no_tabular_or_runtime_deps() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let text =
        std::fs::read_to_string(manifest_dir.join("Cargo.toml")).expect("read Cargo.toml");
    for forbidden in ["calamine", "csv", "tokio", "tracing"] {
        assert!(
            !text.contains(forbidden),
            "forbidden dependency in core Cargo.toml: {forbidden}"
        );
    }
}
