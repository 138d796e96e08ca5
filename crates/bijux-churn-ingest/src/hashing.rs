// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use bijux_churn_core::sha256_hex;
use serde::{Deserialize, Serialize};

use crate::IngestError;

pub fn hash_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path).map_err(|e| IngestError(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileState {
    Present { len: u64, modified_unix_nanos: u64 },
    Missing,
}

/// Cheap identity of a source file: path, size and modification time.
/// Content is not read, so a fingerprint costs one `stat` per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceFingerprint {
    pub path: String,
    pub file: FileState,
}

impl SourceFingerprint {
    #[must_use]
    pub fn of(path: &Path) -> Self {
        let file = match fs::metadata(path) {
            Ok(meta) => FileState::Present {
                len: meta.len(),
                modified_unix_nanos: meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
            },
            Err(_) => FileState::Missing,
        };
        Self {
            path: path.display().to_string(),
            file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_file, FileState, SourceFingerprint};

    #[test]
    fn fingerprint_tracks_presence_and_length() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("base_ativa.csv");
        assert_eq!(SourceFingerprint::of(&path).file, FileState::Missing);

        std::fs::write(&path, b"Data\n").expect("write");
        let first = SourceFingerprint::of(&path);
        assert!(matches!(first.file, FileState::Present { len: 5, .. }));

        std::fs::write(&path, b"Data,Tipo Cliente\n").expect("write");
        assert_ne!(SourceFingerprint::of(&path), first);
    }

    #[test]
    fn file_hash_is_content_sha256() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("empty.csv");
        std::fs::write(&path, b"").expect("write");
        assert_eq!(
            hash_file(&path).expect("hash"),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(hash_file(&tmp.path().join("absent.csv")).is_err());
    }
}
