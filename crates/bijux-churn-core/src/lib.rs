// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod canonical;
mod error;

use sha2::{Digest, Sha256};
use std::path::PathBuf;

pub use error::{ErrorCode, ExitCode, MachineError};

pub const CRATE_NAME: &str = "bijux-churn-core";

pub const ENV_BIJUX_LOG_LEVEL: &str = "BIJUX_LOG_LEVEL";
pub const ENV_BIJUX_CACHE_DIR: &str = "BIJUX_CACHE_DIR";

pub const CONFIG_FILE_NAME: &str = "churn.toml";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigPathScope {
    User,
    Workspace,
}

#[must_use]
pub fn resolve_bijux_cache_dir() -> PathBuf {
    if let Some(explicit) = non_empty_env(ENV_BIJUX_CACHE_DIR) {
        return PathBuf::from(explicit);
    }
    if let Some(xdg_cache_home) = non_empty_env("XDG_CACHE_HOME") {
        return PathBuf::from(xdg_cache_home).join("bijux");
    }
    if let Some(home) = non_empty_env("HOME") {
        return PathBuf::from(home).join(".cache").join("bijux");
    }
    PathBuf::from(".bijux").join("cache")
}

#[must_use]
pub fn resolve_bijux_config_path(scope: ConfigPathScope) -> PathBuf {
    match scope {
        ConfigPathScope::User => {
            if let Some(xdg_config_home) = non_empty_env("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg_config_home)
                    .join("bijux")
                    .join(CONFIG_FILE_NAME);
            }
            if let Some(home) = non_empty_env("HOME") {
                return PathBuf::from(home)
                    .join(".config")
                    .join("bijux")
                    .join(CONFIG_FILE_NAME);
            }
            PathBuf::from(".bijux").join(CONFIG_FILE_NAME)
        }
        ConfigPathScope::Workspace => PathBuf::from(".bijux").join(CONFIG_FILE_NAME),
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_bijux_config_path, ConfigPathScope, CONFIG_FILE_NAME};

    #[test]
    fn workspace_config_path_is_relative_to_cwd() {
        let path = resolve_bijux_config_path(ConfigPathScope::Workspace);
        assert!(path.is_relative());
        assert!(path.ends_with(CONFIG_FILE_NAME));
    }
}
