// SPDX-License-Identifier: Apache-2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MetricsErrorCode {
    Validation,
    Serialization,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsError {
    pub code: MetricsErrorCode,
    pub message: String,
}

impl MetricsError {
    #[must_use]
    pub fn new(code: MetricsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(MetricsErrorCode::Validation, message)
    }
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}
impl std::error::Error for MetricsError {}

impl From<serde_json::Error> for MetricsError {
    fn from(value: serde_json::Error) -> Self {
        Self::new(MetricsErrorCode::Serialization, value.to_string())
    }
}
