use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::ProtocolError;

#[derive(Debug, Error)]
pub enum CaliperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl CaliperError {
    pub fn config(message: impl Into<String>) -> Self {
        CaliperError::Config(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            CaliperError::Io(e) => ErrorPayload::new(
                ErrorCategory::Input,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            CaliperError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Input,
                e.to_string(),
                "Check that the rendered tree / metrics JSON matches the expected camelCase schema.",
            ),
            CaliperError::Yaml(e) => ErrorPayload::new(
                ErrorCategory::Input,
                e.to_string(),
                "Check the YAML token file syntax.",
            ),
            CaliperError::Toml(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check the TOML syntax of the config or token file.",
            ),
            CaliperError::Protocol(e) => {
                let remediation = match e {
                    ProtocolError::BadMagic { .. } => {
                        "The payload is not a Caliper binary tree; pass a JSON tree (.json) or re-encode with `caliper encode`."
                    }
                    ProtocolError::UnsupportedVersion { .. } => {
                        "Re-encode the tree with this version of `caliper encode`."
                    }
                    _ => "The binary tree is truncated or corrupt; capture and encode it again.",
                };
                ErrorPayload::new(ErrorCategory::Protocol, e.to_string(), remediation)
            }
            CaliperError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("token file") && lower.contains("extension") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Use a token file with a .json, .yaml, .yml or .toml extension.",
                    )
                } else if lower.contains("not found") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Verify the file exists; use an absolute path or run from the working directory.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths and the [metrics]/[thresholds]/[matching] config sections.",
                    )
                }
            }
            CaliperError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaliperError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Input,
    Protocol,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
