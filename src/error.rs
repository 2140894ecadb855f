use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum H2hError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Stats API error (status: {status:?}): {message}")]
    Api {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Selection error: {0}")]
    Selection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),

    /// A failure delivered to several callers of one deduplicated request.
    #[error(transparent)]
    Shared(Arc<H2hError>),
}

impl H2hError {
    pub fn api(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        H2hError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn selection(message: impl Into<String>) -> Self {
        H2hError::Selection(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            H2hError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            H2hError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity to the stats API and retry.",
            ),
            H2hError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify the API base URL (e.g., http://localhost:3000).",
            ),
            H2hError::Api { status, message } => ErrorPayload::new(
                ErrorCategory::Api,
                format!("Stats API error (status {:?}): {}", status, message),
                "Check the entity id/scope and the API token; retry manually.",
            ),
            H2hError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Api,
                e.to_string(),
                "The stats API returned an unreadable payload; run with --verbose for details.",
            ),
            H2hError::Selection(msg) => ErrorPayload::new(
                ErrorCategory::Selection,
                msg.to_string(),
                "Check --entity/--scope/--metrics values (e.g., --scope 2021,2023-2024).",
            ),
            H2hError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags/paths and the config file.",
            ),
            H2hError::Shared(inner) => inner.to_payload(),
            H2hError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, H2hError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Api,
    Selection,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
