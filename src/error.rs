use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown modifier stage '{0}' (expected clone, style, error or xml)")]
    InvalidStage(String),

    #[error("Modifier registered for stage '{expected}' but its callback belongs to '{actual}'")]
    StageMismatch { expected: String, actual: String },

    #[error("Nothing to render: the root node was excluded from the clone")]
    NothingToRender,

    #[error("Cannot fetch resource {url}, status: {status}")]
    FetchFailed { url: String, status: String },

    #[error("Timeout of {}ms occurred while fetching resource: {url}", timeout.as_millis())]
    FetchTimeout { url: String, timeout: Duration },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("XML serialization error: {0}")]
    Serialize(String),

    #[error("Snapshot parse error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SnapshotError {
    pub fn fetch_failed(url: impl Into<String>, status: impl ToString) -> Self {
        SnapshotError::FetchFailed {
            url: url.into(),
            status: status.to_string(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        SnapshotError::Decode(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            SnapshotError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            SnapshotError::InvalidStage(_) | SnapshotError::StageMismatch { .. } => {
                ErrorPayload::new(
                    ErrorCategory::Modifier,
                    self.to_string(),
                    "Register modifiers with one of: clone, style, error, xml.",
                )
            }
            SnapshotError::NothingToRender => ErrorPayload::new(
                ErrorCategory::Capture,
                self.to_string(),
                "Check the node filter and clone modifiers; the root must survive cloning.",
            ),
            SnapshotError::FetchFailed { .. } | SnapshotError::Network(_) => ErrorPayload::new(
                ErrorCategory::Network,
                self.to_string(),
                "Check connectivity/proxy/VPN or register an error handler that supplies a fallback.",
            ),
            SnapshotError::FetchTimeout { .. } => ErrorPayload::new(
                ErrorCategory::Network,
                self.to_string(),
                "Increase --fetch-timeout or make the resource reachable.",
            ),
            SnapshotError::Decode(_) | SnapshotError::Image(_) => ErrorPayload::new(
                ErrorCategory::Image,
                self.to_string(),
                "Use a raster backend able to decode SVG, or register an svg2img error handler.",
            ),
            SnapshotError::Serialize(_) => ErrorPayload::new(
                ErrorCategory::Capture,
                self.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
            SnapshotError::Snapshot(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check the page snapshot JSON against the documented schema.",
            ),
            SnapshotError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("selector") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Use a selector that matches a node in the snapshot (supports #id, .class, tag, [attr]).",
                    )
                } else if lower.contains("timeout") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Timeouts must be positive (e.g., timeout = \"30s\").",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths and the config file.",
                    )
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Image,
    Modifier,
    Capture,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_payload_includes_selector_remediation() {
        let err = SnapshotError::Config("selector '#missing' matched no node".to_string());
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Config);
        let remediation = payload.remediation.unwrap_or_default();
        assert!(
            remediation.contains("#id"),
            "expected selector remediation, got: {remediation}"
        );
    }

    #[test]
    fn config_payload_uses_default_remediation_for_other_messages() {
        let err = SnapshotError::Config("Some other config issue".to_string());
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.contains("Check flags/paths"),
            "expected default remediation for generic config errors"
        );
    }

    #[test]
    fn fetch_errors_are_network_category() {
        let err = SnapshotError::fetch_failed("http://x/a.png", 404);
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Network);
        assert!(payload.message.contains("http://x/a.png"));
        assert!(payload.message.contains("404"));
    }

    #[test]
    fn timeout_message_reports_milliseconds() {
        let err = SnapshotError::FetchTimeout {
            url: "http://x/slow.woff".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "Timeout of 30000ms occurred while fetching resource: http://x/slow.woff"
        );
    }

    #[test]
    fn stage_errors_point_at_valid_stage_names() {
        let err = SnapshotError::InvalidStage("render".into());
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Modifier);
        assert!(payload.remediation.unwrap_or_default().contains("xml"));
    }
}
