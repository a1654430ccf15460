use crate::error::ErrorPayload;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for output payloads.
pub const OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SnapOutput {
    Capture(CaptureOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutput {
    pub version: String,
    pub snapshot: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub width: u32,
    pub height: u32,
    pub data_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn capture_output_serializes() {
        let output = SnapOutput::Capture(CaptureOutput {
            version: OUTPUT_VERSION.to_string(),
            snapshot: PathBuf::from("page.json"),
            selector: Some("#app".to_string()),
            group: None,
            width: 102,
            height: 52,
            data_uri: "data:image/svg+xml;charset=utf-8,<svg/>".to_string(),
        });

        let json = serde_json::to_string(&output).expect("serialize capture output");
        assert!(json.contains("\"mode\":\"capture\""));
        assert!(json.contains("\"width\":102"));
        assert!(json.contains("\"dataUri\":\"data:image/svg+xml"));
        assert!(!json.contains("\"group\""));
    }

    #[test]
    fn error_output_serializes() {
        let output = SnapOutput::Error(ErrorOutput {
            version: OUTPUT_VERSION.to_string(),
            message: Some("boom".to_string()),
            error: ErrorPayload::new(ErrorCategory::Network, "boom".to_string(), "retry"),
        });

        let json = serde_json::to_string(&output).expect("serialize error output");
        assert!(json.contains("\"mode\":\"error\""));
        assert!(json.contains("\"category\":\"network\""));
        assert!(json.contains("\"remediation\":\"retry\""));
    }
}
