use crate::error::ErrorPayload;
use crate::types::{ContextMetrics, ReconciliationReport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for output payloads.
pub const CALIPER_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CaliperOutput {
    Reconcile(ReconcileOutput),
    Encode(EncodeOutput),
    Decode(DecodeOutput),
    Resolve(ResolveOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    Reconcile,
    Encode,
    Decode,
    Resolve,
}

/// Where the inputs of a run came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub rendered: PathBuf,
    pub markup: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<PathBuf>,
    /// Whether the rendered tree arrived in the binary wire format.
    pub binary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutput {
    pub version: String,
    pub input: InputDescriptor,
    pub metrics: ContextMetrics,
    pub report: ReconciliationReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeOutput {
    pub version: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub nodes: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeOutput {
    pub version: String,
    pub input: PathBuf,
    pub nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// The decoded tree, when it was not written to a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<crate::types::RenderedNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    pub version: String,
    pub expression: String,
    pub pixels: f64,
    /// Token the value resolves to, when a property was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    pub message: String,
    pub error: ErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn reconcile_output_serializes() {
        let output = CaliperOutput::Reconcile(ReconcileOutput {
            version: CALIPER_OUTPUT_VERSION.to_string(),
            input: InputDescriptor {
                rendered: PathBuf::from("tree.bin"),
                markup: PathBuf::from("intent.html"),
                tokens: None,
                binary: true,
            },
            metrics: ContextMetrics::default(),
            report: ReconciliationReport::new(vec![], vec!["n2".into()], vec![1], vec![], vec![]),
        });

        let json = serde_json::to_string(&output).expect("serialize reconcile output");
        assert!(json.contains("\"mode\":\"reconcile\""));
        assert!(json.contains("\"unmatchedRendered\":[\"n2\"]"));
        assert!(json.contains("\"viewportWidth\":1920.0"));
        assert!(!json.contains("\"tokens\""));
    }

    #[test]
    fn resolve_output_serializes() {
        let output = CaliperOutput::Resolve(ResolveOutput {
            version: CALIPER_OUTPUT_VERSION.to_string(),
            expression: "calc(2rem + 10px)".to_string(),
            pixels: 42.0,
            token_name: Some("space-lg".to_string()),
        });

        let json = serde_json::to_string(&output).expect("serialize resolve output");
        assert!(json.contains("\"mode\":\"resolve\""));
        assert!(json.contains("\"pixels\":42.0"));
        assert!(json.contains("\"tokenName\":\"space-lg\""));
    }

    #[test]
    fn error_output_round_trips() {
        let output = CaliperOutput::Error(ErrorOutput {
            version: CALIPER_OUTPUT_VERSION.to_string(),
            message: "bad magic".to_string(),
            error: ErrorPayload {
                category: ErrorCategory::Protocol,
                message: "bad magic".to_string(),
                remediation: Some("re-encode".to_string()),
            },
        });

        let json = serde_json::to_string(&output).expect("serialize error output");
        assert!(json.contains("\"mode\":\"error\""));
        let back: CaliperOutput = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(back, CaliperOutput::Error(e) if e.error.category == ErrorCategory::Protocol));
    }
}
