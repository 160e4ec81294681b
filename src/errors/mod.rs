// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Error types
//!
//! The facade is fail-fast: every error surfaces to the caller immediately,
//! nothing is retried or rolled back. Variants carry enough context to point
//! at the offending step or parameter.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for smflow operations
pub type FacadeResult<T> = Result<T, FacadeError>;

/// Main error type for smflow
#[derive(Error, Debug, Diagnostic)]
pub enum FacadeError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unknown model '{model}'")]
    #[diagnostic(
        code(smflow::unknown_model),
        help("Registered models: {known}")
    )]
    UnknownModel { model: String, known: String },

    #[error("No image registry account known for region '{region}'")]
    #[diagnostic(
        code(smflow::unsupported_region),
        help("Set 'image_uri' explicitly in the pipeline file")
    )]
    UnsupportedRegion { region: String },

    #[error("Step '{step}' has no container image")]
    #[diagnostic(
        code(smflow::missing_image),
        help("Give the step a 'framework' or set a pipeline-wide 'image_uri'")
    )]
    MissingImage { step: String },

    #[error("Parameter '{param}' of step '{step}' is invalid: {reason}")]
    #[diagnostic(code(smflow::invalid_param))]
    InvalidParam {
        step: String,
        param: String,
        reason: String,
    },

    #[error("Step '{step}' is invalid: {reason}")]
    #[diagnostic(code(smflow::invalid_step))]
    InvalidStep { step: String, reason: String },

    #[error("Invalid pipeline file: {reason}")]
    #[diagnostic(code(smflow::invalid_manifest))]
    InvalidManifest {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(smflow::manifest_not_found),
        help("Pass the pipeline file with --pipeline or create .smflow.yaml")
    )]
    ManifestNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // Ordering Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' has not been parsed yet")]
    #[diagnostic(
        code(smflow::unparsed_step),
        help("Add '{step}' to the pipeline before any step that consumes its outputs")
    )]
    Unparsed { step: String },

    #[error("Step '{step}' has already been parsed")]
    #[diagnostic(code(smflow::already_parsed))]
    AlreadyParsed { step: String },

    #[error("Step '{step}' has no output named '{output}'")]
    #[diagnostic(code(smflow::output_not_found))]
    OutputNotFound { step: String, output: String },

    #[error("Step '{step}' is a {actual} step, expected a {expected} step")]
    #[diagnostic(code(smflow::reference_kind_mismatch))]
    ReferenceKindMismatch {
        step: String,
        expected: String,
        actual: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Remote Service Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' not found")]
    #[diagnostic(
        code(smflow::tool_not_found),
        help("{suggestion}")
    )]
    ToolNotFound { tool: String, suggestion: String },

    #[error("Service call '{operation}' failed: {error}")]
    #[diagnostic(code(smflow::service_call_failed))]
    ServiceCallFailed {
        operation: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Upload of '{source_path}' to '{destination}' failed: {error}")]
    #[diagnostic(code(smflow::upload_failed))]
    UploadFailed {
        source_path: PathBuf,
        destination: String,
        error: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Container Runtime Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    #[diagnostic(
        code(smflow::snapshot_version),
        help("Rebuild the pipeline with the same smflow version as the container")
    )]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("Snapshot digest mismatch for step '{step}'")]
    #[diagnostic(code(smflow::snapshot_digest))]
    SnapshotDigest { step: String },

    #[error("No handler registered under '{handler}'")]
    #[diagnostic(
        code(smflow::handler_not_found),
        help("Register the handler with Runtime::register before running the step (registered: {registered})")
    )]
    HandlerNotFound { handler: String, registered: String },

    #[error("Step body of '{step}' failed: {reason}")]
    #[diagnostic(code(smflow::step_body_failed))]
    StepBodyFailed { step: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(smflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(smflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(smflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(smflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(smflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(smflow::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for FacadeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for FacadeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for FacadeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for FacadeError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl FacadeError {
    /// Create a tool not found error with installation suggestion
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = match tool {
            "aws" => "Install the AWS CLI v2: https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html".to_string(),
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }

    /// Create a service call error, attaching a hint parsed from the CLI output
    pub fn service_call_failed(operation: &str, stderr: &str) -> Self {
        Self::ServiceCallFailed {
            operation: operation.to_string(),
            error: stderr.trim().to_string(),
            help: Self::parse_service_error(stderr),
        }
    }

    /// Whether this is an ordering error (a step referenced before being parsed)
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::Unparsed { .. }
                | Self::AlreadyParsed { .. }
                | Self::OutputNotFound { .. }
                | Self::ReferenceKindMismatch { .. }
        )
    }

    fn parse_service_error(stderr: &str) -> Option<String> {
        if stderr.contains("ExpiredToken") || stderr.contains("InvalidClientTokenId") {
            Some("AWS credentials are missing or expired. Run 'aws sso login' or refresh your keys.".into())
        } else if stderr.contains("AccessDenied") {
            Some("The caller lacks permission for this call. Check the IAM policy of your profile and the pipeline role.".into())
        } else if stderr.contains("ValidationException") {
            Some("The service rejected the generated definition. Run 'smflow build' and inspect the definition JSON.".into())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_errors_are_classified() {
        assert!(FacadeError::Unparsed { step: "Eval".into() }.is_ordering());
        assert!(!FacadeError::Io { message: "x".into() }.is_ordering());
    }

    #[test]
    fn test_service_error_hint() {
        let err = FacadeError::service_call_failed(
            "create-pipeline",
            "An error occurred (AccessDeniedException) when calling CreatePipeline",
        );
        match err {
            FacadeError::ServiceCallFailed { help, .. } => {
                assert!(help.unwrap().contains("permission"));
            }
            _ => panic!("Expected ServiceCallFailed"),
        }
    }
}
