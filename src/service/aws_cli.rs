// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! AWS CLI backend
//!
//! Drives SageMaker and S3 through the `aws` binary.

use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;

use super::{upload_target, ExecutionHandle, ObjectStore, WorkflowService};
use crate::errors::{FacadeError, FacadeResult};

/// AWS CLI backend
pub struct AwsCli {
    /// Path to aws binary
    aws_bin: PathBuf,
    region: Option<String>,
    profile: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PipelineArnResponse {
    pipeline_arn: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionArnResponse {
    pipeline_execution_arn: String,
}

impl AwsCli {
    /// Locate the `aws` binary
    pub fn new() -> FacadeResult<Self> {
        let aws_bin = which::which("aws").map_err(|_| FacadeError::tool_not_found("aws"))?;

        Ok(Self {
            aws_bin,
            region: None,
            profile: None,
        })
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    /// Get the CLI version
    pub async fn version(&self) -> FacadeResult<String> {
        let stdout = self.run("version", &["--version"]).await?;
        Ok(stdout.lines().next().unwrap_or("unknown").trim().to_string())
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.aws_bin);
        cmd.args(args);
        if let Some(ref region) = self.region {
            cmd.arg("--region").arg(region);
        }
        if let Some(ref profile) = self.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd
    }

    /// Run a CLI call and return its stdout
    async fn run(&self, operation: &str, args: &[&str]) -> FacadeResult<String> {
        tracing::debug!(operation, ?args, "aws call");

        let output = self
            .command(args)
            .output()
            .await
            .map_err(|e| FacadeError::ServiceCallFailed {
                operation: operation.to_string(),
                error: e.to_string(),
                help: Some("Ensure the AWS CLI is installed and accessible".into()),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(stdout)
        } else {
            Err(FacadeError::service_call_failed(operation, &stderr))
        }
    }

    /// Scratch copy of the definition for `file://`; removed when dropped
    fn write_definition(name: &str, definition: &str) -> FacadeResult<NamedTempFile> {
        let write_error = |e: std::io::Error| FacadeError::FileWriteError {
            path: std::env::temp_dir(),
            error: e.to_string(),
        };

        let mut file = tempfile::Builder::new()
            .prefix(&format!("smflow-{}-", name))
            .suffix(".definition.json")
            .tempfile()
            .map_err(write_error)?;
        file.write_all(definition.as_bytes()).map_err(write_error)?;
        file.flush().map_err(write_error)?;
        Ok(file)
    }
}

#[async_trait]
impl WorkflowService for AwsCli {
    async fn upsert_pipeline(
        &self,
        name: &str,
        definition: &str,
        role_arn: &str,
    ) -> FacadeResult<String> {
        let file = Self::write_definition(name, definition)?;
        let definition_arg = format!("file://{}", file.path().display());
        let args = [
            "--pipeline-name",
            name,
            "--pipeline-definition",
            definition_arg.as_str(),
            "--role-arn",
            role_arn,
            "--output",
            "json",
        ];

        let mut create = vec!["sagemaker", "create-pipeline", "--pipeline-display-name", name];
        create.extend_from_slice(&args);

        let stdout = match self.run("create-pipeline", &create).await {
            Ok(stdout) => stdout,
            Err(FacadeError::ServiceCallFailed { error, .. })
                if error.contains("ResourceInUse") || error.contains("already exists") =>
            {
                tracing::info!(pipeline = name, "pipeline exists, updating");
                let mut update = vec!["sagemaker", "update-pipeline"];
                update.extend_from_slice(&args);
                self.run("update-pipeline", &update).await?
            }
            Err(e) => return Err(e),
        };

        let response: PipelineArnResponse = serde_json::from_str(&stdout)?;
        Ok(response.pipeline_arn)
    }

    async fn start_execution(&self, name: &str) -> FacadeResult<ExecutionHandle> {
        let stdout = self
            .run(
                "start-pipeline-execution",
                &[
                    "sagemaker",
                    "start-pipeline-execution",
                    "--pipeline-name",
                    name,
                    "--output",
                    "json",
                ],
            )
            .await?;

        let response: ExecutionArnResponse = serde_json::from_str(&stdout)?;
        Ok(ExecutionHandle {
            pipeline_name: name.to_string(),
            execution_arn: response.pipeline_execution_arn,
        })
    }
}

#[async_trait]
impl ObjectStore for AwsCli {
    async fn upload(&self, local: &Path, desired_uri: &str) -> FacadeResult<String> {
        if !local.exists() {
            return Err(FacadeError::UploadFailed {
                source_path: local.to_path_buf(),
                destination: desired_uri.to_string(),
                error: "local path does not exist".into(),
            });
        }

        let target = upload_target(local, desired_uri);
        let local_arg = local.to_string_lossy().to_string();
        let mut args = vec!["s3", "cp", local_arg.as_str(), target.as_str(), "--only-show-errors"];
        if local.is_dir() {
            args.push("--recursive");
        }

        self.run("s3 cp", &args)
            .await
            .map_err(|e| FacadeError::UploadFailed {
                source_path: local.to_path_buf(),
                destination: target.clone(),
                error: e.to_string(),
            })?;

        tracing::info!(source = %local.display(), destination = %target, "uploaded");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_missing_path_fails_before_calling_aws() {
        // Skip if the AWS CLI is not installed
        let Ok(cli) = AwsCli::new() else {
            return;
        };

        let err = cli
            .upload(Path::new("/definitely/not/here.csv"), "s3://bucket/x")
            .await
            .unwrap_err();
        assert!(matches!(err, FacadeError::UploadFailed { .. }));
    }

    #[test]
    fn test_definition_file_is_removed_on_drop() {
        let file = AwsCli::write_definition("Abalone", "{\"Version\": \"2020-12-01\"}").unwrap();
        let path = file.path().to_path_buf();

        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("smflow-Abalone-"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"Version\": \"2020-12-01\"}"
        );

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_response_parsing() {
        let response: ExecutionArnResponse = serde_json::from_str(
            r#"{"PipelineExecutionArn": "arn:aws:sagemaker:us-east-1:1:pipeline/p/execution/e"}"#,
        )
        .unwrap();
        assert!(response.pipeline_execution_arn.ends_with("execution/e"));
    }
}
