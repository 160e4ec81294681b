// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Shell step body
//!
//! Runs a shell command with the step's directories exported.

use std::time::Instant;
use tokio::process::Command;

use super::StepContext;
use crate::errors::{FacadeError, FacadeResult};

/// Shell body
pub struct ShellBody<'a> {
    command: &'a str,
    shell: &'a str,
}

impl<'a> ShellBody<'a> {
    pub fn new(command: &'a str, shell: &'a str) -> Self {
        Self { command, shell }
    }

    /// Environment exported to the command
    pub fn environment(ctx: &StepContext) -> Vec<(String, String)> {
        let dirs = ctx.dirs();
        let mut env = vec![
            ("SMFLOW_STEP".to_string(), ctx.step().to_string()),
            ("SMFLOW_CODE_DIR".to_string(), dirs.code_dir.clone()),
            ("SMFLOW_INPUT_DIR".to_string(), dirs.input_dir.clone()),
            ("SMFLOW_OUTPUT_DIR".to_string(), dirs.output_dir.clone()),
        ];
        env.push((
            "SMFLOW_OUTPUTS".to_string(),
            ctx.outputs()
                .iter()
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ));
        env
    }

    /// Run the command; a non-zero exit fails the step
    pub async fn run(&self, ctx: &StepContext) -> FacadeResult<()> {
        if self.command.trim().is_empty() {
            return Err(FacadeError::InvalidStep {
                step: ctx.step().to_string(),
                reason: "Shell command is empty".to_string(),
            });
        }

        let start = Instant::now();

        let mut cmd = Command::new(self.shell);
        cmd.arg("-c").arg(self.command);
        cmd.current_dir(&ctx.dirs().code_dir);
        cmd.envs(Self::environment(ctx));

        let status = cmd.status().await.map_err(|e| FacadeError::StepBodyFailed {
            step: ctx.step().to_string(),
            reason: format!("shell '{}' could not be started: {}", self.shell, e),
        })?;

        tracing::info!(
            step = ctx.step(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "shell body finished"
        );

        if status.success() {
            Ok(())
        } else {
            Err(FacadeError::StepBodyFailed {
                step: ctx.step().to_string(),
                reason: format!("exit code {}", status.code().unwrap_or(-1)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{SnapshotParam, SnapshotPayload, StepBody};
    use crate::steps::MountDirs;
    use std::path::Path;

    fn context(root: &Path) -> StepContext {
        std::fs::create_dir_all(root.join("code")).unwrap();
        StepContext::from_payload(&SnapshotPayload {
            step: "Shell".into(),
            body: StepBody::shell("true"),
            dirs: MountDirs {
                code_dir: root.join("code").to_string_lossy().to_string(),
                input_dir: root.join("input").to_string_lossy().to_string(),
                output_dir: root.join("output").to_string_lossy().to_string(),
            },
            inputs: vec![],
            outputs: vec![SnapshotParam {
                name: "train".into(),
                local_path: root.join("output/train").to_string_lossy().to_string(),
                content_type: None,
                property: false,
            }],
        })
    }

    #[tokio::test]
    async fn test_command_sees_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.prepare_outputs().unwrap();

        ShellBody::new("echo 1,2 > \"$SMFLOW_OUTPUT_DIR/train/train.csv\"", "bash")
            .run(&ctx)
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("output/train/train.csv")).unwrap();
        assert_eq!(written.trim(), "1,2");
    }

    #[tokio::test]
    async fn test_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShellBody::new("exit 3", "bash")
            .run(&context(dir.path()))
            .await
            .unwrap_err();
        match err {
            FacadeError::StepBodyFailed { reason, .. } => assert!(reason.contains('3')),
            other => panic!("Expected StepBodyFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ShellBody::new("  ", "bash").run(&context(dir.path())).await.is_err());
    }
}
