// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Recording backend
//!
//! Accepts every call and remembers it. Used by `--dry-run` and tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{upload_target, ExecutionHandle, ObjectStore, WorkflowService};
use crate::errors::{FacadeError, FacadeResult};

/// A recorded pipeline upsert
#[derive(Debug, Clone)]
pub struct RecordedUpsert {
    pub name: String,
    pub definition: String,
    pub role_arn: String,
}

/// Backend recording calls instead of performing them
#[derive(Debug, Default)]
pub struct RecordingService {
    uploads: Mutex<Vec<(PathBuf, String)>>,
    upserts: Mutex<Vec<RecordedUpsert>>,
    executions: Mutex<Vec<String>>,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads as (local path, target URI)
    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn upserts(&self) -> Vec<RecordedUpsert> {
        self.upserts.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn executions(&self) -> Vec<String> {
        self.executions.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

fn poisoned() -> FacadeError {
    FacadeError::Io {
        message: "recording backend lock poisoned".into(),
    }
}

#[async_trait]
impl ObjectStore for RecordingService {
    async fn upload(&self, local: &Path, desired_uri: &str) -> FacadeResult<String> {
        if !local.exists() {
            return Err(FacadeError::UploadFailed {
                source_path: local.to_path_buf(),
                destination: desired_uri.to_string(),
                error: "local path does not exist".into(),
            });
        }

        let target = upload_target(local, desired_uri);
        self.uploads
            .lock()
            .map_err(|_| poisoned())?
            .push((local.to_path_buf(), target.clone()));
        Ok(target)
    }
}

#[async_trait]
impl WorkflowService for RecordingService {
    async fn upsert_pipeline(
        &self,
        name: &str,
        definition: &str,
        role_arn: &str,
    ) -> FacadeResult<String> {
        self.upserts.lock().map_err(|_| poisoned())?.push(RecordedUpsert {
            name: name.to_string(),
            definition: definition.to_string(),
            role_arn: role_arn.to_string(),
        });
        Ok(format!("arn:aws:sagemaker:local:000000000000:pipeline/{}", name.to_lowercase()))
    }

    async fn start_execution(&self, name: &str) -> FacadeResult<ExecutionHandle> {
        let mut executions = self.executions.lock().map_err(|_| poisoned())?;
        executions.push(name.to_string());
        Ok(ExecutionHandle {
            pipeline_name: name.to_string(),
            execution_arn: format!(
                "arn:aws:sagemaker:local:000000000000:pipeline/{}/execution/dry-run-{}",
                name.to_lowercase(),
                executions.len()
            ),
        })
    }
}
