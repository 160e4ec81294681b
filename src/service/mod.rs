// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Managed service backends
//!
//! The facade only builds requests; submission, uploads and execution are
//! delegated through these traits. [`AwsCli`] talks to the real service,
//! [`RecordingService`] records calls for dry runs and tests.

mod aws_cli;
mod memory;

pub use aws_cli::AwsCli;
pub use memory::{RecordedUpsert, RecordingService};

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::FacadeResult;

/// Handle of a started pipeline execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub pipeline_name: String,
    pub execution_arn: String,
}

impl std::fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.execution_arn, self.pipeline_name)
    }
}

/// Trait for object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file or directory under `desired_uri`
    ///
    /// Returns the URI of the uploaded data: `{desired_uri}/{file name}` for
    /// a file, `desired_uri` itself for a directory.
    async fn upload(&self, local: &Path, desired_uri: &str) -> FacadeResult<String>;
}

/// Trait for the managed workflow service
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Create the pipeline, or update it if it already exists
    async fn upsert_pipeline(
        &self,
        name: &str,
        definition: &str,
        role_arn: &str,
    ) -> FacadeResult<String>;

    /// Start one execution of a pipeline
    async fn start_execution(&self, name: &str) -> FacadeResult<ExecutionHandle>;
}

fn s3_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^s3://[a-z0-9][a-z0-9.\-]{1,61}[a-z0-9](/.*)?$").expect("valid S3 URI pattern")
    })
}

/// Whether a string is a well-formed `s3://bucket[/key]` URI
pub fn is_s3_uri(s: &str) -> bool {
    s3_uri_pattern().is_match(s)
}

/// Append path segments to a URI
pub fn join_uri(base: &str, segments: &[&str]) -> String {
    let mut uri = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            uri.push('/');
            uri.push_str(segment);
        }
    }
    uri
}

/// URI an upload of `local` under `desired_uri` lands at
pub fn upload_target(local: &Path, desired_uri: &str) -> String {
    match local.file_name() {
        Some(name) if local.is_file() => join_uri(desired_uri, &[&name.to_string_lossy()]),
        _ => desired_uri.trim_end_matches('/').to_string(),
    }
}
