// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Step parsers
//!
//! One parser per step kind. A parser takes an unparsed facade step,
//! produces the provider-native step(s), and records the result on the
//! facade step so later steps can reference its outputs.

mod batch_transform;
mod processing;
mod register;
mod training;

pub use batch_transform::BatchTransformParser;
pub use processing::ProcessingParser;
pub use register::RegisterParser;
pub use training::TrainingParser;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::{FacadeError, FacadeResult};
use crate::images::Framework;
use crate::service::ObjectStore;
use crate::steps::Source;
use crate::workflow::{PipelineStep, Value};

/// Trait for step parsers
#[async_trait]
pub trait StepParser {
    /// Facade step kind this parser handles
    type Step: Send;

    /// Parse a step, returning the provider steps in submission order
    async fn parse(&self, step: &mut Self::Step) -> FacadeResult<Vec<PipelineStep>>;
}

/// Pipeline-wide settings every parser works with
#[derive(Clone)]
pub struct PipelineContext {
    pub role: String,
    pub region: String,
    /// `s3://{bucket}/pipelines/{name}/{timestamp}`
    pub base_s3_path: String,
    /// Image override for processing steps and models
    pub image_uri: Option<String>,
    /// Caller project root, mounted into processing containers
    pub root_dir: PathBuf,
    /// Support library directory, mounted into processing containers
    pub lib_dir: PathBuf,
    pub store: Arc<dyn ObjectStore>,
}

impl PipelineContext {
    /// Where generated entry points and definitions are written
    pub fn export_dir(&self) -> PathBuf {
        self.lib_dir.join("export")
    }

    /// Image of processing containers
    pub fn processing_image(&self) -> FacadeResult<String> {
        match &self.image_uri {
            Some(uri) => Ok(uri.clone()),
            None => Framework::Sklearn.image_uri(&self.region),
        }
    }

    /// Turn a parameter source into a definition-time value, uploading local data
    pub async fn resolve_source(
        &self,
        step: &str,
        param: &str,
        source: &Source,
        desired_uri: &str,
    ) -> FacadeResult<Value> {
        match source {
            Source::Unset => Err(FacadeError::InvalidParam {
                step: step.to_string(),
                param: param.to_string(),
                reason: "no source given".into(),
            }),
            Source::Local(path) => {
                let uri = self.store.upload(path, desired_uri).await?;
                Ok(Value::Literal(uri))
            }
            Source::Uri(uri) => Ok(Value::Literal(uri.clone())),
            Source::Deferred(expr) => Ok(Value::Expr(expr.clone())),
            Source::Model(model) => Ok(model.model_data.clone()),
        }
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("role", &self.role)
            .field("region", &self.region)
            .field("base_s3_path", &self.base_s3_path)
            .field("image_uri", &self.image_uri)
            .field("root_dir", &self.root_dir)
            .field("lib_dir", &self.lib_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::service::RecordingService;
    use std::path::Path;

    /// Context rooted in a temporary project with a recording store
    pub fn context(root: &Path) -> (PipelineContext, Arc<RecordingService>) {
        let store = Arc::new(RecordingService::new());
        std::fs::create_dir_all(root.join("project")).unwrap();
        let ctx = PipelineContext {
            role: "arn:aws:iam::123456789012:role/ml".into(),
            region: "us-east-1".into(),
            base_s3_path: "s3://bucket/pipelines/Abalone/2025-01-01T00:00:00.000000".into(),
            image_uri: None,
            root_dir: root.join("project"),
            lib_dir: root.join("lib"),
            store: store.clone(),
        };
        (ctx, store)
    }
}
