// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Pipeline accumulator
//!
//! Steps are parsed as they are added and appended in call order. Nothing is
//! reordered; a step referencing another must be added after it.

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::{FacadeError, FacadeResult};
use crate::parsers::{
    BatchTransformParser, PipelineContext, ProcessingParser, RegisterParser, StepParser,
    TrainingParser,
};
use crate::service::{join_uri, ExecutionHandle, ObjectStore, WorkflowService};
use crate::steps::{BatchTransformStep, FacadeStep, ProcessingStep, RegisterStep, TrainingStep};
use crate::workflow::{PipelineDefinition, PipelineStep};

/// Settings a pipeline is created with
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub bucket: String,
    pub role: String,
    pub region: String,
    pub root_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub image_uri: Option<String>,
}

impl PipelineConfig {
    pub fn new(
        bucket: impl Into<String>,
        role: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            role: role.into(),
            region: region.into(),
            root_dir: PathBuf::from("."),
            lib_dir: PathBuf::from(crate::DEFAULT_LIB_DIR),
            image_uri: None,
        }
    }

    pub fn with_root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = dir.into();
        self
    }

    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = dir.into();
        self
    }

    pub fn with_image_uri(mut self, uri: Option<String>) -> Self {
        self.image_uri = uri;
        self
    }
}

/// Ordered accumulator of provider steps
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    context: PipelineContext,
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Create a pipeline whose artifacts live under
    /// `s3://{bucket}/pipelines/{name}/{utc timestamp}`
    pub fn new(
        name: impl Into<String>,
        config: PipelineConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let name = name.into();
        let timestamp = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        let base_s3_path = join_uri(
            &format!("s3://{}", config.bucket),
            &["pipelines", &name, &timestamp],
        );

        tracing::debug!(pipeline = %name, base = %base_s3_path, "created pipeline");

        Self {
            name,
            context: PipelineContext {
                role: config.role,
                region: config.region,
                base_s3_path,
                image_uri: config.image_uri,
                root_dir: config.root_dir,
                lib_dir: config.lib_dir,
                store,
            },
            steps: Vec::new(),
        }
    }

    /// Replace the generated base path
    pub fn with_base_s3_path(mut self, base: impl Into<String>) -> Self {
        self.context.base_s3_path = base.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_s3_path(&self) -> &str {
        &self.context.base_s3_path
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Provider steps accumulated so far, in submission order
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub async fn add_processing_step(&mut self, step: &mut ProcessingStep) -> FacadeResult<()> {
        let parsed = ProcessingParser::new(&self.context).parse(step).await?;
        self.append(parsed);
        Ok(())
    }

    pub async fn add_training_step(&mut self, step: &mut TrainingStep) -> FacadeResult<()> {
        let parsed = TrainingParser::new(&self.context).parse(step).await?;
        self.append(parsed);
        Ok(())
    }

    /// Appends two steps: the model, then the transform
    pub async fn add_batch_transform_step(
        &mut self,
        step: &mut BatchTransformStep,
    ) -> FacadeResult<()> {
        let parsed = BatchTransformParser::new(&self.context).parse(step).await?;
        self.append(parsed);
        Ok(())
    }

    /// Metrics references are resolved against the steps added before this one
    pub async fn add_register_step(&mut self, step: &mut RegisterStep) -> FacadeResult<()> {
        let parsed = RegisterParser::new(&self.context, &self.steps)
            .parse(step)
            .await?;
        self.append(parsed);
        Ok(())
    }

    /// Add a step of any kind
    pub async fn add_step(&mut self, step: &mut FacadeStep) -> FacadeResult<()> {
        match step {
            FacadeStep::Processing(s) => self.add_processing_step(s).await,
            FacadeStep::Training(s) => self.add_training_step(s).await,
            FacadeStep::BatchTransform(s) => self.add_batch_transform_step(s).await,
            FacadeStep::Register(s) => self.add_register_step(s).await,
        }
    }

    fn append(&mut self, parsed: Vec<PipelineStep>) {
        for step in parsed {
            tracing::info!(pipeline = %self.name, step = %step.name, kind = %step.step_type, "added step");
            self.steps.push(step);
        }
    }

    /// The definition document, without submitting it
    pub fn definition(&self) -> PipelineDefinition {
        PipelineDefinition::new(self.steps.clone())
    }

    /// Write the definition to `{lib_dir}/export/{name}.definition.json`
    pub fn write_definition(&self) -> FacadeResult<PathBuf> {
        let json = self.definition().to_json()?;
        let export_dir = self.context.export_dir();

        std::fs::create_dir_all(&export_dir).map_err(|e| FacadeError::FileWriteError {
            path: export_dir.clone(),
            error: e.to_string(),
        })?;

        let path = export_dir.join(format!("{}.definition.json", self.name));
        std::fs::write(&path, json).map_err(|e| FacadeError::FileWriteError {
            path: path.clone(),
            error: e.to_string(),
        })?;

        Ok(path)
    }

    /// Submit the pipeline and start one execution
    pub async fn execute(&self, service: &dyn WorkflowService) -> FacadeResult<ExecutionHandle> {
        let path = self.write_definition()?;
        let definition = self.definition().to_json()?;

        tracing::info!(
            pipeline = %self.name,
            steps = self.steps.len(),
            definition = %path.display(),
            "submitting pipeline"
        );

        let arn = service
            .upsert_pipeline(&self.name, &definition, &self.context.role)
            .await?;
        tracing::debug!(pipeline_arn = %arn, "pipeline upserted");

        let handle = service.start_execution(&self.name).await?;
        tracing::info!(execution = %handle, "pipeline execution started");

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{EvaluationReport, MetricsRef};
    use crate::runtime::StepBody;
    use crate::service::RecordingService;
    use crate::steps::{ModelArgs, Param};
    use crate::workflow::StepType;
    use crate::images::Framework;
    use std::path::Path;

    fn pipeline(root: &Path) -> (Pipeline, Arc<RecordingService>) {
        std::fs::create_dir_all(root.join("project")).unwrap();
        let store = Arc::new(RecordingService::new());
        let config = PipelineConfig::new("bucket", "arn:aws:iam::123456789012:role/ml", "us-east-1")
            .with_root_dir(root.join("project"))
            .with_lib_dir(root.join("lib"));
        (Pipeline::new("Abalone", config, store.clone()), store)
    }

    #[test]
    fn test_base_path_layout() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(dir.path());

        let base = pipeline.base_s3_path();
        assert!(base.starts_with("s3://bucket/pipelines/Abalone/"));
        let timestamp = base.rsplit('/').next().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok());
    }

    #[tokio::test]
    async fn test_end_to_end_six_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pipeline, _) = pipeline(dir.path());

        let mut create_dataset =
            ProcessingStep::new("CreateDataset", StepBody::handler("create_dataset"))
                .with_inputs(vec![Param::new("data").with_location("s3://bucket/abalone.csv")])
                .with_outputs(vec![
                    Param::new("train"),
                    Param::new("validation"),
                    Param::new("test"),
                ]);
        pipeline.add_processing_step(&mut create_dataset).await.unwrap();

        let mut train = TrainingStep::new(
            "Train",
            vec![
                create_dataset.output_as_param("train", "train", Some("text/csv")).unwrap(),
                create_dataset
                    .output_as_param("validation", "validation", Some("text/csv"))
                    .unwrap(),
            ],
            ModelArgs::new("xgboost").with_hyper_param("num_round", 50),
        );
        pipeline.add_training_step(&mut train).await.unwrap();

        let mut evaluation = ProcessingStep::new("Evaluation", StepBody::handler("evaluate"))
            .with_inputs(vec![
                train.trained_model_as_param(None).unwrap(),
                create_dataset.output_as_param("test", "test", None).unwrap(),
            ])
            .with_outputs(vec![Param::property("evaluation")]);
        pipeline.add_processing_step(&mut evaluation).await.unwrap();

        let mut transform = BatchTransformStep::new(
            "Score",
            train.trained_model_as_param(None).unwrap(),
            create_dataset.output_as_param("data", "test", Some("text/csv")).unwrap(),
        )
        .with_framework(Framework::Xgboost);
        pipeline.add_batch_transform_step(&mut transform).await.unwrap();

        let mut register = RegisterStep::new(
            "Register",
            transform.created_model_as_param(None).unwrap(),
            "abalone",
        )
        .with_metrics(MetricsRef::new("Evaluation", "evaluation"));
        pipeline.add_register_step(&mut register).await.unwrap();

        let names: Vec<&str> = pipeline.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "CreateDataset",
                "Train",
                "Evaluation",
                "Score-CreateModel",
                "Score-Transform",
                "Register-RegisterModel"
            ]
        );
        let types: Vec<StepType> = pipeline.steps().iter().map(|s| s.step_type).collect();
        assert_eq!(
            types,
            vec![
                StepType::Processing,
                StepType::Training,
                StepType::Processing,
                StepType::Model,
                StepType::Transform,
                StepType::RegisterModel
            ]
        );

        let mse = evaluation
            .property_value("evaluation", EvaluationReport::mse_value_path())
            .unwrap();
        let json = serde_json::to_string(&mse).unwrap();
        assert!(json.contains("Std:JsonGet"));
    }

    #[tokio::test]
    async fn test_register_before_evaluation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pipeline, _) = pipeline(dir.path());

        let mut transform = BatchTransformStep::new(
            "Score",
            Param::new("model").with_location("s3://bucket/model.tar.gz"),
            Param::new("data").with_location("s3://bucket/test"),
        )
        .with_framework(Framework::Xgboost);
        pipeline.add_batch_transform_step(&mut transform).await.unwrap();

        let mut register = RegisterStep::new(
            "Register",
            transform.created_model_as_param(None).unwrap(),
            "abalone",
        )
        .with_metrics(MetricsRef::new("Evaluation", "evaluation"));

        let err = pipeline.add_register_step(&mut register).await.unwrap_err();
        assert!(err.is_ordering());
        assert_eq!(pipeline.steps().len(), 2);
    }

    #[tokio::test]
    async fn test_execute_submits_definition() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pipeline, _) = pipeline(dir.path());
        let service = RecordingService::new();

        let mut step = ProcessingStep::new("Prepare", StepBody::shell("true"))
            .with_outputs(vec![Param::new("prepared")]);
        pipeline.add_processing_step(&mut step).await.unwrap();

        let handle = pipeline.execute(&service).await.unwrap();
        assert_eq!(handle.pipeline_name, "Abalone");

        let upserts = service.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].role_arn, "arn:aws:iam::123456789012:role/ml");
        assert!(upserts[0].definition.contains("\"Version\": \"2020-12-01\""));
        assert_eq!(service.executions(), vec!["Abalone".to_string()]);

        let written = dir.path().join("lib/export/Abalone.definition.json");
        assert_eq!(std::fs::read_to_string(written).unwrap(), upserts[0].definition);
    }

    #[tokio::test]
    async fn test_add_step_dispatches_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pipeline, _) = pipeline(dir.path());

        let mut step: FacadeStep = TrainingStep::new(
            "Train",
            vec![Param::new("train").with_location("s3://bucket/train")],
            ModelArgs::new("xgboost"),
        )
        .into();
        pipeline.add_step(&mut step).await.unwrap();

        assert!(step.is_parsed());
        assert_eq!(pipeline.steps()[0].step_type, StepType::Training);
    }
}
