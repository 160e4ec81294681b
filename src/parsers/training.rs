// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Training step parser

use async_trait::async_trait;

use super::{PipelineContext, StepParser};
use crate::errors::FacadeResult;
use crate::images::Framework;
use crate::service::join_uri;
use crate::steps::{require_unparsed, TrainingStep};
use crate::workflow::{
    AlgorithmSpecification, Channel, DataSource, OutputDataConfig, PipelineStep, ResourceConfig,
    StepArguments, StoppingCondition, TrainingJobArguments, DEFAULT_MAX_RUNTIME_SECONDS,
    DEFAULT_VOLUME_SIZE_GB,
};
use crate::DEFAULT_INSTANCE_COUNT;

/// Training step parser
pub struct TrainingParser<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> TrainingParser<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StepParser for TrainingParser<'_> {
    type Step = TrainingStep;

    async fn parse(&self, step: &mut TrainingStep) -> FacadeResult<Vec<PipelineStep>> {
        require_unparsed(&step.name, step.parsed_step())?;

        let framework: Framework = step.model_args.name.parse()?;
        let image = framework.image_args();
        let image_uri = framework.image_uri(&self.ctx.region)?;

        let mut channels = Vec::with_capacity(step.inputs.len());
        for (index, param) in step.inputs.iter().enumerate() {
            let name = param.name_or("input", index);
            let desired = join_uri(&self.ctx.base_s3_path, &[&step.name, "input", &name]);
            let uri = self
                .ctx
                .resolve_source(&step.name, &name, &param.source, &desired)
                .await?;

            channels.push(Channel {
                data_source: DataSource::prefix(uri, true),
                content_type: param.content_type.clone(),
                channel_name: name,
            });
        }

        let arguments = TrainingJobArguments {
            algorithm_specification: AlgorithmSpecification {
                training_image: image_uri.clone(),
                training_input_mode: "File".into(),
            },
            output_data_config: OutputDataConfig {
                s3_output_path: join_uri(&self.ctx.base_s3_path, &["models"]),
            },
            stopping_condition: StoppingCondition {
                max_runtime_in_seconds: DEFAULT_MAX_RUNTIME_SECONDS,
            },
            resource_config: ResourceConfig {
                volume_size_in_gb: DEFAULT_VOLUME_SIZE_GB,
                instance_count: DEFAULT_INSTANCE_COUNT,
                instance_type: image.instance_type.to_string(),
            },
            role_arn: self.ctx.role.clone(),
            input_data_config: channels,
            hyper_parameters: step.model_args.rendered_hyper_params(),
        };

        let parsed = PipelineStep::new(&step.name, StepArguments::Training(arguments));

        tracing::debug!(step = %step.name, framework = %framework, "parsed training step");

        step.record_parse(image_uri, parsed.clone());
        Ok(vec![parsed])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FacadeError;
    use crate::parsers::testing::context;
    use crate::steps::{ModelArgs, Param};
    use crate::workflow::{Expr, StepType};

    fn train_step(model: &str) -> TrainingStep {
        TrainingStep::new(
            "Train",
            vec![
                Param::new("train")
                    .with_location("s3://bucket/train")
                    .with_content_type("text/csv"),
                Param::unnamed().with_location("s3://bucket/validation"),
            ],
            ModelArgs::new(model)
                .with_hyper_param("max_depth", 5)
                .with_hyper_param("objective", "reg:linear"),
        )
    }

    fn training_args(step: &PipelineStep) -> &TrainingJobArguments {
        match &step.arguments {
            StepArguments::Training(args) => args,
            other => panic!("Expected training arguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parse_xgboost() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(dir.path());
        let mut step = train_step("xgboost");

        let parsed = TrainingParser::new(&ctx).parse(&mut step).await.unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].step_type, StepType::Training);

        let args = training_args(&parsed[0]);
        assert!(args
            .algorithm_specification
            .training_image
            .ends_with("sagemaker-xgboost:1.0-1-cpu-py3"));
        assert_eq!(
            args.output_data_config.s3_output_path,
            format!("{}/models", ctx.base_s3_path)
        );
        assert_eq!(args.hyper_parameters["max_depth"], "5");
        assert_eq!(args.hyper_parameters["objective"], "reg:linear");
        assert_eq!(step.image_uri(), Some(args.algorithm_specification.training_image.as_str()));
    }

    #[tokio::test]
    async fn test_one_channel_per_input() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(dir.path());
        let mut step = train_step("xgboost");

        let parsed = TrainingParser::new(&ctx).parse(&mut step).await.unwrap();
        let channels = &training_args(&parsed[0]).input_data_config;

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].channel_name, "train");
        assert_eq!(channels[0].content_type.as_deref(), Some("text/csv"));
        assert_eq!(channels[1].channel_name, "input_1");
    }

    #[tokio::test]
    async fn test_unknown_model_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(dir.path());
        let mut step = train_step("linear-learner");

        let err = TrainingParser::new(&ctx).parse(&mut step).await.unwrap_err();
        match err {
            FacadeError::UnknownModel { model, known } => {
                assert_eq!(model, "linear-learner");
                assert!(known.contains("xgboost"));
            }
            other => panic!("Expected UnknownModel, got {:?}", other),
        }
        assert!(step.parsed_step().is_none());
    }

    #[tokio::test]
    async fn test_trained_model_available_after_parse() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(dir.path());
        let mut step = train_step("xgboost");

        assert!(step.trained_model_as_param(None).is_err());
        TrainingParser::new(&ctx).parse(&mut step).await.unwrap();

        let param = step.trained_model_as_param(None).unwrap();
        match param.source {
            crate::steps::Source::Deferred(Expr::Get(path)) => {
                assert_eq!(path, "Steps.Train.ModelArtifacts.S3ModelArtifacts");
            }
            other => panic!("Expected deferred model artifacts, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsupported_region() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctx, _) = context(dir.path());
        ctx.region = "mars-north-1".into();
        let mut step = train_step("xgboost");

        let err = TrainingParser::new(&ctx).parse(&mut step).await.unwrap_err();
        assert!(matches!(err, FacadeError::UnsupportedRegion { .. }));
    }
}
