// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Batch transform step parser
//!
//! Emits two provider steps: `{name}-CreateModel` wraps the model artifact in
//! an inference image, `{name}-Transform` scores the data with it.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{PipelineContext, StepParser};
use crate::errors::{FacadeError, FacadeResult};
use crate::service::join_uri;
use crate::steps::{require_unparsed, BatchTransformStep, ModelRef};
use crate::workflow::{
    ContainerDefinition, CreateModelArguments, DataSource, PipelineStep, StepArguments,
    TransformInput, TransformJobArguments, TransformOutput, TransformResources, Value,
};
use crate::{DEFAULT_INSTANCE_COUNT, DEFAULT_INSTANCE_TYPE};

/// Batch transform step parser
pub struct BatchTransformParser<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> BatchTransformParser<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    fn inference_image(&self, step: &BatchTransformStep) -> FacadeResult<String> {
        match (step.framework, &self.ctx.image_uri) {
            (Some(framework), _) => framework.image_uri(&self.ctx.region),
            (None, Some(uri)) => Ok(uri.clone()),
            (None, None) => Err(FacadeError::MissingImage {
                step: step.name.clone(),
            }),
        }
    }
}

#[async_trait]
impl StepParser for BatchTransformParser<'_> {
    type Step = BatchTransformStep;

    async fn parse(&self, step: &mut BatchTransformStep) -> FacadeResult<Vec<PipelineStep>> {
        require_unparsed(&step.name, step.parsed_step())?;

        let image = self.inference_image(step)?;

        let model_desired = join_uri(&self.ctx.base_s3_path, &[&step.name, "model"]);
        let model_data = self
            .ctx
            .resolve_source(&step.name, "model", &step.model.source, &model_desired)
            .await?;

        let data_desired = join_uri(&self.ctx.base_s3_path, &["transform", "data"]);
        let data = self
            .ctx
            .resolve_source(&step.name, "data", &step.data.source, &data_desired)
            .await?;

        let model_step = PipelineStep::new(
            format!("{}-CreateModel", step.name),
            StepArguments::Model(CreateModelArguments {
                execution_role_arn: self.ctx.role.clone(),
                primary_container: ContainerDefinition {
                    image: image.clone(),
                    model_data_url: model_data.clone(),
                    environment: BTreeMap::new(),
                },
            }),
        );
        let model_name = model_step.properties().model_name();

        let transform_step = PipelineStep::new(
            format!("{}-Transform", step.name),
            StepArguments::Transform(TransformJobArguments {
                model_name: Value::Expr(model_name.clone()),
                transform_input: TransformInput {
                    data_source: DataSource::prefix(data, false),
                    content_type: step.data.content_type.clone(),
                },
                transform_output: TransformOutput {
                    s3_output_path: join_uri(&self.ctx.base_s3_path, &["transform", "output"]),
                },
                transform_resources: TransformResources {
                    instance_count: DEFAULT_INSTANCE_COUNT,
                    instance_type: DEFAULT_INSTANCE_TYPE.into(),
                },
            }),
        );

        tracing::debug!(step = %step.name, image = %image, "parsed batch transform step");

        let created = ModelRef {
            image_uri: image,
            model_data,
            model_name,
        };
        step.record_parse(created, model_step.clone(), transform_step.clone());

        Ok(vec![model_step, transform_step])
    }
}
