// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Model registration parser

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{PipelineContext, StepParser};
use crate::errors::{FacadeError, FacadeResult};
use crate::steps::{require_unparsed, RegisterStep, Source};
use crate::workflow::{
    ContainerDefinition, InferenceSpecification, PipelineStep, RegisterModelArguments,
    StepArguments,
};

/// Registration parser; metrics are resolved against the steps parsed so far
pub struct RegisterParser<'a> {
    ctx: &'a PipelineContext,
    parsed: &'a [PipelineStep],
}

impl<'a> RegisterParser<'a> {
    pub fn new(ctx: &'a PipelineContext, parsed: &'a [PipelineStep]) -> Self {
        Self { ctx, parsed }
    }
}

#[async_trait]
impl StepParser for RegisterParser<'_> {
    type Step = RegisterStep;

    async fn parse(&self, step: &mut RegisterStep) -> FacadeResult<Vec<PipelineStep>> {
        require_unparsed(&step.name, step.parsed_step())?;

        let model = match &step.model.source {
            Source::Model(model) => model,
            _ => {
                return Err(FacadeError::InvalidParam {
                    step: step.name.clone(),
                    param: step.model.name_or("model", 0),
                    reason: "must be a model created by a batch transform step".into(),
                })
            }
        };

        let model_metrics = step
            .metrics
            .as_ref()
            .map(|metrics| metrics.resolve(self.parsed))
            .transpose()?;

        let arguments = RegisterModelArguments {
            model_package_group_name: step.group_name.clone(),
            model_approval_status: step.approval_status.to_string(),
            inference_specification: InferenceSpecification {
                containers: vec![ContainerDefinition {
                    image: model.image_uri.clone(),
                    model_data_url: model.model_data.clone(),
                    environment: BTreeMap::new(),
                }],
                supported_content_types: step.content_types.clone(),
                supported_response_mime_types: step.response_types.clone(),
            },
            model_metrics,
        };

        let parsed = PipelineStep::new(
            format!("{}-RegisterModel", step.name),
            StepArguments::RegisterModel(arguments),
        );

        tracing::debug!(
            step = %step.name,
            group = %step.group_name,
            role = %self.ctx.role,
            "parsed register step"
        );

        step.record_parse(parsed.clone());
        Ok(vec![parsed])
    }
}
