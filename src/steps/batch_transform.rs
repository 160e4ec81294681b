// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Batch transform step: create a model, then score a dataset with it

use super::{require_parsed, ModelRef, Param, Source};
use crate::errors::{FacadeError, FacadeResult};
use crate::images::Framework;
use crate::workflow::PipelineStep;

/// A batch inference stage
#[derive(Debug, Clone)]
pub struct BatchTransformStep {
    pub name: String,
    /// Trained model artifact
    pub model: Param,
    /// Data to score
    pub data: Param,
    /// Framework of the inference image; the pipeline image is used when unset
    pub framework: Option<Framework>,
    parsed_model_step: Option<PipelineStep>,
    parsed_transform_step: Option<PipelineStep>,
    created_model: Option<ModelRef>,
}

impl BatchTransformStep {
    pub fn new(name: impl Into<String>, model: Param, data: Param) -> Self {
        Self {
            name: name.into(),
            model,
            data,
            framework: None,
            parsed_model_step: None,
            parsed_transform_step: None,
            created_model: None,
        }
    }

    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    /// The transform step, which completes this stage
    pub fn parsed_step(&self) -> Option<&PipelineStep> {
        self.parsed_transform_step.as_ref()
    }

    pub fn parsed_model_step(&self) -> Option<&PipelineStep> {
        self.parsed_model_step.as_ref()
    }

    pub fn parsed_transform_step(&self) -> Option<&PipelineStep> {
        self.parsed_transform_step.as_ref()
    }

    pub(crate) fn record_parse(
        &mut self,
        model: ModelRef,
        model_step: PipelineStep,
        transform_step: PipelineStep,
    ) {
        self.created_model = Some(model);
        self.parsed_model_step = Some(model_step);
        self.parsed_transform_step = Some(transform_step);
    }

    /// The created model as an input for a registration step
    pub fn created_model_as_param(&self, name: Option<&str>) -> FacadeResult<Param> {
        require_parsed(&self.name, self.parsed_step())?;
        let model = self
            .created_model
            .clone()
            .ok_or_else(|| FacadeError::Unparsed {
                step: self.name.clone(),
            })?;
        Ok(Param::new(name.unwrap_or("model")).with_source(Source::Model(model)))
    }
}
