// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Training step

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{require_parsed, Param, Source};
use crate::errors::FacadeResult;
use crate::workflow::PipelineStep;

/// Model to train and its hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArgs {
    /// Model name, resolved to an image through the framework table
    pub name: String,
    /// Passed verbatim to the training job
    #[serde(default)]
    pub hyper_params: BTreeMap<String, serde_json::Value>,
}

impl ModelArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hyper_params: BTreeMap::new(),
        }
    }

    pub fn with_hyper_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.hyper_params.insert(key.to_string(), value.into());
        self
    }

    /// Hyperparameters as the strings the training API expects
    pub fn rendered_hyper_params(&self) -> BTreeMap<String, String> {
        self.hyper_params
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect()
    }
}

/// A model training stage
#[derive(Debug, Clone)]
pub struct TrainingStep {
    pub name: String,
    /// One channel per parameter
    pub inputs: Vec<Param>,
    pub model_args: ModelArgs,
    parsed_step: Option<PipelineStep>,
    image_uri: Option<String>,
}

impl TrainingStep {
    pub fn new(name: impl Into<String>, inputs: Vec<Param>, model_args: ModelArgs) -> Self {
        Self {
            name: name.into(),
            inputs,
            model_args,
            parsed_step: None,
            image_uri: None,
        }
    }

    pub fn parsed_step(&self) -> Option<&PipelineStep> {
        self.parsed_step.as_ref()
    }

    /// Training image, resolved when parsed
    pub fn image_uri(&self) -> Option<&str> {
        self.image_uri.as_deref()
    }

    pub(crate) fn record_parse(&mut self, image_uri: String, step: PipelineStep) {
        self.image_uri = Some(image_uri);
        self.parsed_step = Some(step);
    }

    /// The trained model artifact as an input for a later step
    pub fn trained_model_as_param(&self, name: Option<&str>) -> FacadeResult<Param> {
        let parsed = require_parsed(&self.name, self.parsed_step())?;
        Ok(Param::new(name.unwrap_or("model"))
            .with_source(Source::Deferred(parsed.properties().model_artifacts())))
    }
}
