// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Processing step: runs a body inside a processing container

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{require_parsed, Param};
use crate::errors::{FacadeError, FacadeResult};
use crate::runtime::StepBody;
use crate::workflow::{Expr, PipelineStep};

/// Mount points inside the processing container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountDirs {
    pub code_dir: String,
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for MountDirs {
    fn default() -> Self {
        Self {
            code_dir: "/opt/ml/processing/input/code".into(),
            input_dir: "/opt/ml/processing/input".into(),
            output_dir: "/opt/ml/processing/output".into(),
        }
    }
}

/// A data processing stage
#[derive(Debug, Clone)]
pub struct ProcessingStep {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub body: StepBody,
    parsed_step: Option<PipelineStep>,
    dirs: Option<MountDirs>,
    script_path: Option<PathBuf>,
}

impl ProcessingStep {
    pub fn new(name: impl Into<String>, body: StepBody) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            body,
            parsed_step: None,
            dirs: None,
            script_path: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<Param>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<Param>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn parsed_step(&self) -> Option<&PipelineStep> {
        self.parsed_step.as_ref()
    }

    /// Container mount points, assigned when parsed
    pub fn dirs(&self) -> Option<&MountDirs> {
        self.dirs.as_ref()
    }

    /// Generated entry point script, written when parsed
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    pub(crate) fn record_parse(&mut self, dirs: MountDirs, script: PathBuf, step: PipelineStep) {
        self.dirs = Some(dirs);
        self.script_path = Some(script);
        self.parsed_step = Some(step);
    }

    /// Output names in declaration order, with positional fallbacks
    pub fn output_names(&self) -> Vec<String> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, p)| p.name_or("output", i))
            .collect()
    }

    /// Expose one of this step's outputs as an input for a later step
    pub fn output_as_param(
        &self,
        name: &str,
        output_name: &str,
        content_type: Option<&str>,
    ) -> FacadeResult<Param> {
        let parsed = require_parsed(&self.name, self.parsed_step())?;
        self.require_output(output_name)?;

        let mut param = Param::new(name).with_source(super::Source::Deferred(
            parsed.properties().processing_output(output_name),
        ));
        param.content_type = content_type.map(str::to_string);
        Ok(param)
    }

    /// Query a field of a property-file output at execution time
    pub fn property_value(&self, output_name: &str, path: &str) -> FacadeResult<Expr> {
        let parsed = require_parsed(&self.name, self.parsed_step())?;
        let index = self.require_output(output_name)?;

        if !self.outputs[index].is_property() {
            return Err(FacadeError::InvalidParam {
                step: self.name.clone(),
                param: output_name.to_string(),
                reason: "output is not a property output".into(),
            });
        }

        Ok(parsed.properties().json_get(output_name, path))
    }

    fn require_output(&self, output_name: &str) -> FacadeResult<usize> {
        self.output_names()
            .iter()
            .position(|n| n == output_name)
            .ok_or_else(|| FacadeError::OutputNotFound {
                step: self.name.clone(),
                output: output_name.to_string(),
            })
    }
}
