// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Processing step parser

use async_trait::async_trait;
use std::path::Path;

use super::{PipelineContext, StepParser};
use crate::errors::{FacadeError, FacadeResult};
use crate::runtime::{render_entrypoint, write_entrypoint, StepSnapshot};
use crate::service::join_uri;
use crate::steps::{require_unparsed, MountDirs, ProcessingStep};
use crate::workflow::{
    AppSpecification, ClusterConfig, PipelineStep, ProcessingInput, ProcessingJobArguments,
    ProcessingOutput, ProcessingOutputConfig, ProcessingResources, PropertyFile, S3Input,
    S3Output, StepArguments, Value, DEFAULT_VOLUME_SIZE_GB,
};
use crate::{DEFAULT_INSTANCE_COUNT, DEFAULT_INSTANCE_TYPE};

/// Processing step parser
pub struct ProcessingParser<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> ProcessingParser<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// The `lib` and `root` bindings every processing step receives
    async fn default_inputs(
        &self,
        step: &str,
        dirs: &MountDirs,
    ) -> FacadeResult<Vec<ProcessingInput>> {
        let mut inputs = Vec::with_capacity(2);

        for (input_name, dir) in [("lib", &self.ctx.lib_dir), ("root", &self.ctx.root_dir)] {
            let dir = canonical_dir(dir)?;
            let desired = join_uri(&self.ctx.base_s3_path, &[step, "input", input_name]);
            let uri = self.ctx.store.upload(&dir, &desired).await?;

            inputs.push(ProcessingInput {
                input_name: input_name.to_string(),
                app_managed: false,
                s3_input: S3Input::prefix(
                    Value::Literal(uri),
                    format!("{}/{}", dirs.code_dir, dir_basename(&dir, input_name)),
                ),
            });
        }

        Ok(inputs)
    }

    /// Path of the entry point inside the container
    fn container_script_path(&self, step: &str, dirs: &MountDirs) -> FacadeResult<String> {
        let lib = canonical_dir(&self.ctx.lib_dir)?;
        Ok(format!(
            "{}/{}/export/{}.sh",
            dirs.code_dir,
            dir_basename(&lib, "lib"),
            step
        ))
    }
}

#[async_trait]
impl StepParser for ProcessingParser<'_> {
    type Step = ProcessingStep;

    async fn parse(&self, step: &mut ProcessingStep) -> FacadeResult<Vec<PipelineStep>> {
        require_unparsed(&step.name, step.parsed_step())?;

        let dirs = MountDirs::default();
        let image_uri = self.ctx.processing_image()?;
        let snapshot = StepSnapshot::capture(step, &dirs)?;
        let script = render_entrypoint(&snapshot)?;

        // Declared inputs first, so a bad source fails before anything is
        // written to the export directory
        let mut declared = Vec::with_capacity(step.inputs.len());
        for (index, param) in step.inputs.iter().enumerate() {
            let name = param.name_or("input", index);
            let desired = join_uri(&self.ctx.base_s3_path, &[&step.name, "input", &name]);
            let uri = self
                .ctx
                .resolve_source(&step.name, &name, &param.source, &desired)
                .await?;
            let destination = param
                .destination
                .clone()
                .unwrap_or_else(|| format!("{}/{}", dirs.input_dir, name));

            declared.push(ProcessingInput {
                input_name: name,
                app_managed: false,
                s3_input: S3Input::prefix(uri, destination),
            });
        }

        // The entry point lives inside the lib directory, so it must exist
        // before lib is uploaded.
        let script_path = write_entrypoint(&self.ctx.export_dir(), &step.name, &script)?;

        let mut inputs = self.default_inputs(&step.name, &dirs).await?;
        inputs.extend(declared);

        let mut outputs = Vec::with_capacity(step.outputs.len());
        let mut property_files = Vec::new();
        for (index, param) in step.outputs.iter().enumerate() {
            let name = param.name_or("output", index);
            let destination = param.destination.clone().unwrap_or_else(|| {
                join_uri(&self.ctx.base_s3_path, &[&step.name, "output", &name])
            });

            if param.is_property() {
                property_files.push(PropertyFile::for_output(&name));
            }

            outputs.push(ProcessingOutput {
                output_name: name.clone(),
                app_managed: false,
                s3_output: S3Output {
                    s3_uri: Value::Literal(destination),
                    local_path: format!("{}/{}", dirs.output_dir, name),
                    s3_upload_mode: "EndOfJob".into(),
                },
            });
        }

        let arguments = ProcessingJobArguments {
            processing_resources: ProcessingResources {
                cluster_config: ClusterConfig {
                    instance_type: DEFAULT_INSTANCE_TYPE.into(),
                    instance_count: DEFAULT_INSTANCE_COUNT,
                    volume_size_in_gb: DEFAULT_VOLUME_SIZE_GB,
                },
            },
            app_specification: AppSpecification {
                image_uri,
                container_entrypoint: vec![
                    "bash".into(),
                    self.container_script_path(&step.name, &dirs)?,
                ],
            },
            role_arn: self.ctx.role.clone(),
            processing_inputs: inputs,
            processing_output_config: ProcessingOutputConfig { outputs },
        };

        let mut parsed = PipelineStep::new(&step.name, StepArguments::Processing(arguments));
        parsed.property_files = property_files;

        tracing::debug!(
            step = %step.name,
            inputs = step.inputs.len(),
            outputs = step.outputs.len(),
            "parsed processing step"
        );

        step.record_parse(dirs, script_path, parsed.clone());
        Ok(vec![parsed])
    }
}

fn canonical_dir(dir: &Path) -> FacadeResult<std::path::PathBuf> {
    std::fs::canonicalize(dir).map_err(|e| FacadeError::FileReadError {
        path: dir.to_path_buf(),
        error: e.to_string(),
    })
}

fn dir_basename(dir: &Path, fallback: &str) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| fallback.to_string())
}
