// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Building a pipeline from a manifest

use std::path::Path;
use std::sync::Arc;

use super::{Manifest, OutputEntry, ParamEntry, Pipeline, SourceEntry, StepEntry};
use crate::errors::{FacadeError, FacadeResult};
use crate::service::ObjectStore;
use crate::steps::{
    BatchTransformStep, FacadeStep, Param, ParamKind, ProcessingStep, RegisterStep, Source,
    TrainingStep,
};

/// A pipeline with every manifest step added
#[derive(Debug)]
pub struct Assembly {
    pub pipeline: Pipeline,
    /// Facade steps in manifest order, all parsed
    pub steps: Vec<FacadeStep>,
}

impl Assembly {
    pub fn step(&self, name: &str) -> Option<&FacadeStep> {
        self.steps.iter().find(|s| s.name() == name)
    }
}

/// Add the manifest's steps to a new pipeline in file order
///
/// Relative paths in the manifest resolve against `base`, the directory the
/// manifest was loaded from.
pub async fn assemble(
    manifest: &Manifest,
    base: &Path,
    store: Arc<dyn ObjectStore>,
) -> FacadeResult<Assembly> {
    let pipeline = Pipeline::new(&manifest.name, manifest.pipeline_config(base), store);
    assemble_into(manifest, base, pipeline).await
}

/// Like [`assemble`], with a pipeline created by the caller
pub async fn assemble_into(
    manifest: &Manifest,
    base: &Path,
    mut pipeline: Pipeline,
) -> FacadeResult<Assembly> {
    let mut steps: Vec<FacadeStep> = Vec::with_capacity(manifest.steps.len());

    for entry in &manifest.steps {
        let mut step = build_step(entry, base, &steps)?;
        pipeline.add_step(&mut step).await?;
        steps.push(step);
    }

    Ok(Assembly { pipeline, steps })
}

fn build_step(entry: &StepEntry, base: &Path, done: &[FacadeStep]) -> FacadeResult<FacadeStep> {
    let step: FacadeStep = match entry {
        StepEntry::Processing {
            name,
            body,
            inputs,
            outputs,
        } => ProcessingStep::new(name, body.clone())
            .with_inputs(resolve_params(inputs, base, done)?)
            .with_outputs(outputs.iter().map(output_param).collect())
            .into(),
        StepEntry::Training {
            name,
            inputs,
            model,
        } => TrainingStep::new(name, resolve_params(inputs, base, done)?, model.clone()).into(),
        StepEntry::BatchTransform {
            name,
            model,
            data,
            framework,
        } => {
            let mut step = BatchTransformStep::new(
                name,
                resolve_param(model, Some("model"), base, done)?,
                resolve_param(data, Some("data"), base, done)?,
            );
            step.framework = *framework;
            step.into()
        }
        StepEntry::Register {
            name,
            model,
            group_name,
            approval_status,
            content_types,
            response_types,
            metrics,
        } => {
            let model = resolve_param(model, Some("model"), base, done)?;
            let mut step = RegisterStep::new(name, model, group_name)
                .with_approval_status(*approval_status);
            step.content_types = content_types.clone();
            step.response_types = response_types.clone();
            step.metrics = metrics.clone();
            step.into()
        }
    };

    Ok(step)
}

fn resolve_params(
    entries: &[ParamEntry],
    base: &Path,
    done: &[FacadeStep],
) -> FacadeResult<Vec<Param>> {
    // Unnamed inputs stay unnamed so parsers assign positional names
    entries
        .iter()
        .map(|entry| resolve_param(entry, None, base, done))
        .collect()
}

fn resolve_param(
    entry: &ParamEntry,
    default_name: Option<&str>,
    base: &Path,
    done: &[FacadeStep],
) -> FacadeResult<Param> {
    let mut param = Param::unnamed().with_source(resolve_source(entry, base, done)?);
    param.name = entry.name.clone().or_else(|| default_name.map(str::to_string));
    param.destination = entry.destination.clone();
    param.content_type = entry.content_type.clone();
    Ok(param)
}

fn resolve_source(entry: &ParamEntry, base: &Path, done: &[FacadeStep]) -> FacadeResult<Source> {
    let source = match &entry.source {
        None => Source::Unset,
        Some(SourceEntry::Location(location)) => match Source::parse(location) {
            Source::Local(path) if path.is_relative() => Source::Local(base.join(path)),
            other => other,
        },
        Some(SourceEntry::StepOutput { step, output }) => {
            find(done, step)?
                .as_processing()?
                .output_as_param(output, output, None)?
                .source
        }
        Some(SourceEntry::TrainedModel { trained_model }) => {
            find(done, trained_model)?
                .as_training()?
                .trained_model_as_param(None)?
                .source
        }
        Some(SourceEntry::CreatedModel { created_model }) => {
            find(done, created_model)?
                .as_batch_transform()?
                .created_model_as_param(None)?
                .source
        }
    };
    Ok(source)
}

fn output_param(entry: &OutputEntry) -> Param {
    let mut param = match (&entry.name, entry.property) {
        (Some(name), true) => Param::property(name),
        (Some(name), false) => Param::new(name),
        (None, property) => {
            let mut param = Param::unnamed();
            if property {
                param.kind = ParamKind::Property;
            }
            param
        }
    };
    param.destination = entry.destination.clone();
    param.content_type = entry.content_type.clone();
    param
}

/// A step added earlier; steps declared later are not visible yet
fn find<'a>(done: &'a [FacadeStep], name: &str) -> FacadeResult<&'a FacadeStep> {
    done.iter()
        .find(|s| s.name() == name)
        .ok_or_else(|| FacadeError::Unparsed {
            step: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RecordingService;
    use crate::workflow::{StepArguments, StepType, Value};

    const PIPELINE: &str = r#"
name: Abalone
bucket: ml-artifacts
role: arn:aws:iam::123456789012:role/ml
region: us-east-1
root_dir: project
lib_dir: lib
steps:
  - type: processing
    name: CreateDataset
    body: { type: handler, name: create_dataset }
    inputs:
      - name: data
        source: project/abalone.csv
    outputs:
      - name: train
      - name: validation
      - name: test
  - type: training
    name: Train
    inputs:
      - name: train
        source: { step: CreateDataset, output: train }
        content_type: text/csv
      - name: validation
        source: { step: CreateDataset, output: validation }
        content_type: text/csv
    model:
      name: xgboost
      hyper_params: { num_round: 50, max_depth: 5 }
  - type: processing
    name: Evaluation
    body: { type: handler, name: evaluate }
    inputs:
      - name: model
        source: { trained_model: Train }
      - name: test
        source: { step: CreateDataset, output: test }
    outputs:
      - name: evaluation
        property: true
  - type: batch_transform
    name: Score
    model: { source: { trained_model: Train } }
    data: { source: { step: CreateDataset, output: test }, content_type: text/csv }
    framework: xgboost
  - type: register
    name: Register
    model: { source: { created_model: Score } }
    group_name: abalone
    approval_status: Approved
    metrics: { step: Evaluation, output: evaluation }
"#;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        std::fs::write(dir.path().join("project/abalone.csv"), "M,0.455\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_assemble_abalone() {
        let dir = project();
        let manifest = Manifest::from_yaml(PIPELINE).unwrap();
        let store = Arc::new(RecordingService::new());

        let assembly = assemble(&manifest, dir.path(), store.clone()).await.unwrap();

        assert_eq!(assembly.pipeline.steps().len(), 6);
        assert!(assembly.steps.iter().all(|s| s.is_parsed()));

        let train = assembly.pipeline.steps()[1].clone();
        match train.arguments {
            StepArguments::Training(args) => {
                assert_eq!(args.input_data_config.len(), 2);
                assert_eq!(args.hyper_parameters["num_round"], "50");
            }
            other => panic!("Expected training arguments, got {:?}", other),
        }

        let register = assembly.pipeline.steps().last().unwrap();
        assert_eq!(register.step_type, StepType::RegisterModel);

        // lib and root per processing step, plus the local dataset
        assert_eq!(store.uploads().len(), 5);
    }

    #[tokio::test]
    async fn test_step_outputs_become_deferred_inputs() {
        let dir = project();
        let manifest = Manifest::from_yaml(PIPELINE).unwrap();
        let assembly = assemble(&manifest, dir.path(), Arc::new(RecordingService::new()))
            .await
            .unwrap();

        let evaluation = assembly.step("Evaluation").unwrap().as_processing().unwrap();
        match &evaluation.inputs[1].source {
            Source::Deferred(expr) => assert_eq!(
                expr.path(),
                Some("Steps.CreateDataset.ProcessingOutputConfig.Outputs['test'].S3Output.S3Uri")
            ),
            other => panic!("Expected deferred source, got {:?}", other),
        }

        let args = assembly.pipeline.steps()[2].processing().unwrap().clone();
        assert!(matches!(args.processing_inputs[2].s3_input.s3_uri, Value::Expr(_)));
    }

    #[tokio::test]
    async fn test_reference_to_later_step_fails() {
        let dir = project();
        let yaml = r#"
name: Broken
bucket: ml-artifacts
role: arn:aws:iam::123456789012:role/ml
region: us-east-1
root_dir: project
lib_dir: lib
steps:
  - type: training
    name: Train
    inputs:
      - name: train
        source: { step: CreateDataset, output: train }
    model: { name: xgboost }
  - type: processing
    name: CreateDataset
    body: { type: shell, command: "true" }
    outputs:
      - name: train
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        let err = assemble(&manifest, dir.path(), Arc::new(RecordingService::new()))
            .await
            .unwrap_err();
        assert!(err.is_ordering());
    }

    #[test]
    fn test_unnamed_outputs_stay_unnamed() {
        let param = output_param(&OutputEntry {
            property: true,
            ..Default::default()
        });
        assert!(param.name.is_none());
        assert!(param.is_property());
    }
}
