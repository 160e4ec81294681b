// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Manifest validation
//!
//! Catches what would otherwise fail halfway through assembly: bad names,
//! references to steps declared later, unknown models.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use super::{Manifest, SourceEntry, StepEntry};
use crate::errors::FacadeResult;
use crate::images::Framework;
use crate::runtime::StepBody;
use crate::service::is_s3_uri;
use crate::steps::StepKind;

fn step_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid step name pattern"))
}

/// Manifest validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a manifest
    pub fn validate(manifest: &Manifest) -> FacadeResult<ValidationResult> {
        let mut result = ValidationResult::new();

        if manifest.steps.is_empty() {
            result.add_error("Pipeline has no steps defined");
        }

        if !step_name_pattern().is_match(&manifest.name) {
            result.add_error(&format!(
                "Pipeline name '{}' must be 1-64 letters, digits, '-' or '_'",
                manifest.name
            ));
        }

        if !is_s3_uri(&format!("s3://{}", manifest.bucket)) {
            result.add_error(&format!("Invalid bucket name: '{}'", manifest.bucket));
        }

        if !manifest.role.starts_with("arn:") {
            result.add_error(&format!("Role '{}' is not an ARN", manifest.role));
        }

        if Framework::Sklearn.image_uri(&manifest.region).is_err() && manifest.image_uri.is_none()
        {
            result.add_error(&format!(
                "Region '{}' has no known processing image; set image_uri",
                manifest.region
            ));
        }

        let mut seen_names = HashSet::new();
        for step in &manifest.steps {
            if !seen_names.insert(step.name()) {
                result.add_error(&format!("Duplicate step name: '{}'", step.name()));
            }
        }

        // Steps declared so far, by name
        let mut declared: HashMap<&str, &StepEntry> = HashMap::new();
        for step in &manifest.steps {
            Self::validate_step(step, manifest, &declared, &mut result);
            declared.insert(step.name(), step);
        }

        Ok(result)
    }

    fn validate_step(
        step: &StepEntry,
        manifest: &Manifest,
        declared: &HashMap<&str, &StepEntry>,
        result: &mut ValidationResult,
    ) {
        for provider_name in step.provider_step_names() {
            if !step_name_pattern().is_match(&provider_name) {
                result.add_error(&format!(
                    "Step '{}': generated name '{}' must be 1-64 letters, digits, '-' or '_'",
                    step.name(),
                    provider_name
                ));
            }
        }

        for (param, source) in step.sources() {
            Self::validate_reference(step, &param, source, manifest, declared, result);
        }

        match step {
            StepEntry::Processing {
                body,
                inputs,
                outputs,
                ..
            } => {
                if let StepBody::Shell { command, .. } = body {
                    if command.trim().is_empty() {
                        result.add_error(&format!(
                            "Step '{}': Shell command is empty",
                            step.name()
                        ));
                    }
                }

                let unnamed = inputs.iter().filter(|p| p.name.is_none()).count()
                    + outputs.iter().filter(|p| p.name.is_none()).count();
                if unnamed > 0 {
                    result.add_warning(&format!(
                        "Step '{}': {} unnamed parameter(s) get positional names",
                        step.name(),
                        unnamed
                    ));
                }

                if inputs.iter().any(|p| p.source.is_none()) {
                    result.add_error(&format!("Step '{}': input without a source", step.name()));
                }
            }
            StepEntry::Training { inputs, model, .. } => {
                if let Err(e) = model.name.parse::<Framework>() {
                    result.add_error(&format!("Step '{}': {}", step.name(), e));
                }
                if inputs.is_empty() {
                    result.add_warning(&format!(
                        "Step '{}': Training without input channels",
                        step.name()
                    ));
                }
                if inputs.iter().any(|p| p.name.is_none()) {
                    result.add_warning(&format!(
                        "Step '{}': unnamed channels get positional names",
                        step.name()
                    ));
                }
            }
            StepEntry::BatchTransform {
                model,
                data,
                framework,
                ..
            } => {
                if framework.is_none() && manifest.image_uri.is_none() {
                    result.add_error(&format!(
                        "Step '{}': no framework and no pipeline image_uri to build the model from",
                        step.name()
                    ));
                }
                if model.source.is_none() {
                    result.add_error(&format!("Step '{}': model has no source", step.name()));
                }
                if data.source.is_none() {
                    result.add_error(&format!("Step '{}': data has no source", step.name()));
                }
            }
            StepEntry::Register { model, metrics, .. } => {
                if !matches!(model.source, Some(SourceEntry::CreatedModel { .. })) {
                    result.add_error(&format!(
                        "Step '{}': model must reference a batch transform step ({{ created_model: <step> }})",
                        step.name()
                    ));
                }

                if let Some(metrics) = metrics {
                    Self::validate_output_reference(
                        step,
                        &metrics.step,
                        &metrics.output,
                        manifest,
                        declared,
                        result,
                    );
                }
            }
        }
    }

    fn validate_reference(
        step: &StepEntry,
        param: &str,
        source: &SourceEntry,
        manifest: &Manifest,
        declared: &HashMap<&str, &StepEntry>,
        result: &mut ValidationResult,
    ) {
        if let SourceEntry::StepOutput {
            step: target,
            output,
        } = source
        {
            Self::validate_output_reference(step, target, output, manifest, declared, result);
            return;
        }

        let Some((target, expected)) = source.referenced_step() else {
            return;
        };

        match declared.get(target) {
            Some(referenced) if referenced.kind() != expected => {
                result.add_error(&format!(
                    "Step '{}': {} references '{}', which is a {} step, not {}",
                    step.name(),
                    param,
                    target,
                    referenced.kind(),
                    expected
                ));
            }
            Some(_) => {}
            None => Self::report_missing(step, target, manifest, result),
        }
    }

    /// A processing step output referenced by name
    fn validate_output_reference(
        step: &StepEntry,
        target: &str,
        output: &str,
        manifest: &Manifest,
        declared: &HashMap<&str, &StepEntry>,
        result: &mut ValidationResult,
    ) {
        match declared.get(target) {
            Some(referenced) if referenced.kind() != StepKind::Processing => {
                result.add_error(&format!(
                    "Step '{}': '{}' is a {} step and has no outputs",
                    step.name(),
                    target,
                    referenced.kind()
                ));
            }
            Some(referenced) => {
                if !referenced.output_names().iter().any(|n| n == output) {
                    result.add_error(&format!(
                        "Step '{}': '{}' has no output named '{}'",
                        step.name(),
                        target,
                        output
                    ));
                }
            }
            None => Self::report_missing(step, target, manifest, result),
        }
    }

    fn report_missing(
        step: &StepEntry,
        target: &str,
        manifest: &Manifest,
        result: &mut ValidationResult,
    ) {
        if manifest.get_step(target).is_some() {
            result.add_error(&format!(
                "Step '{}': references '{}', which is declared after it. Move '{}' earlier.",
                step.name(),
                target,
                target
            ));
        } else {
            result.add_error(&format!(
                "Step '{}': references unknown step '{}'",
                step.name(),
                target
            ));
        }
    }

    /// Check that local sources exist (runtime validation)
    pub fn validate_files(manifest: &Manifest, base_path: &Path) -> FacadeResult<Vec<String>> {
        let mut missing = Vec::new();

        if !base_path.join(&manifest.root_dir).is_dir() {
            missing.push(format!(
                "Project root not found: {}",
                manifest.root_dir.display()
            ));
        }

        for step in &manifest.steps {
            for (param, source) in step.sources() {
                if let SourceEntry::Location(location) = source {
                    if location.starts_with("s3://") {
                        continue;
                    }
                    if !base_path.join(location).exists() {
                        missing.push(format!(
                            "Step '{}': {} not found: {}",
                            step.name(),
                            param,
                            location
                        ));
                    }
                }
            }
        }

        Ok(missing)
    }

    /// Warn when processing steps exist but `{lib_dir}/bin/smflow` does not
    ///
    /// The generated entry points run that binary inside the container, or
    /// `smflow` from the image's PATH when it is absent.
    pub fn runtime_warning(manifest: &Manifest, base_path: &Path) -> Option<String> {
        let has_processing = manifest
            .steps
            .iter()
            .any(|s| s.kind() == StepKind::Processing);
        let binary = base_path.join(&manifest.lib_dir).join("bin").join("smflow");

        if has_processing && !binary.is_file() {
            Some(format!(
                "{} not found; processing containers need smflow on their PATH",
                manifest.lib_dir.join("bin").join("smflow").display()
            ))
        } else {
            None
        }
    }
}

/// Result of manifest validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(steps: &str) -> Manifest {
        let yaml = format!(
            r#"
name: Abalone
bucket: ml-artifacts
role: arn:aws:iam::123456789012:role/ml
region: us-east-1
steps:
{}"#,
            steps
        );
        Manifest::from_yaml(&yaml).unwrap()
    }

    #[test]
    fn test_validate_empty_pipeline() {
        let result = PipelineValidator::validate(&manifest("  []\n")).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no steps"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let result = PipelineValidator::validate(&manifest(
            r#"
  - type: processing
    name: dup
    body: { type: shell, command: "true" }
  - type: processing
    name: dup
    body: { type: shell, command: "true" }
"#,
        ))
        .unwrap();

        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_reference_to_later_step_is_ordering_error() {
        let result = PipelineValidator::validate(&manifest(
            r#"
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
"#,
        ))
        .unwrap();

        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("declared after")));
    }

    #[test]
    fn test_register_metrics_before_evaluation() {
        let result = PipelineValidator::validate(&manifest(
            r#"
  - type: batch_transform
    name: Score
    model: { source: "s3://bucket/model.tar.gz" }
    data: { source: "s3://bucket/test" }
    framework: xgboost
  - type: register
    name: Register
    model: { source: { created_model: Score } }
    group_name: abalone
    metrics: { step: Evaluation, output: evaluation }
  - type: processing
    name: Evaluation
    body: { type: handler, name: evaluate }
    outputs:
      - name: evaluation
        property: true
"#,
        ))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("declared after")));
    }

    #[test]
    fn test_kind_mismatch_and_unknown_output() {
        let result = PipelineValidator::validate(&manifest(
            r#"
  - type: processing
    name: CreateDataset
    body: { type: shell, command: "true" }
    outputs:
      - name: train
  - type: batch_transform
    name: Score
    model: { source: { trained_model: CreateDataset } }
    data: { source: { step: CreateDataset, output: test } }
    framework: xgboost
"#,
        ))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("not training")));
        assert!(result.errors.iter().any(|e| e.contains("no output named 'test'")));
    }

    #[test]
    fn test_unknown_model_and_empty_command() {
        let result = PipelineValidator::validate(&manifest(
            r#"
  - type: processing
    name: Prepare
    body: { type: shell, command: "  " }
  - type: training
    name: Train
    inputs:
      - source: "s3://bucket/train"
    model: { name: linear-learner }
"#,
        ))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("Shell command is empty")));
        assert!(result.errors.iter().any(|e| e.contains("linear-learner")));
        assert!(result.has_warnings());
    }

    #[test]
    fn test_generated_names_are_checked() {
        let long = "S".repeat(60);
        let result = PipelineValidator::validate(&manifest(&format!(
            r#"
  - type: batch_transform
    name: {}
    model: {{ source: "s3://bucket/model.tar.gz" }}
    data: {{ source: "s3://bucket/test" }}
    framework: xgboost
"#,
            long
        )))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("-CreateModel")));
    }

    #[test]
    fn test_valid_manifest() {
        let result = PipelineValidator::validate(&manifest(
            r#"
  - type: processing
    name: CreateDataset
    body: { type: shell, command: "true" }
    inputs:
      - name: data
        source: "s3://bucket/abalone.csv"
    outputs:
      - name: train
"#,
        ))
        .unwrap();

        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_validate_files_reports_missing_local_sources() {
        let dir = tempfile::tempdir().unwrap();
        let m = manifest(
            r#"
  - type: processing
    name: CreateDataset
    body: { type: shell, command: "true" }
    inputs:
      - name: data
        source: data/abalone.csv
"#,
        );

        let missing = PipelineValidator::validate_files(&m, dir.path()).unwrap();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("data/abalone.csv"));

        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/abalone.csv"), "M,0.4\n").unwrap();
        assert!(PipelineValidator::validate_files(&m, dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_runtime_warning_without_lib_binary() {
        let dir = tempfile::tempdir().unwrap();
        let m = manifest(
            r#"
  - type: processing
    name: Prepare
    body: { type: shell, command: "true" }
"#,
        );

        let warning = PipelineValidator::runtime_warning(&m, dir.path()).unwrap();
        assert!(warning.contains("bin/smflow"));

        let bin = dir.path().join(&m.lib_dir).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("smflow"), "").unwrap();
        assert!(PipelineValidator::runtime_warning(&m, dir.path()).is_none());
    }
}
