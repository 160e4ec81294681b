// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Pipeline manifest structures
//!
//! Defines the schema for .smflow.yaml files. JSON and TOML manifests are
//! accepted too, chosen by file extension.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::PipelineConfig;
use crate::errors::{FacadeError, FacadeResult};
use crate::images::Framework;
use crate::metrics::MetricsRef;
use crate::runtime::StepBody;
use crate::steps::{ApprovalStatus, ModelArgs, StepKind};

/// Pipeline manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Bucket holding pipeline artifacts
    pub bucket: String,

    /// Execution role ARN
    pub role: String,

    pub region: String,

    /// Project root mounted into processing containers
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Support library directory mounted into processing containers
    #[serde(default = "default_lib_dir")]
    pub lib_dir: PathBuf,

    /// Image override for processing steps and models
    #[serde(default)]
    pub image_uri: Option<String>,

    /// Steps in submission order
    pub steps: Vec<StepEntry>,
}

/// Manifest format this build understands
pub const MANIFEST_VERSION: &str = "1";

fn default_version() -> String {
    MANIFEST_VERSION.to_string()
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_lib_dir() -> PathBuf {
    PathBuf::from(crate::DEFAULT_LIB_DIR)
}

fn default_content_types() -> Vec<String> {
    vec!["text/csv".to_string()]
}

impl Manifest {
    /// Load a manifest, picking the format from the extension
    pub fn from_file(path: &Path) -> FacadeResult<Self> {
        if !path.exists() {
            return Err(FacadeError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FacadeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn from_yaml(yaml: &str) -> FacadeResult<Self> {
        serde_yaml::from_str::<Self>(yaml)?.checked()
    }

    pub fn from_json(json: &str) -> FacadeResult<Self> {
        serde_json::from_str::<Self>(json)?.checked()
    }

    pub fn from_toml(source: &str) -> FacadeResult<Self> {
        toml::from_str::<Self>(source)?.checked()
    }

    fn checked(self) -> FacadeResult<Self> {
        if self.version != MANIFEST_VERSION {
            return Err(FacadeError::InvalidManifest {
                reason: format!("unsupported version '{}'", self.version),
                help: Some(format!("Set `version: \"{}\"`", MANIFEST_VERSION)),
            });
        }
        Ok(self)
    }

    pub fn to_yaml(&self) -> FacadeResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    pub fn get_step(&self, name: &str) -> Option<&StepEntry> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Pipeline settings, with relative directories resolved against `base`
    pub fn pipeline_config(&self, base: &Path) -> PipelineConfig {
        PipelineConfig::new(&self.bucket, &self.role, &self.region)
            .with_root_dir(base.join(&self.root_dir))
            .with_lib_dir(base.join(&self.lib_dir))
            .with_image_uri(self.image_uri.clone())
    }
}

/// A step of the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEntry {
    Processing {
        name: String,

        /// What runs inside the container
        body: StepBody,

        #[serde(default)]
        inputs: Vec<ParamEntry>,

        #[serde(default)]
        outputs: Vec<OutputEntry>,
    },

    Training {
        name: String,

        /// One channel per input
        #[serde(default)]
        inputs: Vec<ParamEntry>,

        model: ModelArgs,
    },

    BatchTransform {
        name: String,
        model: ParamEntry,
        data: ParamEntry,

        /// Inference image framework; the pipeline image is used when unset
        #[serde(default)]
        framework: Option<Framework>,
    },

    Register {
        name: String,
        model: ParamEntry,
        group_name: String,

        #[serde(default)]
        approval_status: ApprovalStatus,

        #[serde(default = "default_content_types")]
        content_types: Vec<String>,

        #[serde(default = "default_content_types")]
        response_types: Vec<String>,

        #[serde(default)]
        metrics: Option<MetricsRef>,
    },
}

impl StepEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Processing { name, .. }
            | Self::Training { name, .. }
            | Self::BatchTransform { name, .. }
            | Self::Register { name, .. } => name,
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Processing { .. } => StepKind::Processing,
            Self::Training { .. } => StepKind::Training,
            Self::BatchTransform { .. } => StepKind::BatchTransform,
            Self::Register { .. } => StepKind::Register,
        }
    }

    /// Names of the provider steps this entry expands to
    pub fn provider_step_names(&self) -> Vec<String> {
        match self {
            Self::Processing { name, .. } | Self::Training { name, .. } => vec![name.clone()],
            Self::BatchTransform { name, .. } => vec![
                format!("{}-CreateModel", name),
                format!("{}-Transform", name),
            ],
            Self::Register { name, .. } => vec![format!("{}-RegisterModel", name)],
        }
    }

    /// Every parameter source of this entry, with the parameter's role
    pub fn sources(&self) -> Vec<(String, &SourceEntry)> {
        let params: Vec<(String, &ParamEntry)> = match self {
            Self::Processing { inputs, .. } | Self::Training { inputs, .. } => inputs
                .iter()
                .enumerate()
                .map(|(i, input)| (input.name_or("input", i), input))
                .collect(),
            Self::BatchTransform { model, data, .. } => {
                vec![("model".into(), model), ("data".into(), data)]
            }
            Self::Register { model, .. } => vec![("model".into(), model)],
        };

        params
            .into_iter()
            .filter_map(|(label, param)| param.source.as_ref().map(|s| (label, s)))
            .collect()
    }

    /// Output names of a processing entry, with positional fallbacks
    pub fn output_names(&self) -> Vec<String> {
        match self {
            Self::Processing { outputs, .. } => outputs
                .iter()
                .enumerate()
                .map(|(i, o)| o.name.clone().unwrap_or_else(|| format!("output_{}", i)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// An empty name is no name; parsers give both a positional name
fn optional_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name.filter(|n| !n.trim().is_empty()))
}

/// An input parameter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamEntry {
    #[serde(default, deserialize_with = "optional_name")]
    pub name: Option<String>,

    #[serde(default)]
    pub source: Option<SourceEntry>,

    /// Container path the input is mounted at
    #[serde(default)]
    pub destination: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,
}

impl ParamEntry {
    pub fn name_or(&self, prefix: &str, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", prefix, index))
    }
}

/// Where an input's data comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SourceEntry {
    /// Output of an earlier processing step
    StepOutput { step: String, output: String },

    /// Model artifacts of an earlier training step
    TrainedModel { trained_model: String },

    /// Model created by an earlier batch transform step
    CreatedModel { created_model: String },

    /// Local path or `s3://` URI
    Location(String),
}

impl SourceEntry {
    /// The step this source refers to, with the kind it must have
    pub fn referenced_step(&self) -> Option<(&str, StepKind)> {
        match self {
            Self::StepOutput { step, .. } => Some((step, StepKind::Processing)),
            Self::TrainedModel { trained_model } => Some((trained_model, StepKind::Training)),
            Self::CreatedModel { created_model } => {
                Some((created_model, StepKind::BatchTransform))
            }
            Self::Location(_) => None,
        }
    }
}

/// An output of a processing step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputEntry {
    #[serde(default, deserialize_with = "optional_name")]
    pub name: Option<String>,

    /// S3 destination; derived from the pipeline base path when unset
    #[serde(default)]
    pub destination: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    /// Also capture the output as a queryable property file
    #[serde(default)]
    pub property: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABALONE: &str = r#"
name: Abalone
bucket: ml-artifacts
role: arn:aws:iam::123456789012:role/ml
region: us-east-1
steps:
  - type: processing
    name: CreateDataset
    body:
      type: shell
      command: python split.py
    inputs:
      - name: data
        source: data/abalone.csv
    outputs:
      - name: train
      - name: test
  - type: training
    name: Train
    inputs:
      - name: train
        source: { step: CreateDataset, output: train }
        content_type: text/csv
    model:
      name: xgboost
      hyper_params:
        num_round: 50
  - type: batch_transform
    name: Score
    model:
      source: { trained_model: Train }
    data:
      source: { step: CreateDataset, output: test }
    framework: xgboost
  - type: register
    name: Register
    model:
      source: { created_model: Score }
    group_name: abalone
"#;

    #[test]
    fn test_parse_yaml() {
        let manifest = Manifest::from_yaml(ABALONE).unwrap();

        assert_eq!(manifest.name, "Abalone");
        assert_eq!(manifest.version, "1");
        assert_eq!(manifest.lib_dir, PathBuf::from(".smflow/lib"));
        assert_eq!(manifest.root_dir, PathBuf::from("."));
        assert_eq!(
            manifest.step_names(),
            vec!["CreateDataset", "Train", "Score", "Register"]
        );
    }

    #[test]
    fn test_source_forms() {
        let manifest = Manifest::from_yaml(ABALONE).unwrap();

        let sources = manifest.get_step("CreateDataset").unwrap().sources();
        assert_eq!(sources[0].1, &SourceEntry::Location("data/abalone.csv".into()));

        let sources = manifest.get_step("Train").unwrap().sources();
        assert_eq!(
            sources[0].1,
            &SourceEntry::StepOutput {
                step: "CreateDataset".into(),
                output: "train".into()
            }
        );

        let sources = manifest.get_step("Score").unwrap().sources();
        assert_eq!(
            sources[0].1.referenced_step(),
            Some(("Train", StepKind::Training))
        );
    }

    #[test]
    fn test_register_defaults() {
        let manifest = Manifest::from_yaml(ABALONE).unwrap();

        match manifest.get_step("Register").unwrap() {
            StepEntry::Register {
                approval_status,
                content_types,
                response_types,
                metrics,
                ..
            } => {
                assert_eq!(*approval_status, ApprovalStatus::PendingManualApproval);
                assert_eq!(content_types, &vec!["text/csv".to_string()]);
                assert_eq!(response_types, &vec!["text/csv".to_string()]);
                assert!(metrics.is_none());
            }
            other => panic!("Expected register entry, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_step_names() {
        let manifest = Manifest::from_yaml(ABALONE).unwrap();
        assert_eq!(
            manifest.get_step("Score").unwrap().provider_step_names(),
            vec!["Score-CreateModel", "Score-Transform"]
        );
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_yaml(ABALONE).unwrap();

        let json_path = dir.path().join("pipeline.json");
        std::fs::write(&json_path, serde_json::to_string(&manifest).unwrap()).unwrap();
        assert_eq!(Manifest::from_file(&json_path).unwrap().steps.len(), 4);

        let toml_path = dir.path().join("pipeline.toml");
        std::fs::write(
            &toml_path,
            r#"
name = "Tiny"
bucket = "ml-artifacts"
role = "arn:aws:iam::123456789012:role/ml"
region = "eu-west-1"

[[steps]]
type = "processing"
name = "Prepare"
body = { type = "shell", command = "true" }
"#,
        )
        .unwrap();
        let tiny = Manifest::from_file(&toml_path).unwrap();
        assert_eq!(tiny.region, "eu-west-1");
        assert_eq!(tiny.steps[0].kind(), StepKind::Processing);
    }

    #[test]
    fn test_missing_file() {
        let err = Manifest::from_file(Path::new("/nonexistent/.smflow.yaml")).unwrap_err();
        assert!(matches!(err, FacadeError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_unknown_step_type() {
        let yaml = r#"
name: Bad
bucket: b
role: r
region: us-east-1
steps:
  - type: deploy
    name: Nope
"#;
        assert!(Manifest::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unsupported_version() {
        let yaml = r#"
version: "2"
name: Later
bucket: b
role: r
region: us-east-1
steps: []
"#;
        let err = Manifest::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, FacadeError::InvalidManifest { .. }));
    }

    #[test]
    fn test_empty_names_are_unnamed() {
        let yaml = r#"
name: Blank
bucket: b
role: r
region: us-east-1
steps:
  - type: processing
    name: Prepare
    body: { type: shell, command: "true" }
    inputs:
      - name: ""
        source: "s3://b/data"
    outputs:
      - name: ""
      - name: train
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        let step = manifest.get_step("Prepare").unwrap();

        assert_eq!(step.output_names(), vec!["output_0", "train"]);
        assert_eq!(step.sources()[0].0, "input_0");
    }
}
