// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Request arguments of each step type
//!
//! Field names follow the service API (`CreateProcessingJob`,
//! `CreateTrainingJob`, `CreateModel`, `CreateTransformJob`,
//! `CreateModelPackage`).

use serde::Serialize;
use std::collections::BTreeMap;

use super::{StepType, Value};
use crate::metrics::ModelMetrics;

/// Default EBS volume attached to processing and training instances
pub const DEFAULT_VOLUME_SIZE_GB: u32 = 30;

/// Default training time limit
pub const DEFAULT_MAX_RUNTIME_SECONDS: u32 = 86_400;

/// Arguments of a provider step
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StepArguments {
    Processing(ProcessingJobArguments),
    Training(TrainingJobArguments),
    Model(CreateModelArguments),
    Transform(TransformJobArguments),
    RegisterModel(RegisterModelArguments),
}

impl StepArguments {
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Processing(_) => StepType::Processing,
            Self::Training(_) => StepType::Training,
            Self::Model(_) => StepType::Model,
            Self::Transform(_) => StepType::Transform,
            Self::RegisterModel(_) => StepType::RegisterModel,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Processing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingJobArguments {
    pub processing_resources: ProcessingResources,
    pub app_specification: AppSpecification,
    pub role_arn: String,
    pub processing_inputs: Vec<ProcessingInput>,
    pub processing_output_config: ProcessingOutputConfig,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingResources {
    pub cluster_config: ClusterConfig,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterConfig {
    pub instance_type: String,
    pub instance_count: u32,
    #[serde(rename = "VolumeSizeInGB")]
    pub volume_size_in_gb: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct AppSpecification {
    pub image_uri: String,
    pub container_entrypoint: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingInput {
    pub input_name: String,
    pub app_managed: bool,
    pub s3_input: S3Input,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct S3Input {
    pub s3_uri: Value,
    pub local_path: String,
    pub s3_data_type: String,
    pub s3_input_mode: String,
    pub s3_data_distribution_type: String,
    pub s3_compression_type: String,
}

impl S3Input {
    /// File-mode, fully replicated prefix input
    pub fn prefix(s3_uri: Value, local_path: impl Into<String>) -> Self {
        Self {
            s3_uri,
            local_path: local_path.into(),
            s3_data_type: "S3Prefix".into(),
            s3_input_mode: "File".into(),
            s3_data_distribution_type: "FullyReplicated".into(),
            s3_compression_type: "None".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingOutputConfig {
    pub outputs: Vec<ProcessingOutput>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingOutput {
    pub output_name: String,
    pub app_managed: bool,
    pub s3_output: S3Output,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct S3Output {
    pub s3_uri: Value,
    pub local_path: String,
    pub s3_upload_mode: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Training
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TrainingJobArguments {
    pub algorithm_specification: AlgorithmSpecification,
    pub output_data_config: OutputDataConfig,
    pub stopping_condition: StoppingCondition,
    pub resource_config: ResourceConfig,
    pub role_arn: String,
    pub input_data_config: Vec<Channel>,
    pub hyper_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AlgorithmSpecification {
    pub training_image: String,
    pub training_input_mode: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct OutputDataConfig {
    pub s3_output_path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StoppingCondition {
    pub max_runtime_in_seconds: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceConfig {
    #[serde(rename = "VolumeSizeInGB")]
    pub volume_size_in_gb: u32,
    pub instance_count: u32,
    pub instance_type: String,
}

/// A named training input channel
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Channel {
    pub data_source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub channel_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DataSource {
    pub s3_data_source: S3DataSource,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct S3DataSource {
    pub s3_data_type: String,
    pub s3_uri: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_data_distribution_type: Option<String>,
}

impl DataSource {
    /// Prefix data source; training channels are fully replicated
    pub fn prefix(s3_uri: Value, replicated: bool) -> Self {
        Self {
            s3_data_source: S3DataSource {
                s3_data_type: "S3Prefix".into(),
                s3_uri,
                s3_data_distribution_type: replicated.then(|| "FullyReplicated".to_string()),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Model and transform
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateModelArguments {
    pub execution_role_arn: String,
    pub primary_container: ContainerDefinition,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDefinition {
    pub image: String,
    pub model_data_url: Value,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TransformJobArguments {
    pub model_name: Value,
    pub transform_input: TransformInput,
    pub transform_output: TransformOutput,
    pub transform_resources: TransformResources,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TransformInput {
    pub data_source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TransformOutput {
    pub s3_output_path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TransformResources {
    pub instance_count: u32,
    pub instance_type: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterModelArguments {
    pub model_package_group_name: String,
    pub model_approval_status: String,
    pub inference_specification: InferenceSpecification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_metrics: Option<ModelMetrics>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InferenceSpecification {
    pub containers: Vec<ContainerDefinition>,
    pub supported_content_types: Vec<String>,
    #[serde(rename = "SupportedResponseMIMETypes")]
    pub supported_response_mime_types: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_field_name() {
        let config = ClusterConfig {
            instance_type: "ml.m5.xlarge".into(),
            instance_count: 1,
            volume_size_in_gb: DEFAULT_VOLUME_SIZE_GB,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["VolumeSizeInGB"], 30);
        assert_eq!(json["InstanceType"], "ml.m5.xlarge");
    }

    #[test]
    fn test_transform_source_is_not_replicated() {
        let source = DataSource::prefix(Value::literal("s3://b/batch.csv"), false);
        let json = serde_json::to_value(&source).unwrap();
        assert!(json["S3DataSource"].get("S3DataDistributionType").is_none());
        assert_eq!(json["S3DataSource"]["S3Uri"], "s3://b/batch.csv");
    }
}
