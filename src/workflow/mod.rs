// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Provider-native pipeline documents
//!
//! Typed rendering of the SageMaker pipeline definition format: steps,
//! their request arguments, and the property expressions that defer a value
//! to execution time.

mod arguments;

pub use arguments::*;

use serde::Serialize;

/// Definition document version understood by the service
pub const DEFINITION_VERSION: &str = "2020-12-01";

/// Deferred expression, resolved by the service at execution time
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum Expr {
    /// Property reference such as `Steps.Train.ModelArtifacts.S3ModelArtifacts`
    #[serde(rename = "Get")]
    Get(String),

    /// String concatenation
    #[serde(rename = "Std:Join")]
    Join {
        #[serde(rename = "On")]
        on: String,
        #[serde(rename = "Values")]
        values: Vec<Value>,
    },

    /// Field lookup inside a property file
    #[serde(rename = "Std:JsonGet")]
    JsonGet {
        #[serde(rename = "PropertyFile")]
        property_file: Box<Expr>,
        #[serde(rename = "Path")]
        path: String,
    },
}

impl Expr {
    /// The property path of a `Get` expression
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Get(path) => Some(path),
            _ => None,
        }
    }

    /// Join this expression with literal suffix segments
    pub fn join(self, on: &str, suffix: &[&str]) -> Self {
        let mut values = vec![Value::Expr(self)];
        values.extend(suffix.iter().map(|s| Value::Literal(s.to_string())));
        Self::Join {
            on: on.to_string(),
            values,
        }
    }
}

/// A literal or a deferred value
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Expr(Expr),
    Literal(String),
}

impl Value {
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// The literal string, if this value is known at definition time
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            Self::Expr(_) => None,
        }
    }

    /// Append a path segment, keeping deferred values deferred
    pub fn join_path(&self, segment: &str) -> Self {
        match self {
            Self::Literal(s) => Self::Literal(format!("{}/{}", s.trim_end_matches('/'), segment)),
            Self::Expr(expr) => Self::Expr(expr.clone().join("/", &[segment])),
        }
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{}", s),
            Self::Expr(expr) => match serde_json::to_string(expr) {
                Ok(json) => write!(f, "{}", json),
                Err(_) => write!(f, "<expression>"),
            },
        }
    }
}

/// Step type tag of the definition format
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum StepType {
    Processing,
    Training,
    Model,
    Transform,
    RegisterModel,
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "Processing"),
            Self::Training => write!(f, "Training"),
            Self::Model => write!(f, "Model"),
            Self::Transform => write!(f, "Transform"),
            Self::RegisterModel => write!(f, "RegisterModel"),
        }
    }
}

/// Property file attached to a processing step
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyFile {
    pub property_file_name: String,
    pub output_name: String,
    pub file_path: String,
}

impl PropertyFile {
    /// Property file for an output, stored as `{name}.json`
    pub fn for_output(name: &str) -> Self {
        Self {
            property_file_name: name.to_string(),
            output_name: name.to_string(),
            file_path: format!("{}.json", name),
        }
    }
}

/// A provider-native pipeline step
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineStep {
    pub name: String,
    #[serde(rename = "Type")]
    pub step_type: StepType,
    pub arguments: StepArguments,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub property_files: Vec<PropertyFile>,
}

impl PipelineStep {
    pub fn new(name: impl Into<String>, arguments: StepArguments) -> Self {
        Self {
            name: name.into(),
            step_type: arguments.step_type(),
            arguments,
            property_files: Vec::new(),
        }
    }

    /// Property references of this step
    pub fn properties(&self) -> Properties<'_> {
        Properties { step: &self.name }
    }

    /// Processing arguments, if this is a processing step
    pub fn processing(&self) -> Option<&ProcessingJobArguments> {
        match &self.arguments {
            StepArguments::Processing(args) => Some(args),
            _ => None,
        }
    }

    /// The configured S3 destination of a named processing output
    pub fn processing_output_uri(&self, output: &str) -> Option<&Value> {
        self.processing()?
            .processing_output_config
            .outputs
            .iter()
            .find(|o| o.output_name == output)
            .map(|o| &o.s3_output.s3_uri)
    }
}

/// Builder of `Get` expressions rooted at one step
#[derive(Debug, Clone, Copy)]
pub struct Properties<'a> {
    step: &'a str,
}

impl Properties<'_> {
    /// S3 URI of a processing output
    pub fn processing_output(&self, output: &str) -> Expr {
        Expr::Get(format!(
            "Steps.{}.ProcessingOutputConfig.Outputs['{}'].S3Output.S3Uri",
            self.step, output
        ))
    }

    /// S3 URI of the model artifacts produced by a training step
    pub fn model_artifacts(&self) -> Expr {
        Expr::Get(format!("Steps.{}.ModelArtifacts.S3ModelArtifacts", self.step))
    }

    /// Name of the model created by a model step
    pub fn model_name(&self) -> Expr {
        Expr::Get(format!("Steps.{}.ModelName", self.step))
    }

    /// A property file of a processing step
    pub fn property_file(&self, name: &str) -> Expr {
        Expr::Get(format!("Steps.{}.PropertyFiles.{}", self.step, name))
    }

    /// A field inside a property file, addressed by JSON path
    pub fn json_get(&self, property_file: &str, path: &str) -> Expr {
        Expr::JsonGet {
            property_file: Box::new(self.property_file(property_file)),
            path: path.to_string(),
        }
    }
}

/// Full pipeline definition document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineDefinition {
    pub version: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub parameters: Vec<serde_json::Value>,
    pub pipeline_experiment_config: ExperimentConfig,
    pub steps: Vec<PipelineStep>,
}

/// Experiment tracking names, resolved per execution
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentConfig {
    pub experiment_name: Expr,
    pub trial_name: Expr,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            experiment_name: Expr::Get("Execution.PipelineName".into()),
            trial_name: Expr::Get("Execution.PipelineExecutionId".into()),
        }
    }
}

impl PipelineDefinition {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Self {
            version: DEFINITION_VERSION.to_string(),
            metadata: serde_json::Map::new(),
            parameters: Vec::new(),
            pipeline_experiment_config: ExperimentConfig::default(),
            steps,
        }
    }

    /// Render as the JSON document submitted to the service
    pub fn to_json(&self) -> Result<String, crate::FacadeError> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_serializes_as_object() {
        let value = Value::from(Expr::Get("Steps.A.ModelName".into()));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, serde_json::json!({"Get": "Steps.A.ModelName"}));
    }

    #[test]
    fn test_literal_serializes_as_string() {
        let json = serde_json::to_value(Value::literal("s3://b/k")).unwrap();
        assert_eq!(json, serde_json::json!("s3://b/k"));
    }

    #[test]
    fn test_join_path_on_deferred_value() {
        let value = Value::from(Expr::Get("Steps.A.X".into())).join_path("evaluation.json");
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Std:Join": {"On": "/", "Values": [{"Get": "Steps.A.X"}, "evaluation.json"]}})
        );
    }

    #[test]
    fn test_join_path_on_literal() {
        let value = Value::literal("s3://b/out/").join_path("evaluation.json");
        assert_eq!(value.as_literal(), Some("s3://b/out/evaluation.json"));
    }

    #[test]
    fn test_json_get_expression() {
        let step = PipelineStep::new(
            "Evaluation",
            StepArguments::Processing(ProcessingJobArguments::default()),
        );
        let expr = step.properties().json_get("evaluation", "regression_metrics.mse.value");
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(
            json["Std:JsonGet"]["PropertyFile"]["Get"],
            "Steps.Evaluation.PropertyFiles.evaluation"
        );
        assert_eq!(json["Std:JsonGet"]["Path"], "regression_metrics.mse.value");
    }

    #[test]
    fn test_definition_shape() {
        let definition = PipelineDefinition::new(vec![]);
        let json: serde_json::Value =
            serde_json::from_str(&definition.to_json().unwrap()).unwrap();
        assert_eq!(json["Version"], DEFINITION_VERSION);
        assert_eq!(
            json["PipelineExperimentConfig"]["ExperimentName"]["Get"],
            "Execution.PipelineName"
        );
        assert!(json["Steps"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_step_fields() {
        let step = PipelineStep::new(
            "Prepare",
            StepArguments::Processing(ProcessingJobArguments::default()),
        );
        let json = serde_json::to_value(&step).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["Arguments", "Name", "Type"]);
    }
}
