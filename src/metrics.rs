// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Evaluation metrics wiring
//!
//! An evaluation step writes a JSON report as one of its outputs; the
//! registration step points the model package at that report, and
//! conditional logic can query fields inside it through a property file.

use serde::{Deserialize, Serialize};

use crate::errors::{FacadeError, FacadeResult};
use crate::workflow::{PipelineStep, StepType, Value};

/// Content type of metric reports
pub const METRICS_CONTENT_TYPE: &str = "application/json";

/// Model metrics attached to a model package
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_quality: Option<ModelQuality>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModelQuality {
    pub statistics: MetricsSource,
}

/// Location of a metrics document
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct MetricsSource {
    pub content_type: String,
    pub s3_uri: Value,
}

impl ModelMetrics {
    /// Model quality statistics read from a JSON report
    pub fn model_statistics(s3_uri: Value) -> Self {
        Self {
            model_quality: Some(ModelQuality {
                statistics: MetricsSource {
                    content_type: METRICS_CONTENT_TYPE.to_string(),
                    s3_uri,
                },
            }),
        }
    }
}

/// Reference to the report written by an upstream processing step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsRef {
    /// Name of the upstream processing step
    pub step: String,
    /// Output of that step holding the report
    pub output: String,
    /// File name inside the output, `{output}.json` when unset
    #[serde(default)]
    pub file: Option<String>,
}

impl MetricsRef {
    pub fn new(step: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            output: output.into(),
            file: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.file
            .clone()
            .unwrap_or_else(|| format!("{}.json", self.output))
    }

    /// Resolve against already parsed steps, looking the output up by name
    pub fn resolve(&self, parsed: &[PipelineStep]) -> FacadeResult<ModelMetrics> {
        let step = parsed
            .iter()
            .find(|s| s.name == self.step)
            .ok_or_else(|| FacadeError::Unparsed {
                step: self.step.clone(),
            })?;

        if step.step_type != StepType::Processing {
            return Err(FacadeError::ReferenceKindMismatch {
                step: self.step.clone(),
                expected: StepType::Processing.to_string(),
                actual: step.step_type.to_string(),
            });
        }

        let output_uri =
            step.processing_output_uri(&self.output)
                .ok_or_else(|| FacadeError::OutputNotFound {
                    step: self.step.clone(),
                    output: self.output.clone(),
                })?;

        Ok(ModelMetrics::model_statistics(
            output_uri.join_path(&self.file_name()),
        ))
    }
}

/// Regression report written by evaluation steps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub regression_metrics: RegressionMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionMetrics {
    pub mse: MetricValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricValue {
    pub value: f64,
    pub standard_deviation: f64,
}

impl EvaluationReport {
    /// Mean squared error and standard deviation of the residuals
    pub fn from_predictions(actual: &[f64], predicted: &[f64]) -> FacadeResult<Self> {
        if actual.len() != predicted.len() || actual.is_empty() {
            return Err(FacadeError::InvalidParam {
                step: "evaluation".into(),
                param: "predictions".into(),
                reason: format!(
                    "expected equally sized, non-empty series (got {} and {})",
                    actual.len(),
                    predicted.len()
                ),
            });
        }

        let n = actual.len() as f64;
        let residuals: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();
        let mse = residuals.iter().map(|r| r * r).sum::<f64>() / n;
        let mean = residuals.iter().sum::<f64>() / n;
        let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            regression_metrics: RegressionMetrics {
                mse: MetricValue {
                    value: mse,
                    standard_deviation: variance.sqrt(),
                },
            },
        })
    }

    /// JSON path of the MSE value, for `Std:JsonGet`
    pub fn mse_value_path() -> &'static str {
        "regression_metrics.mse.value"
    }
}
