// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Model registration step

use serde::{Deserialize, Serialize};

use super::Param;
use crate::metrics::MetricsRef;
use crate::workflow::PipelineStep;

/// Approval status of a registered model package
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ApprovalStatus {
    Approved,
    Rejected,
    #[default]
    PendingManualApproval,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
            Self::PendingManualApproval => write!(f, "PendingManualApproval"),
        }
    }
}

/// Registers a created model in a model package group
#[derive(Debug, Clone)]
pub struct RegisterStep {
    pub name: String,
    /// Model created by a batch transform step
    pub model: Param,
    pub group_name: String,
    pub approval_status: ApprovalStatus,
    pub content_types: Vec<String>,
    pub response_types: Vec<String>,
    /// Report of an evaluation step, attached as model quality statistics
    pub metrics: Option<MetricsRef>,
    parsed_step: Option<PipelineStep>,
}

impl RegisterStep {
    pub fn new(name: impl Into<String>, model: Param, group_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model,
            group_name: group_name.into(),
            approval_status: ApprovalStatus::default(),
            content_types: vec!["text/csv".into()],
            response_types: vec!["text/csv".into()],
            metrics: None,
            parsed_step: None,
        }
    }

    pub fn with_approval_status(mut self, status: ApprovalStatus) -> Self {
        self.approval_status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_types = vec![content_type.into()];
        self
    }

    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_types = vec![response_type.into()];
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsRef) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn parsed_step(&self) -> Option<&PipelineStep> {
        self.parsed_step.as_ref()
    }

    pub(crate) fn record_parse(&mut self, step: PipelineStep) {
        self.parsed_step = Some(step);
    }
}
