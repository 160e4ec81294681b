// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Facade steps
//!
//! Declarative, provider-agnostic descriptions of pipeline stages and the
//! parameters flowing between them. A facade step is constructed unparsed,
//! filled in exactly once by its parser, and never mutated afterwards.

mod batch_transform;
mod param;
mod processing;
mod register;
mod training;

pub use batch_transform::BatchTransformStep;
pub use param::{ModelRef, Param, ParamKind, Source};
pub use processing::{MountDirs, ProcessingStep};
pub use register::{ApprovalStatus, RegisterStep};
pub use training::{ModelArgs, TrainingStep};

use crate::errors::{FacadeError, FacadeResult};
use crate::workflow::PipelineStep;

/// Kind of a facade step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Processing,
    Training,
    BatchTransform,
    Register,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Training => write!(f, "training"),
            Self::BatchTransform => write!(f, "batch_transform"),
            Self::Register => write!(f, "register"),
        }
    }
}

/// Any facade step
#[derive(Debug, Clone)]
pub enum FacadeStep {
    Processing(ProcessingStep),
    Training(TrainingStep),
    BatchTransform(BatchTransformStep),
    Register(RegisterStep),
}

impl FacadeStep {
    pub fn name(&self) -> &str {
        match self {
            Self::Processing(s) => &s.name,
            Self::Training(s) => &s.name,
            Self::BatchTransform(s) => &s.name,
            Self::Register(s) => &s.name,
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Processing(_) => StepKind::Processing,
            Self::Training(_) => StepKind::Training,
            Self::BatchTransform(_) => StepKind::BatchTransform,
            Self::Register(_) => StepKind::Register,
        }
    }

    /// The provider step recorded by the parser, `None` until parsed
    pub fn parsed_step(&self) -> Option<&PipelineStep> {
        match self {
            Self::Processing(s) => s.parsed_step(),
            Self::Training(s) => s.parsed_step(),
            Self::BatchTransform(s) => s.parsed_step(),
            Self::Register(s) => s.parsed_step(),
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed_step().is_some()
    }

    pub fn as_processing(&self) -> FacadeResult<&ProcessingStep> {
        match self {
            Self::Processing(s) => Ok(s),
            other => Err(other.kind_mismatch(StepKind::Processing)),
        }
    }

    pub fn as_training(&self) -> FacadeResult<&TrainingStep> {
        match self {
            Self::Training(s) => Ok(s),
            other => Err(other.kind_mismatch(StepKind::Training)),
        }
    }

    pub fn as_batch_transform(&self) -> FacadeResult<&BatchTransformStep> {
        match self {
            Self::BatchTransform(s) => Ok(s),
            other => Err(other.kind_mismatch(StepKind::BatchTransform)),
        }
    }

    fn kind_mismatch(&self, expected: StepKind) -> FacadeError {
        FacadeError::ReferenceKindMismatch {
            step: self.name().to_string(),
            expected: expected.to_string(),
            actual: self.kind().to_string(),
        }
    }
}

impl From<ProcessingStep> for FacadeStep {
    fn from(step: ProcessingStep) -> Self {
        Self::Processing(step)
    }
}

impl From<TrainingStep> for FacadeStep {
    fn from(step: TrainingStep) -> Self {
        Self::Training(step)
    }
}

impl From<BatchTransformStep> for FacadeStep {
    fn from(step: BatchTransformStep) -> Self {
        Self::BatchTransform(step)
    }
}

impl From<RegisterStep> for FacadeStep {
    fn from(step: RegisterStep) -> Self {
        Self::Register(step)
    }
}

/// Fail unless the step has been parsed
pub(crate) fn require_parsed<'a>(
    name: &str,
    parsed: Option<&'a PipelineStep>,
) -> FacadeResult<&'a PipelineStep> {
    parsed.ok_or_else(|| FacadeError::Unparsed {
        step: name.to_string(),
    })
}

/// Fail if the step has already been parsed
pub(crate) fn require_unparsed(name: &str, parsed: Option<&PipelineStep>) -> FacadeResult<()> {
    match parsed {
        Some(_) => Err(FacadeError::AlreadyParsed {
            step: name.to_string(),
        }),
        None => Ok(()),
    }
}
