// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Pipelines
//!
//! The [`Pipeline`] accumulator, plus the manifest format that describes a
//! pipeline declaratively and the validation and assembly built on it.

mod assemble;
mod builder;
mod manifest;
mod validation;

pub use assemble::{assemble, assemble_into, Assembly};
pub use builder::{Pipeline, PipelineConfig};
pub use manifest::{Manifest, OutputEntry, ParamEntry, SourceEntry, StepEntry};
pub use validation::{PipelineValidator, ValidationResult};
