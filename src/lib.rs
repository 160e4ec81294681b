// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! # smflow - SageMaker pipeline facade
//!
//! `smflow` turns a handful of declarative step objects into a SageMaker
//! Model Building Pipeline definition and submits it.
//!
//! ## Features
//!
//! - **Four step kinds** - processing, training, batch transform, register
//! - **Data wiring** - outputs of one step become inputs of the next as
//!   deferred property references
//! - **Generated entry points** - processing steps ship a verified snapshot
//!   of themselves to the container
//! - **Manifests** - the same pipeline as a YAML, JSON or TOML file
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a pipeline file
//! smflow validate
//!
//! # Render the definition without submitting
//! smflow build
//!
//! # Upload, submit and start an execution
//! smflow run
//! ```

pub mod cli;
pub mod errors;
pub mod images;
pub mod metrics;
pub mod parsers;
pub mod pipeline;
pub mod runtime;
pub mod service;
pub mod steps;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use errors::{FacadeError, FacadeResult};
pub use images::Framework;
pub use metrics::{EvaluationReport, MetricsRef};
pub use pipeline::{Manifest, Pipeline, PipelineConfig};
pub use runtime::{Runtime, StepBody, StepContext, StepHandler};
pub use steps::{
    ApprovalStatus, BatchTransformStep, FacadeStep, ModelArgs, Param, ProcessingStep,
    RegisterStep, Source, TrainingStep,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Instance type of every job the facade creates
pub const DEFAULT_INSTANCE_TYPE: &str = "ml.m5.xlarge";

/// Instance count of every job the facade creates
pub const DEFAULT_INSTANCE_COUNT: u32 = 1;

/// Support library directory, relative to the project root
pub const DEFAULT_LIB_DIR: &str = ".smflow/lib";

/// Default pipeline manifest
pub const DEFAULT_MANIFEST: &str = ".smflow.yaml";
