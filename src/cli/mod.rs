// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for smflow.

pub mod build;
pub mod exec;
pub mod run;
pub mod validate;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::errors::{FacadeError, RecoverySuggestion};
use crate::pipeline::Manifest;

/// SageMaker pipeline facade
///
/// Build and submit SageMaker pipelines from declarative steps.
#[derive(Parser, Debug)]
#[clap(
    name = "smflow",
    version,
    about = "Declarative facade over SageMaker model building pipelines",
    long_about = None,
    after_help = "Examples:\n\
        smflow validate                 Check the pipeline file\n\
        smflow build                    Render the pipeline definition\n\
        smflow run --dry-run            Assemble without calling AWS\n\
        smflow run                      Upload, submit and start an execution\n\n\
        See 'smflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        #[clap(short, long, default_value = crate::DEFAULT_MANIFEST)]
        pipeline: PathBuf,
    },

    /// Render the pipeline definition without submitting it
    Build {
        /// Pipeline file
        #[clap(short, long, default_value = crate::DEFAULT_MANIFEST)]
        pipeline: PathBuf,

        /// Where to write the definition (default: <lib_dir>/export/<name>.definition.json)
        #[clap(short, long)]
        output: Option<PathBuf>,

        #[clap(flatten)]
        overrides: Overrides,
    },

    /// Upload local artifacts, submit the pipeline and start an execution
    Run {
        /// Pipeline file
        #[clap(short, long, default_value = crate::DEFAULT_MANIFEST)]
        pipeline: PathBuf,

        /// Assemble and record service calls without contacting AWS
        #[clap(long)]
        dry_run: bool,

        /// AWS CLI profile
        #[clap(long, env = "AWS_PROFILE")]
        profile: Option<String>,

        #[clap(flatten)]
        overrides: Overrides,
    },

    /// Run a processing step body (used by generated entry points)
    ExecStep {
        /// Step snapshot file
        #[clap(long, value_name = "FILE")]
        snapshot: PathBuf,
    },
}

/// Values that override the pipeline file
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// AWS region
    #[clap(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Execution role ARN
    #[clap(long, env = "SMFLOW_ROLE")]
    pub role: Option<String>,

    /// Artifact bucket
    #[clap(long, env = "SMFLOW_BUCKET")]
    pub bucket: Option<String>,
}

impl Overrides {
    pub fn apply(&self, manifest: &mut Manifest) {
        if let Some(region) = &self.region {
            manifest.region = region.clone();
        }
        if let Some(role) = &self.role {
            manifest.role = role.clone();
        }
        if let Some(bucket) = &self.bucket {
            manifest.bucket = bucket.clone();
        }
    }
}

/// Load a pipeline file, reporting problems the way every command does
pub(crate) fn load_manifest(path: &Path) -> miette::Result<Manifest> {
    Manifest::from_file(path).map_err(|e| {
        report_failure(&e);
        miette::Report::new(e)
    })
}

/// Directory relative manifest paths resolve against
pub(crate) fn manifest_base(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print a recovery suggestion for an error, if one applies
pub(crate) fn report_failure(error: &FacadeError) {
    if let Some(suggestion) = RecoverySuggestion::for_error(error) {
        eprintln!();
        eprint!("{}", suggestion.to_string().yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "smflow",
            "run",
            "--dry-run",
            "--pipeline",
            "ml/pipeline.yaml",
            "--region",
            "eu-west-1",
        ]);

        match cli.command {
            Commands::Run {
                pipeline,
                dry_run,
                overrides,
                ..
            } => {
                assert_eq!(pipeline, PathBuf::from("ml/pipeline.yaml"));
                assert!(dry_run);
                assert_eq!(overrides.region.as_deref(), Some("eu-west-1"));
            }
            other => panic!("Expected run command, got {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut manifest = Manifest::from_yaml(
            "name: A\nbucket: b\nrole: arn:r\nregion: us-east-1\nsteps: []\n",
        )
        .unwrap();

        Overrides {
            region: None,
            role: None,
            bucket: Some("other-bucket".into()),
        }
        .apply(&mut manifest);

        assert_eq!(manifest.bucket, "other-bucket");
        assert_eq!(manifest.region, "us-east-1");
    }

    #[test]
    fn test_manifest_base() {
        assert_eq!(manifest_base(Path::new(".smflow.yaml")), PathBuf::from("."));
        assert_eq!(manifest_base(Path::new("ml/p.yaml")), PathBuf::from("ml"));
    }
}
