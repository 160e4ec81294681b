// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! smflow - SageMaker pipeline facade
//!
//! Build, validate and submit SageMaker pipelines from declarative steps.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smflow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if !smflow::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Validate { pipeline } => smflow::cli::validate::run(pipeline, cli.verbose).await,
        Commands::Build {
            pipeline,
            output,
            overrides,
        } => smflow::cli::build::run(pipeline, output, overrides, cli.verbose).await,
        Commands::Run {
            pipeline,
            dry_run,
            profile,
            overrides,
        } => smflow::cli::run::run(pipeline, dry_run, profile, overrides, cli.verbose).await,
        Commands::ExecStep { snapshot } => smflow::cli::exec::run(snapshot, cli.verbose).await,
    }
}
