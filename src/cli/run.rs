// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Run command - upload, submit and start the pipeline

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{load_manifest, manifest_base, report_failure, Overrides};
use crate::errors::FacadeError;
use crate::pipeline::{assemble, Manifest, PipelineValidator};
use crate::service::{AwsCli, ExecutionHandle, ObjectStore, RecordingService, WorkflowService};
use crate::utils::{create_spinner, print_error, print_info, print_success, print_warning};

/// Run the pipeline
pub async fn run(
    pipeline_path: PathBuf,
    dry_run: bool,
    profile: Option<String>,
    overrides: Overrides,
    verbose: bool,
) -> Result<()> {
    let mut manifest = load_manifest(&pipeline_path)?;
    overrides.apply(&mut manifest);

    check_valid(&manifest, verbose)?;

    let base = manifest_base(&pipeline_path);
    let missing = PipelineValidator::validate_files(&manifest, &base)?;
    if !missing.is_empty() {
        eprintln!("{}", "Missing local files:".red().bold());
        for m in &missing {
            print_error(m);
        }
        return Err(miette::miette!("Local sources are missing"));
    }

    if let Some(warning) = PipelineValidator::runtime_warning(&manifest, &base) {
        print_warning(&warning);
    }

    if dry_run {
        let backend = Arc::new(RecordingService::new());
        let handle = submit(&manifest, &base, backend.clone(), backend.as_ref()).await?;

        println!();
        println!("{}:", "Dry run".bold());
        for (local, target) in backend.uploads() {
            print_info(&format!("would upload {} → {}", local.display(), target));
        }
        for upsert in backend.upserts() {
            print_info(&format!(
                "would upsert pipeline '{}' as {}",
                upsert.name, upsert.role_arn
            ));
        }
        print_info(&format!("would start {}", handle.pipeline_name));
        return Ok(());
    }

    let aws = AwsCli::new()
        .map_err(fail)?
        .with_region(&manifest.region)
        .with_profile(profile);

    if verbose {
        match aws.version().await {
            Ok(version) => print_info(&format!("Using {}", version)),
            Err(e) => print_warning(&format!("Could not read AWS CLI version: {}", e)),
        }
    }

    let aws = Arc::new(aws);
    let handle = submit(&manifest, &base, aws.clone(), aws.as_ref()).await?;

    println!();
    println!("{}", "Pipeline execution started".green().bold());
    println!("  {}", handle.execution_arn);

    Ok(())
}

/// Fail on validation errors; print warnings when verbose
pub(crate) fn check_valid(manifest: &Manifest, verbose: bool) -> Result<()> {
    let validation = PipelineValidator::validate(manifest)?;

    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            print_error(error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    Ok(())
}

async fn submit(
    manifest: &Manifest,
    base: &Path,
    store: Arc<dyn ObjectStore>,
    service: &dyn WorkflowService,
) -> Result<ExecutionHandle> {
    let spinner = create_spinner(&format!("Assembling {} step(s)...", manifest.steps.len()));
    let assembly = assemble(manifest, base, store).await;
    spinner.finish_and_clear();
    let assembly = assembly.map_err(fail)?;

    print_success(&format!(
        "Assembled {} provider step(s) under {}",
        assembly.pipeline.steps().len(),
        assembly.pipeline.base_s3_path()
    ));

    let spinner = create_spinner(&format!("Submitting '{}'...", manifest.name));
    let handle = assembly.pipeline.execute(service).await;
    spinner.finish_and_clear();
    let handle = handle.map_err(fail)?;

    print_success(&format!("Submitted '{}'", handle.pipeline_name));
    Ok(handle)
}

fn fail(error: FacadeError) -> miette::Report {
    report_failure(&error);
    miette::Report::new(error)
}
