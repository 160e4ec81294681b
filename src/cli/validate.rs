// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_manifest, manifest_base};
use crate::pipeline::{PipelineValidator, SourceEntry};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let manifest = match load_manifest(&pipeline_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("  {} Failed to parse pipeline", "✗".red());
            eprintln!();
            return Err(e);
        }
    };

    println!("  {} Pipeline file parsed", "✓".green());

    let mut validation = PipelineValidator::validate(&manifest)?;
    if let Some(warning) =
        PipelineValidator::runtime_warning(&manifest, &manifest_base(&pipeline_path))
    {
        validation.add_warning(&warning);
    }
    let missing_files =
        PipelineValidator::validate_files(&manifest, &manifest_base(&pipeline_path))?;

    let mut has_issues = false;

    if !validation.errors.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !missing_files.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Missing files".yellow().bold());
        for missing in &missing_files {
            println!("  {} {}", "⚠".yellow(), missing);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", manifest.name);
        println!("  Region: {}", manifest.region);
        println!("  Steps: {}", manifest.steps.len());
        for step in &manifest.steps {
            let refs: Vec<String> = step
                .sources()
                .iter()
                .filter_map(|(_, source)| match source {
                    SourceEntry::Location(_) => None,
                    other => other.referenced_step().map(|(name, _)| name.to_string()),
                })
                .collect();
            let refs = if refs.is_empty() {
                String::new()
            } else {
                format!(" [uses: {}]", refs.join(", "))
            };
            println!("    - {} ({}){}", step.name(), step.kind(), refs.dimmed());
        }
    }

    println!();

    if has_issues {
        Err(miette::miette!("Pipeline validation failed"))
    } else if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
        Ok(())
    }
}
