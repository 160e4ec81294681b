// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Build command - render the pipeline definition

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{load_manifest, manifest_base, report_failure, Overrides};
use crate::pipeline::assemble;
use crate::service::RecordingService;

/// Run the build command
pub async fn run(
    pipeline_path: PathBuf,
    output: Option<PathBuf>,
    overrides: Overrides,
    verbose: bool,
) -> Result<()> {
    let mut manifest = load_manifest(&pipeline_path)?;
    overrides.apply(&mut manifest);

    super::run::check_valid(&manifest, verbose)?;

    // Nothing leaves the machine; uploads resolve to their target URIs
    let store = Arc::new(RecordingService::new());
    let base = manifest_base(&pipeline_path);

    let assembly = assemble(&manifest, &base, store.clone())
        .await
        .map_err(|e| {
            report_failure(&e);
            miette::Report::new(e)
        })?;

    let definition_path = match output {
        Some(path) => {
            let json = assembly.pipeline.definition().to_json()?;
            std::fs::write(&path, json).map_err(|e| {
                miette::miette!("Failed to write '{}': {}", path.display(), e)
            })?;
            path
        }
        None => assembly.pipeline.write_definition()?,
    };

    println!("{}:", "Steps".bold());
    for step in assembly.pipeline.steps() {
        println!("  {} {} ({})", "✓".green(), step.name, step.step_type);
    }

    if verbose {
        let uploads = store.uploads();
        if !uploads.is_empty() {
            println!();
            println!("{}:", "Uploads on run".bold());
            for (local, target) in uploads {
                println!("  {} {}", local.display(), format!("→ {}", target).dimmed());
            }
        }
    }

    println!();
    println!(
        "{} {}",
        "Definition written to".green().bold(),
        definition_path.display()
    );

    Ok(())
}
