// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Exec-step command - run a processing step body inside its container

use miette::Result;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Run the exec-step command
///
/// Only shell bodies run here; handler bodies need a binary that registered
/// them on its own [`Runtime`].
pub async fn run(snapshot: PathBuf, verbose: bool) -> Result<()> {
    if verbose {
        tracing::info!(snapshot = %snapshot.display(), "executing step snapshot");
    }

    Runtime::new().run_file(&snapshot).await.map_err(|e| {
        super::report_failure(&e);
        miette::Report::new(e)
    })
}
