// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Generated entry point scripts

use std::path::{Path, PathBuf};

use super::StepSnapshot;
use crate::errors::{FacadeError, FacadeResult};

const SNAPSHOT_PLACEHOLDER: &str = "{{snapshot}}";
const SNAPSHOT_DELIMITER: &str = "__SMFLOW_SNAPSHOT__";

/// Entry point template; the snapshot replaces `{{snapshot}}`
///
/// The script lives in `<lib>/export/`. It runs `<lib>/bin/smflow` when
/// present and falls back to `smflow` on the image's PATH; with neither it
/// exits with status 127.
pub const ENTRYPOINT_TEMPLATE: &str = r#"#!/usr/bin/env bash
# Generated by smflow. Do not edit.
set -euo pipefail

HERE="$(cd "$(dirname "${BASH_SOURCE[0]}")" && pwd)"
LIB_DIR="$(dirname "$HERE")"
SMFLOW_BIN="${SMFLOW_BIN:-$LIB_DIR/bin/smflow}"
if [ ! -x "$SMFLOW_BIN" ]; then
    SMFLOW_BIN="$(command -v smflow || true)"
fi
if [ -z "$SMFLOW_BIN" ] || [ ! -x "$SMFLOW_BIN" ]; then
    echo "smflow: binary not found in $LIB_DIR/bin or PATH" >&2
    exit 127
fi

SNAPSHOT_FILE="$(mktemp)"
cat > "$SNAPSHOT_FILE" <<'__SMFLOW_SNAPSHOT__'
{{snapshot}}
__SMFLOW_SNAPSHOT__

exec "$SMFLOW_BIN" exec-step --snapshot "$SNAPSHOT_FILE"
"#;

/// Fill the template with a snapshot
pub fn render_entrypoint(snapshot: &StepSnapshot) -> FacadeResult<String> {
    let json = snapshot.to_json()?;
    Ok(ENTRYPOINT_TEMPLATE.replace(SNAPSHOT_PLACEHOLDER, &json))
}

/// Pull the embedded snapshot back out of a rendered script
pub fn extract_snapshot(script: &str) -> Option<&str> {
    let start_marker = format!("<<'{}'\n", SNAPSHOT_DELIMITER);
    let start = script.find(&start_marker)? + start_marker.len();
    let end_marker = format!("\n{}\n", SNAPSHOT_DELIMITER);
    let end = start + script[start..].find(&end_marker)?;
    Some(&script[start..end])
}

/// Write `{export_dir}/{step}.sh`, creating the directory if needed
pub fn write_entrypoint(export_dir: &Path, step: &str, content: &str) -> FacadeResult<PathBuf> {
    std::fs::create_dir_all(export_dir).map_err(|e| FacadeError::FileWriteError {
        path: export_dir.to_path_buf(),
        error: e.to_string(),
    })?;

    let path = export_dir.join(format!("{}.sh", step));
    std::fs::write(&path, content).map_err(|e| FacadeError::FileWriteError {
        path: path.clone(),
        error: e.to_string(),
    })?;

    tracing::debug!(path = %path.display(), "wrote entry point");
    Ok(path)
}
