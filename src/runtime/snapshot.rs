// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Versioned step snapshots
//!
//! The declarative state a processing step needs inside its container.
//! Input sources are stripped: the service stages inputs into their local
//! paths before the container starts.

use serde::{Deserialize, Serialize};

use super::StepBody;
use crate::errors::{FacadeError, FacadeResult};
use crate::steps::{MountDirs, ProcessingStep};

/// Current snapshot format
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One input or output as seen from inside the container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotParam {
    pub name: String,
    pub local_path: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub property: bool,
}

/// Snapshot contents covered by the digest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotPayload {
    pub step: String,
    pub body: StepBody,
    pub dirs: MountDirs,
    pub inputs: Vec<SnapshotParam>,
    pub outputs: Vec<SnapshotParam>,
}

/// Versioned, integrity-checked step snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSnapshot {
    pub format_version: u32,
    /// BLAKE3 digest of the serialized payload
    pub digest: String,
    pub payload: SnapshotPayload,
}

impl StepSnapshot {
    /// Capture a processing step with its mount points
    pub fn capture(step: &ProcessingStep, dirs: &MountDirs) -> FacadeResult<Self> {
        let inputs = step
            .inputs
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let name = param.name_or("input", i);
                SnapshotParam {
                    local_path: param
                        .destination
                        .clone()
                        .unwrap_or_else(|| format!("{}/{}", dirs.input_dir, name)),
                    name,
                    content_type: param.content_type.clone(),
                    property: false,
                }
            })
            .collect();

        let outputs = step
            .outputs
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let name = param.name_or("output", i);
                SnapshotParam {
                    local_path: format!("{}/{}", dirs.output_dir, name),
                    name,
                    content_type: param.content_type.clone(),
                    property: param.is_property(),
                }
            })
            .collect();

        let payload = SnapshotPayload {
            step: step.name.clone(),
            body: step.body.clone(),
            dirs: dirs.clone(),
            inputs,
            outputs,
        };

        Ok(Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            digest: digest(&payload)?,
            payload,
        })
    }

    pub fn to_json(&self) -> FacadeResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    pub fn from_json(json: &str) -> FacadeResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Check the format version and the payload digest
    pub fn verify(&self) -> FacadeResult<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(FacadeError::SnapshotVersion {
                found: self.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }

        if digest(&self.payload)? != self.digest {
            return Err(FacadeError::SnapshotDigest {
                step: self.payload.step.clone(),
            });
        }

        Ok(())
    }
}

fn digest(payload: &SnapshotPayload) -> FacadeResult<String> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
