// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Input/output access for step bodies

use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use super::{SnapshotParam, SnapshotPayload};
use crate::errors::{FacadeError, FacadeResult};
use crate::steps::MountDirs;

/// What a step body sees of its step
#[derive(Debug, Clone)]
pub struct StepContext {
    step: String,
    dirs: MountDirs,
    inputs: Vec<SnapshotParam>,
    outputs: Vec<SnapshotParam>,
}

impl StepContext {
    pub fn from_payload(payload: &SnapshotPayload) -> Self {
        Self {
            step: payload.step.clone(),
            dirs: payload.dirs.clone(),
            inputs: payload.inputs.clone(),
            outputs: payload.outputs.clone(),
        }
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn dirs(&self) -> &MountDirs {
        &self.dirs
    }

    pub fn outputs(&self) -> &[SnapshotParam] {
        &self.outputs
    }

    /// Path of a file inside a named input
    pub fn input_path(&self, input: &str, file: &str) -> PathBuf {
        let base = self
            .inputs
            .iter()
            .find(|p| p.name == input)
            .map(|p| PathBuf::from(&p.local_path))
            .unwrap_or_else(|| Path::new(&self.dirs.input_dir).join(input));
        base.join(file)
    }

    /// Path of a file inside a named output
    pub fn output_path(&self, output: &str, file: &str) -> PathBuf {
        let base = self
            .outputs
            .iter()
            .find(|p| p.name == output)
            .map(|p| PathBuf::from(&p.local_path))
            .unwrap_or_else(|| Path::new(&self.dirs.output_dir).join(output));
        base.join(file)
    }

    /// Create every output directory
    pub fn prepare_outputs(&self) -> FacadeResult<()> {
        for output in &self.outputs {
            let path = PathBuf::from(&output.local_path);
            std::fs::create_dir_all(&path).map_err(|e| FacadeError::FileWriteError {
                path,
                error: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Read a CSV file of an input as rows of fields
    pub fn read_input_csv(&self, input: &str, file: &str) -> FacadeResult<Vec<Vec<String>>> {
        let path = self.input_path(input, file);
        let read_error = |e: csv::Error| FacadeError::FileReadError {
            path: path.clone(),
            error: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(read_error)?;

        reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(read_error)
            })
            .collect()
    }

    /// Write rows to `{output}/{file}`, `{output}.csv` by default
    pub fn write_output_csv<T: Display>(
        &self,
        output: &str,
        rows: &[Vec<T>],
        file: Option<&str>,
    ) -> FacadeResult<()> {
        let default_name = format!("{}.csv", output);
        let path = self.output_path(output, file.unwrap_or(&default_name));
        let write_error = |error: String| FacadeError::FileWriteError {
            path: path.clone(),
            error,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());
        for row in rows {
            writer
                .write_record(row.iter().map(|f| f.to_string()))
                .map_err(|e| write_error(e.to_string()))?;
        }
        let content = writer
            .into_inner()
            .map_err(|e| write_error(e.to_string()))?;

        write_file(&path, &content)
    }

    /// Write a JSON document to `{output}/{file}`, `{output}.json` by default
    pub fn write_output_json<T: Serialize>(
        &self,
        output: &str,
        value: &T,
        file: Option<&str>,
    ) -> FacadeResult<()> {
        let default_name = format!("{}.json", output);
        let path = self.output_path(output, file.unwrap_or(&default_name));
        let json = serde_json::to_vec_pretty(value)?;
        write_file(&path, &json)
    }
}

fn write_file(path: &Path, content: &[u8]) -> FacadeResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FacadeError::FileWriteError {
            path: parent.to_path_buf(),
            error: e.to_string(),
        })?;
    }

    std::fs::write(path, content).map_err(|e| FacadeError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::StepBody;

    fn context(root: &Path) -> StepContext {
        StepContext::from_payload(&SnapshotPayload {
            step: "CreateDataset".into(),
            body: StepBody::shell("true"),
            dirs: MountDirs {
                code_dir: root.join("code").to_string_lossy().to_string(),
                input_dir: root.join("input").to_string_lossy().to_string(),
                output_dir: root.join("output").to_string_lossy().to_string(),
            },
            inputs: vec![SnapshotParam {
                name: "data".into(),
                local_path: root.join("input/data").to_string_lossy().to_string(),
                content_type: None,
                property: false,
            }],
            outputs: vec![],
        })
    }

    #[test]
    fn test_read_and_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        std::fs::create_dir_all(dir.path().join("input/data")).unwrap();
        std::fs::write(dir.path().join("input/data/data.csv"), "M,0.455\r\nF,0.53\n\n").unwrap();

        let rows = ctx.read_input_csv("data", "data.csv").unwrap();
        assert_eq!(rows, vec![vec!["M", "0.455"], vec!["F", "0.53"]]);

        ctx.write_output_csv("train", &rows, None).unwrap();
        let written = std::fs::read_to_string(dir.path().join("output/train/train.csv")).unwrap();
        assert_eq!(written, "M,0.455\nF,0.53\n");
    }

    #[test]
    fn test_csv_fields_with_separators_survive() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let rows = vec![
            vec!["a\nb".to_string(), "c".to_string()],
            vec!["say \"hi\"".to_string(), "x,y".to_string()],
            vec!["cr\rlf".to_string(), String::new()],
            vec![String::new()],
        ];
        ctx.write_output_csv("train", &rows, None).unwrap();

        std::fs::create_dir_all(dir.path().join("input")).unwrap();
        std::fs::rename(dir.path().join("output/train"), dir.path().join("input/data")).unwrap();

        let read = ctx.read_input_csv("data", "train.csv").unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_missing_input_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = context(dir.path()).read_input_csv("data", "nope.csv").unwrap_err();
        assert!(matches!(err, FacadeError::FileReadError { .. }));
    }
}
