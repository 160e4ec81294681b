// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Container-side runtime
//!
//! A processing step runs inside its container through a generated entry
//! point. The entry point embeds a [`StepSnapshot`] of the step and hands it
//! to `smflow exec-step`, which verifies the snapshot and runs the step body.
//!
//! Bodies are either a shell command or a named handler. Handlers are plain
//! Rust code registered on a [`Runtime`]; a crate that defines handlers
//! builds its own container binary:
//!
//! ```no_run
//! use smflow::runtime::{Runtime, StepContext, StepHandler};
//! use smflow::FacadeResult;
//!
//! struct Split;
//!
//! #[async_trait::async_trait]
//! impl StepHandler for Split {
//!     async fn execute(&self, ctx: &StepContext, _args: &serde_json::Value) -> FacadeResult<()> {
//!         let rows = ctx.read_input_csv("data", "data.csv")?;
//!         ctx.write_output_csv("train", &rows, None)
//!     }
//! }
//!
//! # async fn main_() -> FacadeResult<()> {
//! Runtime::new()
//!     .register("split", Split)
//!     .run_file(std::path::Path::new("snapshot.json"))
//!     .await
//! # }
//! ```

mod context;
mod entrypoint;
mod shell;
mod snapshot;

pub use context::StepContext;
pub use entrypoint::{extract_snapshot, render_entrypoint, write_entrypoint, ENTRYPOINT_TEMPLATE};
pub use shell::ShellBody;
pub use snapshot::{SnapshotParam, SnapshotPayload, StepSnapshot, SNAPSHOT_FORMAT_VERSION};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{FacadeError, FacadeResult};

/// What a processing step does inside its container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepBody {
    /// Shell command
    Shell {
        /// Command to run
        command: String,

        /// Shell to use (bash, sh, etc.)
        #[serde(default = "default_shell")]
        shell: String,
    },

    /// Handler registered on the container runtime
    Handler {
        /// Registered handler name
        name: String,

        /// Arguments passed to the handler
        #[serde(default)]
        args: serde_json::Value,
    },
}

fn default_shell() -> String {
    "bash".to_string()
}

impl StepBody {
    pub fn shell(command: impl Into<String>) -> Self {
        Self::Shell {
            command: command.into(),
            shell: default_shell(),
        }
    }

    pub fn handler(name: impl Into<String>) -> Self {
        Self::Handler {
            name: name.into(),
            args: serde_json::Value::Null,
        }
    }

    /// Short description for logs and listings
    pub fn describe(&self) -> String {
        match self {
            Self::Shell { command, shell } => format!("{} -c '{}'", shell, command),
            Self::Handler { name, .. } => format!("handler '{}'", name),
        }
    }
}

/// Trait for step handlers
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Run the step body
    ///
    /// # Arguments
    /// * `ctx` - Container paths of the step's inputs and outputs
    /// * `args` - Arguments declared with the step body
    async fn execute(&self, ctx: &StepContext, args: &serde_json::Value) -> FacadeResult<()>;
}

/// Runs step snapshots inside the container
#[derive(Default)]
pub struct Runtime {
    handlers: HashMap<String, Box<dyn StepHandler>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name
    pub fn register(mut self, name: &str, handler: impl StepHandler + 'static) -> Self {
        self.handlers.insert(name.to_string(), Box::new(handler));
        self
    }

    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn registered_list(&self) -> String {
        let names = self.handler_names();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }

    /// Load a snapshot file and run it
    pub async fn run_file(&self, path: &Path) -> FacadeResult<()> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| FacadeError::FileReadError {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                })?;

        let snapshot = StepSnapshot::from_json(&content)?;
        self.run(&snapshot).await
    }

    /// Verify a snapshot and run its body
    pub async fn run(&self, snapshot: &StepSnapshot) -> FacadeResult<()> {
        snapshot.verify()?;

        let payload = &snapshot.payload;
        let ctx = StepContext::from_payload(payload);
        ctx.prepare_outputs()?;

        tracing::info!(step = %payload.step, body = %payload.body.describe(), "running step body");

        match &payload.body {
            StepBody::Shell { command, shell } => {
                ShellBody::new(command, shell).run(&ctx).await
            }
            StepBody::Handler { name, args } => {
                let handler =
                    self.handlers
                        .get(name)
                        .ok_or_else(|| FacadeError::HandlerNotFound {
                            handler: name.clone(),
                            registered: self.registered_list(),
                        })?;
                handler.execute(&ctx, args).await
            }
        }
    }
}
