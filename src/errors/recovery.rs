// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use super::FacadeError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Pick a suggestion for an error, if one applies
    pub fn for_error(error: &FacadeError) -> Option<Self> {
        match error {
            FacadeError::ToolNotFound { tool, .. } => Some(Self::install_tool(tool)),
            FacadeError::Unparsed { step } => Some(Self::reorder_steps(step)),
            FacadeError::ManifestNotFound { .. } => Some(Self::create_pipeline()),
            FacadeError::UnknownModel { model, .. } => Some(Self::pick_known_model(model)),
            _ => None,
        }
    }

    /// Suggest installing a missing tool
    pub fn install_tool(tool: &str) -> Self {
        match tool {
            "aws" => Self {
                action: "Install the AWS CLI".into(),
                steps: vec![
                    "The AWS CLI submits pipelines and uploads local artifacts".into(),
                    "Install version 2 and configure credentials".into(),
                ],
                commands: vec![
                    "# Using Homebrew (macOS/Linux):".into(),
                    "brew install awscli".into(),
                    "".into(),
                    "# Configure credentials:".into(),
                    "aws configure".into(),
                ],
            },
            _ => Self {
                action: format!("Install {}", tool),
                steps: vec![format!("Install {} and ensure it's in your PATH", tool)],
                commands: vec![],
            },
        }
    }

    /// Suggest moving a producer step before its consumers
    pub fn reorder_steps(step: &str) -> Self {
        Self {
            action: format!("Declare '{}' earlier", step),
            steps: vec![
                "Steps are added in the order they are declared".into(),
                format!("Move '{}' above every step that references its outputs", step),
            ],
            commands: vec![
                "# Check the order:".into(),
                "smflow validate --verbose".into(),
            ],
        }
    }

    /// Suggest creating a pipeline file
    pub fn create_pipeline() -> Self {
        Self {
            action: "Create a pipeline file".into(),
            steps: vec![
                "No .smflow.yaml found in current directory".into(),
                "Create the file or point at one with --pipeline".into(),
            ],
            commands: vec!["smflow validate --pipeline path/to/pipeline.yaml".into()],
        }
    }

    /// Suggest a registered model name
    pub fn pick_known_model(model: &str) -> Self {
        Self {
            action: format!("Replace model '{}'", model),
            steps: vec![
                "Training images are resolved from a fixed table of frameworks".into(),
                format!(
                    "Known models: {}",
                    crate::images::Framework::names().join(", ")
                ),
            ],
            commands: vec![],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparsed_suggests_reorder() {
        let suggestion =
            RecoverySuggestion::for_error(&FacadeError::Unparsed { step: "Eval".into() }).unwrap();
        assert!(suggestion.action.contains("Eval"));
        assert!(suggestion.to_string().starts_with("→"));
    }

    #[test]
    fn test_io_has_no_suggestion() {
        assert!(RecoverySuggestion::for_error(&FacadeError::Io { message: "x".into() }).is_none());
    }
}
