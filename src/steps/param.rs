// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Parameters: named data contracts between steps

use std::path::PathBuf;

use crate::workflow::{Expr, Value};

/// Where a parameter's data comes from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Source {
    /// No source yet (outputs, or inputs filled in later)
    #[default]
    Unset,
    /// Local file or directory, uploaded before submission
    Local(PathBuf),
    /// Remote object storage URI
    Uri(String),
    /// Value known only at execution time
    Deferred(Expr),
    /// Model created by a batch transform step
    Model(ModelRef),
}

impl Source {
    /// Interpret a user-supplied location: `s3://` URIs are remote, anything else local
    pub fn parse(location: &str) -> Self {
        if location.starts_with("s3://") {
            Self::Uri(location.to_string())
        } else {
            Self::Local(PathBuf::from(location))
        }
    }

    /// Whether the data is already reachable by the service without an upload
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Uri(_) | Self::Deferred(_) | Self::Model(_))
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Definition-time value of a remote source
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Uri(uri) => Some(Value::Literal(uri.clone())),
            Self::Deferred(expr) => Some(Value::Expr(expr.clone())),
            Self::Model(model) => Some(model.model_data.clone()),
            Self::Unset | Self::Local(_) => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "<unset>"),
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Uri(uri) => write!(f, "{}", uri),
            Self::Deferred(expr) => write!(f, "{}", Value::Expr(expr.clone())),
            Self::Model(model) => write!(f, "{}", Value::Expr(model.model_name.clone())),
        }
    }
}

/// A model created inside the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRef {
    /// Inference image of the model
    pub image_uri: String,
    /// Model artifact location
    pub model_data: Value,
    /// Name assigned by the service when the model is created
    pub model_name: Expr,
}

/// Whether an output is a plain artifact or also a queryable property file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamKind {
    #[default]
    Artifact,
    Property,
}

/// A named data artifact flowing between steps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Param {
    pub name: Option<String>,
    pub source: Source,
    pub destination: Option<String>,
    pub content_type: Option<String>,
    pub kind: ParamKind,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// An output that is also captured as a property file
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::Property,
            ..Self::new(name)
        }
    }

    /// A parameter without a name; parsers assign a positional one
    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Set the source from a location string (local path or `s3://` URI)
    pub fn with_location(self, location: &str) -> Self {
        self.with_source(Source::parse(location))
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_property(&self) -> bool {
        self.kind == ParamKind::Property
    }

    /// The declared name or `{prefix}_{index}`
    pub fn name_or(&self, prefix: &str, index: usize) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{}_{}", prefix, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert!(matches!(Source::parse("s3://bucket/key"), Source::Uri(_)));
        assert!(matches!(Source::parse("data/data.csv"), Source::Local(_)));
    }

    #[test]
    fn test_remote_sources() {
        assert!(Source::Uri("s3://b/k".into()).is_remote());
        assert!(Source::Deferred(Expr::Get("Steps.A.B".into())).is_remote());
        assert!(!Source::Local("x".into()).is_remote());
        assert!(!Source::Unset.is_remote());
    }

    #[test]
    fn test_positional_name() {
        assert_eq!(Param::unnamed().name_or("input", 2), "input_2");
        assert_eq!(Param::new("train").name_or("input", 2), "train");
        assert_eq!(Param::new("").name_or("output", 0), "output_0");
    }

    #[test]
    fn test_property_param() {
        let param = Param::property("evaluation");
        assert!(param.is_property());
        assert!(!Param::new("train").is_property());
    }
}
