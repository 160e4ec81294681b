// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 smflow contributors

//! Container image lookup
//!
//! Maps a framework name to the arguments needed to build its SageMaker
//! image URI. Adding a framework means adding a variant; every lookup is an
//! exhaustive match.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{FacadeError, FacadeResult};
use crate::DEFAULT_INSTANCE_TYPE;

/// Frameworks with a known first-party image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// Built-in XGBoost algorithm
    Xgboost,
    /// Scikit-learn processing/training image
    Sklearn,
}

/// Arguments of a framework image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArgs {
    /// ECR repository name
    pub repository: &'static str,
    /// Framework version
    pub version: &'static str,
    /// Python version tag
    pub py_version: &'static str,
    /// Instance type the image is used with by default
    pub instance_type: &'static str,
}

impl Framework {
    /// All registered frameworks
    pub const ALL: [Framework; 2] = [Framework::Xgboost, Framework::Sklearn];

    /// Names accepted by [`Framework::from_str`]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.name()).collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Xgboost => "xgboost",
            Self::Sklearn => "sklearn",
        }
    }

    /// Image arguments for this framework
    pub fn image_args(&self) -> ImageArgs {
        match self {
            Self::Xgboost => ImageArgs {
                repository: "sagemaker-xgboost",
                version: "1.0-1",
                py_version: "py3",
                instance_type: DEFAULT_INSTANCE_TYPE,
            },
            Self::Sklearn => ImageArgs {
                repository: "sagemaker-scikit-learn",
                version: "1.2-1",
                py_version: "py3",
                instance_type: DEFAULT_INSTANCE_TYPE,
            },
        }
    }

    /// Resolve the image URI in a region
    pub fn image_uri(&self, region: &str) -> FacadeResult<String> {
        let args = self.image_args();
        let account = registry_account(region).ok_or_else(|| FacadeError::UnsupportedRegion {
            region: region.to_string(),
        })?;

        Ok(format!(
            "{}.dkr.ecr.{}.amazonaws.com/{}:{}-cpu-{}",
            account, region, args.repository, args.version, args.py_version
        ))
    }
}

impl FromStr for Framework {
    type Err = FacadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xgboost" => Ok(Self::Xgboost),
            "sklearn" | "scikit-learn" => Ok(Self::Sklearn),
            _ => Err(FacadeError::UnknownModel {
                model: s.to_string(),
                known: Self::names().join(", "),
            }),
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Account hosting the XGBoost and scikit-learn images per region
fn registry_account(region: &str) -> Option<&'static str> {
    let account = match region {
        "us-east-1" => "683313688378",
        "us-east-2" => "257758044811",
        "us-west-1" => "746614075791",
        "us-west-2" => "246618743249",
        "ca-central-1" => "341280168497",
        "sa-east-1" => "737474898029",
        "eu-west-1" => "141502667606",
        "eu-west-2" => "764974769150",
        "eu-central-1" => "492215442770",
        "ap-south-1" => "720646828776",
        "ap-southeast-1" => "121021644041",
        "ap-southeast-2" => "783357654285",
        "ap-northeast-1" => "354813040037",
        _ => return None,
    };
    Some(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xgboost_image_uri() {
        let uri = Framework::Xgboost.image_uri("us-east-1").unwrap();
        assert_eq!(
            uri,
            "683313688378.dkr.ecr.us-east-1.amazonaws.com/sagemaker-xgboost:1.0-1-cpu-py3"
        );
    }

    #[test]
    fn test_sklearn_image_uri() {
        let uri = Framework::Sklearn.image_uri("eu-west-1").unwrap();
        assert!(uri.ends_with("sagemaker-scikit-learn:1.2-1-cpu-py3"));
        assert!(uri.starts_with("141502667606.dkr.ecr.eu-west-1"));
    }

    #[test]
    fn test_unknown_model() {
        let err = "catboost".parse::<Framework>().unwrap_err();
        assert!(matches!(err, FacadeError::UnknownModel { .. }));
    }

    #[test]
    fn test_unsupported_region() {
        let err = Framework::Xgboost.image_uri("mars-north-1").unwrap_err();
        assert!(matches!(err, FacadeError::UnsupportedRegion { .. }));
    }
}
